//! Agent kinds — the string discriminator for every agent and result type.
//!
//! Each kind owns its own counter namespace within a session, its own
//! numbered wire tag (`<hitpoint1>`), and a localized display label used
//! when the parser has to synthesize a title.

use serde::{Deserialize, Serialize};

/// The closed set of agent kinds this runtime dispatches.
///
/// The eleven content kinds are also the valid `action` values of the
/// orchestrator's `<execute/>` directive; `Concierge` and `Orchestrator`
/// are the two directive-interpreting specializations and are never
/// dispatch targets themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    BrandAnalysis,
    ContentAnalysis,
    Hitpoint,
    Knowledge,
    Persona,
    Resonant,
    Revision,
    TiktokScript,
    Websearch,
    WechatArticle,
    XhsPost,
    Concierge,
    Orchestrator,
}

impl AgentKind {
    /// The wire tag: counter namespace, numbered block tag prefix, and
    /// `<execute action="…"/>` value.
    pub fn tag(&self) -> &'static str {
        match self {
            AgentKind::BrandAnalysis => "brand_analysis",
            AgentKind::ContentAnalysis => "content_analysis",
            AgentKind::Hitpoint => "hitpoint",
            AgentKind::Knowledge => "knowledge",
            AgentKind::Persona => "persona",
            AgentKind::Resonant => "resonant",
            AgentKind::Revision => "revision",
            AgentKind::TiktokScript => "tiktok_script",
            AgentKind::Websearch => "websearch",
            AgentKind::WechatArticle => "wechat_article",
            AgentKind::XhsPost => "xhs_post",
            AgentKind::Concierge => "concierge",
            AgentKind::Orchestrator => "orchestrator",
        }
    }

    /// Localized display label, used for synthesized result titles
    /// ("<label> N") when a block carries no `<title>`.
    pub fn label(&self) -> &'static str {
        match self {
            AgentKind::BrandAnalysis => "品牌分析",
            AgentKind::ContentAnalysis => "内容分析",
            AgentKind::Hitpoint => "卖点",
            AgentKind::Knowledge => "知识问答",
            AgentKind::Persona => "人设",
            AgentKind::Resonant => "共鸣点",
            AgentKind::Revision => "修改稿",
            AgentKind::TiktokScript => "抖音脚本",
            AgentKind::Websearch => "搜索结果",
            AgentKind::WechatArticle => "公众号文章",
            AgentKind::XhsPost => "小红书笔记",
            AgentKind::Concierge => "智能助理",
            AgentKind::Orchestrator => "任务编排",
        }
    }

    /// Map an orchestrator `action` attribute to a dispatchable kind.
    ///
    /// Only the eleven content kinds are valid targets; anything else
    /// (including "concierge"/"orchestrator") returns `None` and is
    /// reported by the dispatcher as an unknown action.
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "brand_analysis" => Some(AgentKind::BrandAnalysis),
            "content_analysis" => Some(AgentKind::ContentAnalysis),
            "hitpoint" => Some(AgentKind::Hitpoint),
            "knowledge" => Some(AgentKind::Knowledge),
            "persona" => Some(AgentKind::Persona),
            "resonant" => Some(AgentKind::Resonant),
            "revision" => Some(AgentKind::Revision),
            "tiktok_script" => Some(AgentKind::TiktokScript),
            "websearch" => Some(AgentKind::Websearch),
            "wechat_article" => Some(AgentKind::WechatArticle),
            "xhs_post" => Some(AgentKind::XhsPost),
            _ => None,
        }
    }

    /// The content kinds an orchestrator may dispatch to, in stable order.
    pub fn dispatchable() -> &'static [AgentKind] {
        &[
            AgentKind::BrandAnalysis,
            AgentKind::ContentAnalysis,
            AgentKind::Hitpoint,
            AgentKind::Knowledge,
            AgentKind::Persona,
            AgentKind::Resonant,
            AgentKind::Revision,
            AgentKind::TiktokScript,
            AgentKind::Websearch,
            AgentKind::WechatArticle,
            AgentKind::XhsPost,
        ]
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}
