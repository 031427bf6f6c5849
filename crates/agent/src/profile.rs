//! Per-kind agent profiles — the only thing that differs between the
//! eleven content agents.
//!
//! A profile carries the kind's fixed system prompt, its tag schema, and
//! the content tag stamped on emitted events. Prompt text here is the
//! minimal skeleton the runtime needs; production deployments override
//! it wholesale.

use crate::context::ContextFlags;
use inkflow_core::{AgentKind, ContentTag};
use inkflow_protocol::TagSchema;

/// Everything an [`crate::AgentRunner`] needs to know about one kind.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub kind: AgentKind,
    pub system_prompt: String,
    pub schema: TagSchema,
    pub content_tag: ContentTag,
    pub context_flags: ContextFlags,
}

impl AgentProfile {
    pub fn new(kind: AgentKind, system_prompt: impl Into<String>, schema: TagSchema) -> Self {
        Self {
            kind,
            system_prompt: system_prompt.into(),
            schema,
            content_tag: ContentTag::from_kind(kind),
            context_flags: ContextFlags::all(),
        }
    }

    pub fn with_context_flags(mut self, flags: ContextFlags) -> Self {
        self.context_flags = flags;
        self
    }
}

/// The built-in profile for a kind.
pub fn profile_for(kind: AgentKind) -> AgentProfile {
    let tag = kind.tag();
    let schema = match kind {
        AgentKind::XhsPost => TagSchema::new(kind).with_aux("cover_text").with_aux("hook"),
        AgentKind::TiktokScript => TagSchema::new(kind).with_aux("hook"),
        _ => TagSchema::new(kind),
    };

    let system_prompt = match kind {
        AgentKind::Concierge => {
            "你是内容创作助理，负责理解用户意图、保存笔记与素材、必要时检索信息或编排其他智能体。".to_string()
        }
        AgentKind::Orchestrator => {
            "你是任务编排器。将用户需求拆解为若干 <execute action=\"…\" instruction=\"…\"/> 指令。".to_string()
        }
        _ => format!(
            "你是{}智能体。输出若干 <{tag}N> 结构块，每块包含 <title> 与 <content>。",
            kind.label()
        ),
    };

    let flags = match kind {
        // Search answers depend only on the immediate instruction.
        AgentKind::Websearch => ContextFlags::none(),
        _ => ContextFlags::all(),
    };

    AgentProfile::new(kind, system_prompt, schema).with_context_flags(flags)
}
