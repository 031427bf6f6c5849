//! Agent events and the event sink — the single point of contact with
//! UI/transport layers.
//!
//! Every emission is an `llm-chunk` event carrying either streamed text
//! (thought pass-through, raw-text degradation) or a full list of
//! structured results. The sink is an opaque callback: the core never
//! knows whether events go to a WebSocket, an SSE stream, or a test Vec.

use crate::kind::AgentKind;
use crate::result::StructuredResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The per-kind content tag on an emitted event.
///
/// `ConciergeWebSearch` marks search results produced on behalf of the
/// concierge, so front-end consumers can tell them apart from standalone
/// search answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentTag {
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
    ConciergeWebSearch,
}

impl ContentTag {
    pub fn from_kind(kind: AgentKind) -> Self {
        match kind {
            AgentKind::BrandAnalysis => ContentTag::BrandAnalysis,
            AgentKind::ContentAnalysis => ContentTag::ContentAnalysis,
            AgentKind::Hitpoint => ContentTag::Hitpoint,
            AgentKind::Knowledge => ContentTag::Knowledge,
            AgentKind::Persona => ContentTag::Persona,
            AgentKind::Resonant => ContentTag::Resonant,
            AgentKind::Revision => ContentTag::Revision,
            AgentKind::TiktokScript => ContentTag::TiktokScript,
            AgentKind::Websearch => ContentTag::Websearch,
            AgentKind::WechatArticle => ContentTag::WechatArticle,
            AgentKind::XhsPost => ContentTag::XhsPost,
            AgentKind::Concierge => ContentTag::Concierge,
            AgentKind::Orchestrator => ContentTag::Orchestrator,
        }
    }
}

/// Payload of an emitted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    Text(String),
    Results(Vec<StructuredResult>),
}

/// One event delivered to the sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    /// Always "llm-chunk" in this runtime.
    #[serde(rename = "type")]
    pub event_type: String,

    pub content_tag: ContentTag,

    pub payload: EventPayload,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl AgentEvent {
    /// An event carrying a full result list.
    pub fn results(tag: ContentTag, results: Vec<StructuredResult>) -> Self {
        Self {
            event_type: "llm-chunk".into(),
            content_tag: tag,
            payload: EventPayload::Results(results),
            metadata: serde_json::Map::new(),
        }
    }

    /// An event carrying plain text (thought pass-through or raw-text
    /// degradation).
    pub fn text(tag: ContentTag, text: impl Into<String>) -> Self {
        Self {
            event_type: "llm-chunk".into(),
            content_tag: tag,
            payload: EventPayload::Text(text.into()),
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach a metadata entry, returning self for chaining.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// The opaque event callback.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: AgentEvent);
}
