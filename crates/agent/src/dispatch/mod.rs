//! Directive dispatch — the concierge/orchestrator specializations.
//!
//! Both wrap the shared agent-runner template and interpret control
//! directives embedded in their own LLM output. The single-hop limit on
//! the concierge's search → re-analysis cycle is carried as an explicit
//! [`Phase`] rather than relying on absence-of-further-scanning.

pub mod concierge;
pub mod orchestrator;

use async_trait::async_trait;
use inkflow_core::{AgentEvent, ContentTag, EventSink};
use std::sync::Arc;

/// Which pass of the concierge pipeline a response belongs to.
///
/// `ReAnalysis` responses are never scanned for directives: this is the
/// hard boundary that prevents unbounded search ↔ re-analysis cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initial,
    ReAnalysis,
}

/// A sink adapter that rewrites the content tag before forwarding.
///
/// Used for concierge-triggered web searches so consumers can tell them
/// apart from standalone search results.
pub(crate) struct RetagSink {
    inner: Arc<dyn EventSink>,
    tag: ContentTag,
}

impl RetagSink {
    pub(crate) fn new(inner: Arc<dyn EventSink>, tag: ContentTag) -> Self {
        Self { inner, tag }
    }
}

#[async_trait]
impl EventSink for RetagSink {
    async fn emit(&self, mut event: AgentEvent) {
        event.content_tag = self.tag;
        self.inner.emit(event).await;
    }
}
