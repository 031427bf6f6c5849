//! The orchestrator — dispatches `<execute/>` directives to content agents.
//!
//! The orchestrator first runs the shared template for its own response
//! (its structured results flow through the sink like any agent's), then
//! maps each directive's `action` onto a content kind and runs that
//! agent's full template sequentially. Unknown actions are reported and
//! skipped; a failed sub-agent does not abort the remaining directives.

use crate::profile::profile_for;
use crate::runner::{AgentRunner, RunOutcome};
use inkflow_core::error::Error;
use inkflow_core::{AgentKind, CounterStore, EventSink, LlmClient, NoteStore, Session, StopFlags};
use inkflow_protocol::parse_execute_directives;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one orchestrated run.
pub struct OrchestrationOutcome {
    /// The orchestrator's own template outcome.
    pub own: RunOutcome,
    /// Sub-agent outcomes, in directive order.
    pub dispatched: Vec<(AgentKind, RunOutcome)>,
}

pub struct OrchestratorDispatcher {
    llm: Arc<dyn LlmClient>,
    notes: Option<Arc<dyn NoteStore>>,
    counters: Arc<dyn CounterStore>,
    stops: Arc<dyn StopFlags>,
    sink: Arc<dyn EventSink>,
    clear_on_bind: bool,
}

impl OrchestratorDispatcher {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        notes: Option<Arc<dyn NoteStore>>,
        counters: Arc<dyn CounterStore>,
        stops: Arc<dyn StopFlags>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            llm,
            notes,
            counters,
            stops,
            sink,
            clear_on_bind: true,
        }
    }

    /// Disable stale-flag clearing — used when the concierge queues an
    /// orchestration inside an already-bound request.
    pub fn with_clear_on_bind(mut self, clear: bool) -> Self {
        self.clear_on_bind = clear;
        self
    }

    fn runner_for(&self, kind: AgentKind, clear_on_bind: bool) -> AgentRunner {
        AgentRunner::new(
            profile_for(kind),
            self.llm.clone(),
            self.notes.clone(),
            self.counters.clone(),
            self.stops.clone(),
            self.sink.clone(),
        )
        .with_clear_on_bind(clear_on_bind)
    }

    /// Run the orchestrator and everything it dispatches.
    pub async fn run(
        &self,
        session: &Session,
        instruction: &str,
    ) -> Result<OrchestrationOutcome, Error> {
        let own = self
            .runner_for(AgentKind::Orchestrator, self.clear_on_bind)
            .run(session, instruction)
            .await?;

        let directives = parse_execute_directives(&own.raw);
        info!(
            session = %session.key,
            directives = directives.len(),
            "orchestrator dispatching"
        );

        let mut dispatched = Vec::new();
        for directive in directives {
            let Some(kind) = AgentKind::from_action(&directive.action) else {
                warn!(
                    session = %session.key,
                    action = %directive.action,
                    "unknown execute action, skipping directive"
                );
                continue;
            };

            match self
                .runner_for(kind, false)
                .run(session, &directive.instruction)
                .await
            {
                Ok(outcome) => dispatched.push((kind, outcome)),
                Err(Error::Stopped) => return Err(Error::Stopped),
                Err(e) => {
                    warn!(
                        session = %session.key,
                        kind = kind.tag(),
                        error = %e,
                        "dispatched agent failed, continuing with remaining directives"
                    );
                }
            }
        }

        Ok(OrchestrationOutcome { own, dispatched })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use inkflow_core::{ContentTag, EventPayload, SessionKey};
    use inkflow_store::{InMemoryCounterStore, InMemoryNoteStore, InMemoryStopFlags};

    fn dispatcher(llm: Arc<SequentialMockLlm>) -> (OrchestratorDispatcher, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::new());
        let dispatcher = OrchestratorDispatcher::new(
            llm,
            Some(Arc::new(InMemoryNoteStore::new())),
            Arc::new(InMemoryCounterStore::new()),
            Arc::new(InMemoryStopFlags::new()),
            sink.clone(),
        );
        (dispatcher, sink)
    }

    fn session() -> Session {
        Session::new(SessionKey::new("u1", "s1"))
    }

    #[tokio::test]
    async fn dispatches_mapped_actions_sequentially() {
        let llm = Arc::new(SequentialMockLlm::new(vec![
            // Orchestrator's own response with two directives.
            r#"拆解如下：
<execute action="hitpoint" instruction="提炼三个卖点"/>
<execute action="knowledge" instruction="解释成分功效"/>"#
                .into(),
            // hitpoint agent response
            "<hitpoint1><title>A</title><content>a</content></hitpoint1>\
<hitpoint2><title>B</title><content>b</content></hitpoint2>\
<hitpoint3><title>C</title><content>c</content></hitpoint3>"
                .into(),
            // knowledge agent response (prose, triggers fallback)
            "烟酰胺有助于提亮肤色。".into(),
        ]));
        let (dispatcher, sink) = dispatcher(llm.clone());

        let outcome = dispatcher.run(&session(), "帮我做个推广方案").await.unwrap();
        assert_eq!(outcome.dispatched.len(), 2);
        assert_eq!(outcome.dispatched[0].0, AgentKind::Hitpoint);
        assert_eq!(outcome.dispatched[1].0, AgentKind::Knowledge);
        assert_eq!(llm.calls(), 3);

        // Results of every agent flowed through the same sink.
        let events = sink.events().await;
        let tags: Vec<ContentTag> = events.iter().map(|e| e.content_tag).collect();
        assert!(tags.contains(&ContentTag::Orchestrator));
        assert!(tags.contains(&ContentTag::Hitpoint));
        assert!(tags.contains(&ContentTag::Knowledge));
    }

    #[tokio::test]
    async fn unknown_action_is_skipped_not_fatal() {
        let llm = Arc::new(SequentialMockLlm::new(vec![
            r#"<execute action="summon_demon" instruction="x"/>
<execute action="hitpoint" instruction="卖点"/>"#
                .into(),
            "<hitpoint1><title>A</title><content>a</content></hitpoint1>\
<hitpoint2><title>B</title><content>b</content></hitpoint2>\
<hitpoint3><title>C</title><content>c</content></hitpoint3>"
                .into(),
        ]));
        let (dispatcher, _sink) = dispatcher(llm.clone());

        let outcome = dispatcher.run(&session(), "做方案").await.unwrap();
        // The unknown action produced no run; the valid one did.
        assert_eq!(outcome.dispatched.len(), 1);
        assert_eq!(outcome.dispatched[0].0, AgentKind::Hitpoint);
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn no_directives_means_no_dispatch() {
        let llm = Arc::new(SequentialMockLlm::new(vec!["没有任何指令的回答。".into()]));
        let (dispatcher, sink) = dispatcher(llm.clone());

        let outcome = dispatcher.run(&session(), "随便聊聊").await.unwrap();
        assert!(outcome.dispatched.is_empty());
        assert_eq!(llm.calls(), 1);

        // The orchestrator's own (fallback-wrapped) result still emitted.
        let events = sink.events().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].payload, EventPayload::Results(_)));
    }

    #[tokio::test]
    async fn failed_sub_agent_does_not_abort_remaining() {
        // Call 2 (the hitpoint sub-agent) fails; knowledge still runs.
        let llm = Arc::new(
            SequentialMockLlm::new(vec![
                r#"<execute action="hitpoint" instruction="a"/>
<execute action="knowledge" instruction="b"/>"#
                    .into(),
                "烟酰胺有助于提亮肤色。".into(),
            ])
            .failing_on_call(2),
        );
        let (dispatcher, _sink) = dispatcher(llm.clone());

        let outcome = dispatcher.run(&session(), "做方案").await.unwrap();
        assert_eq!(outcome.dispatched.len(), 1);
        assert_eq!(outcome.dispatched[0].0, AgentKind::Knowledge);
        assert_eq!(llm.calls(), 3);
    }
}
