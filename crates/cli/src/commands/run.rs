//! `inkflow run` — run one content agent for a single instruction.

use crate::commands::build_stack;
use inkflow_agent::{profile_for, AgentRunner, ConciergeDispatcher, OrchestratorDispatcher};
use inkflow_core::{AgentKind, Session, SessionKey};

pub async fn run(kind: &str, instruction: &str, session_id: &str) -> anyhow::Result<()> {
    let stack = build_stack().await?;
    let session = Session::new(SessionKey::new(whoami(), session_id));

    if kind == "orchestrator" {
        let dispatcher = OrchestratorDispatcher::new(
            stack.llm,
            stack.notes,
            stack.counters,
            stack.stops,
            stack.sink,
        );
        let outcome = dispatcher.run(&session, instruction).await?;
        tracing::info!(
            dispatched = outcome.dispatched.len(),
            "orchestration complete"
        );
        return Ok(());
    }

    if kind == "concierge" {
        let dispatcher = ConciergeDispatcher::new(
            stack.llm,
            stack.notes,
            stack.counters,
            stack.stops,
            stack.sink,
        );
        let outcome = dispatcher.run(&session, instruction).await?;
        tracing::info!(
            results = outcome.results.len(),
            searches = outcome.searches,
            "concierge run complete"
        );
        return Ok(());
    }

    let agent_kind = AgentKind::from_action(kind)
        .ok_or_else(|| anyhow::anyhow!("unknown agent kind: {kind}"))?;

    let runner = AgentRunner::new(
        profile_for(agent_kind),
        stack.llm,
        stack.notes,
        stack.counters,
        stack.stops,
        stack.sink,
    );
    let outcome = runner.run(&session, instruction).await?;
    tracing::info!(results = outcome.results.len(), "run complete");
    Ok(())
}

fn whoami() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "local".into())
}
