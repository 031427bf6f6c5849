//! The agent pipeline — the heart of Inkflow.
//!
//! Every content agent follows the same linear template:
//!
//! 1. **Bind** the session (clear a stale stop flag, honor a live one)
//! 2. **Format** a prompt from the instruction + bounded session context
//! 3. **Stream** the LLM response, forwarding thought chunks live
//! 4. **Re-check** the stop flag (the stream may have been cancelled)
//! 5. **Parse** the tag protocol, allocate sequence IDs, emit one event
//! 6. **Persist** a note per result (non-fatal on failure)
//!
//! The two directive-interpreting specializations — orchestrator and
//! concierge — wrap the same template and live in [`dispatch`].

pub mod allocator;
pub mod context;
pub mod dispatch;
pub mod profile;
pub mod runner;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use allocator::{ActionIdAllocator, IdFailurePolicy};
pub use context::{format_context, ContextFlags, HISTORY_WINDOW};
pub use dispatch::concierge::{ConciergeDispatcher, ConciergeOutcome, RE_ANALYSIS_INSTRUCTION};
pub use dispatch::orchestrator::{OrchestratorDispatcher, OrchestrationOutcome};
pub use dispatch::Phase;
pub use profile::{profile_for, AgentProfile};
pub use runner::{AgentRunner, RunOutcome};
