//! # Inkflow Core
//!
//! Domain types, traits, and error definitions for the Inkflow content-agent
//! runtime. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator the agent pipeline talks to is defined as a trait here:
//! the streaming LLM client, the note persistence service, the per-session
//! counter store, the stop-flag store, and the event sink. Implementations
//! live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod counter;
pub mod directive;
pub mod error;
pub mod kind;
pub mod llm;
pub mod note;
pub mod result;
pub mod session;
pub mod sink;
pub mod stop;

// Re-export key types at crate root for ergonomics
pub use counter::{CounterKey, CounterStore};
pub use directive::Directive;
pub use error::{CounterError, Error, LlmError, NoteError, Result};
pub use kind::AgentKind;
pub use llm::{ChatMessage, ChatRole, LlmClient, StreamChunk};
pub use note::{Note, NoteStore};
pub use result::StructuredResult;
pub use session::{Role, Session, SessionKey, Turn};
pub use sink::{AgentEvent, ContentTag, EventPayload, EventSink};
pub use stop::StopFlags;
