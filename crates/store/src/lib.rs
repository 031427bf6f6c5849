//! # Inkflow Store
//!
//! Implementations of the core's store traits:
//!
//! - [`InMemoryCounterStore`], [`InMemoryNoteStore`], [`InMemoryStopFlags`]
//!   — for tests and single-process ephemeral runs.
//! - [`SqliteStore`] — a shared SQLite file implementing both the counter
//!   and note stores, correct under multiple processes serving the same
//!   session (the atomic increment is one upsert-returning statement).

pub mod in_memory;
pub mod sqlite;

pub use in_memory::{InMemoryCounterStore, InMemoryNoteStore, InMemoryStopFlags};
pub use sqlite::SqliteStore;

/// How long an idle counter key survives. Refreshed on every increment:
/// active sessions never see a reset mid-conversation, long-idle ones
/// eventually reclaim space.
pub const COUNTER_TTL: std::time::Duration = std::time::Duration::from_secs(3 * 24 * 60 * 60);
