//! Note persistence — the collaborator contract for per-session notes.
//!
//! The core only ever issues upserts and reads; schema, eviction, and
//! everything else belong to the implementation. Note failures are
//! non-fatal logged events, never retried within the same request.

use crate::session::SessionKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::NoteError;

/// A persisted note: one structured result (or concierge-created note)
/// saved under its session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub session: SessionKey,

    /// Kind namespace, e.g. "hitpoint" or a concierge-supplied note type.
    pub kind: String,

    /// Identifier within (session, kind); typically the sequence ID.
    pub id: String,

    pub content: String,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aux: BTreeMap<String, String>,
}

impl Note {
    pub fn new(
        session: SessionKey,
        kind: impl Into<String>,
        id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            session,
            kind: kind.into(),
            id: id.into(),
            content: content.into(),
            title: String::new(),
            aux: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// The note persistence collaborator.
///
/// `upsert` must be idempotent on (session, kind, id): re-persisting the
/// same note replaces the previous content.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// A human-readable name for this store (e.g., "in_memory", "sqlite").
    fn name(&self) -> &str;

    /// Create or replace a note.
    async fn upsert(&self, note: &Note) -> std::result::Result<(), NoteError>;

    /// All notes for a session, grouped by nothing — callers group by kind.
    async fn list(&self, session: &SessionKey) -> std::result::Result<Vec<Note>, NoteError>;
}
