//! The keyed counter store — source of truth for sequence IDs.
//!
//! One atomic-increment primitive, keyed by (user, session, kind). The
//! store refreshes a multi-day expiry on every increment so long-idle
//! sessions reclaim space while active sessions never see a reset
//! mid-conversation. This is the only place in the runtime that needs
//! true concurrency-safety: two processes serving the same session must
//! both observe strictly increasing values.

use crate::error::CounterError;
use crate::kind::AgentKind;
use crate::session::SessionKey;
use async_trait::async_trait;

/// Key of one counter namespace: (user, session, action-kind).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    pub session: SessionKey,
    pub kind: AgentKind,
}

impl CounterKey {
    pub fn new(session: SessionKey, kind: AgentKind) -> Self {
        Self { session, kind }
    }
}

impl std::fmt::Display for CounterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.session, self.kind.tag())
    }
}

/// The shared counter collaborator.
#[async_trait]
pub trait CounterStore: Send + Sync {
    fn name(&self) -> &str;

    /// Atomically increment and return the new value, starting at 1 for a
    /// fresh (or expired) key. Must also refresh the key's expiry.
    async fn incr(&self, key: &CounterKey) -> std::result::Result<i64, CounterError>;
}
