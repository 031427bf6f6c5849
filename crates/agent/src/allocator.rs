//! The action ID allocator — issues per-(session, kind) sequence IDs.
//!
//! A thin policy layer over the [`CounterStore`] collaborator. The store
//! guarantees atomicity and monotonicity; this layer decides what happens
//! when the store is unavailable.

use chrono::Utc;
use inkflow_core::error::CounterError;
use inkflow_core::{AgentKind, CounterKey, CounterStore, SessionKey};
use std::sync::Arc;
use tracing::warn;

/// What to do when the counter store fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdFailurePolicy {
    /// Skip the affected result (logged, not fatal). The batch's other
    /// results keep their IDs.
    #[default]
    Skip,
    /// Substitute a nanosecond-resolution timestamp. Uniqueness within
    /// the session is then only best-effort — callers must treat this as
    /// a known degradation, not a guarantee.
    FallbackTimestamp,
}

/// Allocates sequence IDs for structured results.
pub struct ActionIdAllocator {
    store: Arc<dyn CounterStore>,
    policy: IdFailurePolicy,
}

impl ActionIdAllocator {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            policy: IdFailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: IdFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The raw increment: strictly increasing from 1 per (session, kind).
    pub async fn next_id(
        &self,
        session: &SessionKey,
        kind: AgentKind,
    ) -> Result<i64, CounterError> {
        let key = CounterKey::new(session.clone(), kind);
        self.store.incr(&key).await
    }

    /// Allocate with the failure policy applied: `None` means the caller
    /// must skip this result.
    pub async fn allocate(&self, session: &SessionKey, kind: AgentKind) -> Option<i64> {
        match self.next_id(session, kind).await {
            Ok(id) => Some(id),
            Err(e) => match self.policy {
                IdFailurePolicy::Skip => {
                    warn!(%session, kind = kind.tag(), error = %e, "ID allocation failed, skipping result");
                    None
                }
                IdFailurePolicy::FallbackTimestamp => {
                    let fallback = Utc::now()
                        .timestamp_nanos_opt()
                        .unwrap_or_else(|| Utc::now().timestamp_micros());
                    warn!(
                        %session,
                        kind = kind.tag(),
                        error = %e,
                        fallback,
                        "ID allocation failed, using timestamp fallback (best-effort uniqueness)"
                    );
                    Some(fallback)
                }
            },
        }
    }
}
