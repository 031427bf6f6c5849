//! Session-scoped stop flags — cooperative cancellation.
//!
//! A runner polls the flag at two fixed points: before each LLM call and
//! immediately after one completes. Once observed, the runner unwinds
//! without side effects. The flag store is shared so any front end can
//! raise a stop for a session another process is serving.

use crate::session::SessionKey;
use async_trait::async_trait;

/// The stop-flag collaborator.
#[async_trait]
pub trait StopFlags: Send + Sync {
    /// Remove any flag for the session (done when a runner binds a new
    /// request, so a stale stop from the previous turn is not honored).
    async fn clear(&self, session: &SessionKey);

    /// Request that the session's current run stop at its next poll point.
    async fn raise(&self, session: &SessionKey);

    /// Whether a stop has been requested for this session.
    async fn is_raised(&self, session: &SessionKey) -> bool;
}
