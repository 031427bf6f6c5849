//! In-memory backends — useful for testing and ephemeral sessions.

use crate::COUNTER_TTL;
use async_trait::async_trait;
use inkflow_core::error::{CounterError, NoteError};
use inkflow_core::{CounterKey, CounterStore, Note, NoteStore, SessionKey, StopFlags};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct CounterEntry {
    value: i64,
    expires_at: Instant,
}

/// An in-memory counter store. The increment is atomic because the whole
/// map sits behind one write lock; multi-process correctness belongs to
/// the SQLite store.
pub struct InMemoryCounterStore {
    entries: Arc<RwLock<HashMap<CounterKey, CounterEntry>>>,
    ttl: Duration,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::with_ttl(COUNTER_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn incr(&self, key: &CounterKey) -> Result<i64, CounterError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let entry = entries.entry(key.clone()).or_insert(CounterEntry {
            value: 0,
            expires_at: now + self.ttl,
        });
        if entry.expires_at < now {
            entry.value = 0;
        }
        entry.value += 1;
        entry.expires_at = now + self.ttl;
        Ok(entry.value)
    }
}

/// An in-memory note store keyed by (session, kind, id).
pub struct InMemoryNoteStore {
    notes: Arc<RwLock<Vec<Note>>>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self {
            notes: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn count(&self) -> usize {
        self.notes.read().await.len()
    }
}

impl Default for InMemoryNoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn upsert(&self, note: &Note) -> Result<(), NoteError> {
        let mut notes = self.notes.write().await;
        if let Some(existing) = notes
            .iter_mut()
            .find(|n| n.session == note.session && n.kind == note.kind && n.id == note.id)
        {
            *existing = note.clone();
        } else {
            notes.push(note.clone());
        }
        Ok(())
    }

    async fn list(&self, session: &SessionKey) -> Result<Vec<Note>, NoteError> {
        let notes = self.notes.read().await;
        Ok(notes
            .iter()
            .filter(|n| &n.session == session)
            .cloned()
            .collect())
    }
}

/// An in-memory stop-flag store.
pub struct InMemoryStopFlags {
    raised: Arc<RwLock<HashSet<SessionKey>>>,
}

impl InMemoryStopFlags {
    pub fn new() -> Self {
        Self {
            raised: Arc::new(RwLock::new(HashSet::new())),
        }
    }
}

impl Default for InMemoryStopFlags {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StopFlags for InMemoryStopFlags {
    async fn clear(&self, session: &SessionKey) {
        self.raised.write().await.remove(session);
    }

    async fn raise(&self, session: &SessionKey) {
        self.raised.write().await.insert(session.clone());
    }

    async fn is_raised(&self, session: &SessionKey) -> bool {
        self.raised.read().await.contains(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkflow_core::AgentKind;

    fn key(kind: AgentKind) -> CounterKey {
        CounterKey::new(SessionKey::new("u1", "s1"), kind)
    }

    #[tokio::test]
    async fn counter_starts_at_one_and_increases() {
        let store = InMemoryCounterStore::new();
        let k = key(AgentKind::Hitpoint);
        for expected in 1..=5 {
            assert_eq!(store.incr(&k).await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn counter_namespaces_are_independent() {
        let store = InMemoryCounterStore::new();
        assert_eq!(store.incr(&key(AgentKind::Hitpoint)).await.unwrap(), 1);
        assert_eq!(store.incr(&key(AgentKind::Hitpoint)).await.unwrap(), 2);
        // Different kind, same session: fresh namespace.
        assert_eq!(store.incr(&key(AgentKind::XhsPost)).await.unwrap(), 1);
        // Different session entirely.
        let other = CounterKey::new(SessionKey::new("u1", "s2"), AgentKind::Hitpoint);
        assert_eq!(store.incr(&other).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn expired_counter_restarts() {
        let store = InMemoryCounterStore::with_ttl(Duration::from_millis(0));
        let k = key(AgentKind::Knowledge);
        assert_eq!(store.incr(&k).await.unwrap(), 1);
        std::thread::sleep(Duration::from_millis(5));
        // TTL of zero: the previous value has expired.
        assert_eq!(store.incr(&k).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn note_upsert_replaces() {
        let store = InMemoryNoteStore::new();
        let session = SessionKey::new("u1", "s1");
        let note = Note::new(session.clone(), "hitpoint", "1", "v1");
        store.upsert(&note).await.unwrap();
        let replacement = Note::new(session.clone(), "hitpoint", "1", "v2");
        store.upsert(&replacement).await.unwrap();

        let notes = store.list(&session).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, "v2");
    }

    #[tokio::test]
    async fn note_list_scoped_to_session() {
        let store = InMemoryNoteStore::new();
        let s1 = SessionKey::new("u1", "s1");
        let s2 = SessionKey::new("u1", "s2");
        store.upsert(&Note::new(s1.clone(), "persona", "1", "a")).await.unwrap();
        store.upsert(&Note::new(s2.clone(), "persona", "1", "b")).await.unwrap();

        assert_eq!(store.list(&s1).await.unwrap().len(), 1);
        assert_eq!(store.list(&s2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stop_flags_lifecycle() {
        let flags = InMemoryStopFlags::new();
        let session = SessionKey::new("u1", "s1");
        assert!(!flags.is_raised(&session).await);

        flags.raise(&session).await;
        assert!(flags.is_raised(&session).await);

        flags.clear(&session).await;
        assert!(!flags.is_raised(&session).await);
    }
}
