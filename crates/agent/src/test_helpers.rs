//! Shared test helpers for runner and dispatcher tests.

use async_trait::async_trait;
use inkflow_core::error::{CounterError, LlmError, NoteError};
use inkflow_core::{
    AgentEvent, ChatMessage, CounterKey, CounterStore, EventSink, LlmClient, Note, NoteStore,
    SessionKey, StopFlags, StreamChunk,
};
use inkflow_store::InMemoryCounterStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A mock LLM client that returns a sequence of scripted responses.
///
/// Each call to `stream` pops the next response. Panics if more calls
/// are made than responses provided.
pub struct SequentialMockLlm {
    responses: Mutex<Vec<String>>,
    calls: AtomicUsize,
    thought: Option<String>,
    fail_with: Option<String>,
    fail_on_call: Option<usize>,
    raise_stop: Option<(Arc<dyn StopFlags>, SessionKey)>,
}

impl SequentialMockLlm {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses),
            calls: AtomicUsize::new(0),
            thought: None,
            fail_with: None,
            fail_on_call: None,
            raise_stop: None,
        }
    }

    /// A client whose every call fails with a network error.
    pub fn failing(message: &str) -> Self {
        let mut llm = Self::new(Vec::new());
        llm.fail_with = Some(message.to_string());
        llm
    }

    /// Fail only the nth call (1-based); other calls stream normally.
    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Prepend a thought chunk to every response.
    pub fn with_thought(mut self, thought: &str) -> Self {
        self.thought = Some(thought.to_string());
        self
    }

    /// Raise the given session's stop flag as soon as a stream starts —
    /// simulates a cancellation arriving mid-response.
    pub fn raising_stop(mut self, stops: Arc<dyn StopFlags>, session: SessionKey) -> Self {
        self.raise_stop = Some((stops, session));
        self
    }

    /// How many times `stream` was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for SequentialMockLlm {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn stream(
        &self,
        _messages: Vec<ChatMessage>,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<StreamChunk, LlmError>>, LlmError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(message) = &self.fail_with {
            return Err(LlmError::Network(message.clone()));
        }
        if self.fail_on_call == Some(call) {
            return Err(LlmError::Network(format!("simulated failure on call #{call}")));
        }

        if let Some((stops, session)) = &self.raise_stop {
            stops.raise(session).await;
        }

        let response = {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                panic!("SequentialMockLlm: no more responses (call #{call})");
            }
            responses.remove(0)
        };
        let thought = self.thought.clone();

        let (tx, rx) = tokio::sync::mpsc::channel(1);
        tokio::spawn(async move {
            if let Some(thought) = thought {
                let _ = tx
                    .send(Ok(StreamChunk {
                        thought: Some(thought),
                        ..Default::default()
                    }))
                    .await;
            }
            let _ = tx
                .send(Ok(StreamChunk {
                    content: Some(response),
                    ..Default::default()
                }))
                .await;
            let _ = tx
                .send(Ok(StreamChunk {
                    done: true,
                    ..Default::default()
                }))
                .await;
        });

        Ok(rx)
    }
}

/// An event sink that collects everything it receives.
pub struct CollectingSink {
    events: tokio::sync::Mutex<Vec<AgentEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self {
            events: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    pub async fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn emit(&self, event: AgentEvent) {
        self.events.lock().await.push(event);
    }
}

/// A note store whose writes always fail.
pub struct FailingNoteStore;

#[async_trait]
impl NoteStore for FailingNoteStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn upsert(&self, _note: &Note) -> Result<(), NoteError> {
        Err(NoteError::Storage("disk full".into()))
    }

    async fn list(&self, _session: &SessionKey) -> Result<Vec<Note>, NoteError> {
        Ok(Vec::new())
    }
}

/// A counter store whose nth increment fails after applying — the
/// realistic lost-response failure, leaving a gap in the sequence.
pub struct FlakyCounterStore {
    inner: InMemoryCounterStore,
    fail_on: usize,
    calls: AtomicUsize,
}

impl FlakyCounterStore {
    pub fn failing_on(call: usize) -> Self {
        Self {
            inner: InMemoryCounterStore::new(),
            fail_on: call,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CounterStore for FlakyCounterStore {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn incr(&self, key: &CounterKey) -> Result<i64, CounterError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let value = self.inner.incr(key).await?;
        if call == self.fail_on {
            return Err(CounterError::Unavailable("simulated store outage".into()));
        }
        Ok(value)
    }
}
