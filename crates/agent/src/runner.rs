//! The agent runner — the per-kind template every content agent follows.

use crate::allocator::{ActionIdAllocator, IdFailurePolicy};
use crate::context::format_context;
use crate::profile::AgentProfile;
use inkflow_core::error::Error;
use inkflow_core::{
    AgentEvent, ChatMessage, ContentTag, CounterStore, EventSink, LlmClient, Note, NoteStore,
    Session, SessionKey, StopFlags, StructuredResult,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What one run produced. Everything here was already emitted through
/// the sink; callers use the outcome for chaining (dispatch) and tests.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The ID-tagged results, in parser discovery order.
    pub results: Vec<StructuredResult>,
    /// The full accumulated LLM response.
    pub raw: String,
    /// Markdown-escaped content found outside recognized tags.
    pub other: Option<String>,
}

/// The shared template runner. One instance serves one agent kind.
pub struct AgentRunner {
    profile: AgentProfile,
    llm: Arc<dyn LlmClient>,
    notes: Option<Arc<dyn NoteStore>>,
    allocator: ActionIdAllocator,
    stops: Arc<dyn StopFlags>,
    sink: Arc<dyn EventSink>,
    clear_on_bind: bool,
}

impl AgentRunner {
    pub fn new(
        profile: AgentProfile,
        llm: Arc<dyn LlmClient>,
        notes: Option<Arc<dyn NoteStore>>,
        counters: Arc<dyn CounterStore>,
        stops: Arc<dyn StopFlags>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            profile,
            llm,
            notes,
            allocator: ActionIdAllocator::new(counters),
            stops,
            sink,
            clear_on_bind: true,
        }
    }

    /// Whether binding clears a stale stop flag. Top-level runs do;
    /// dispatcher-spawned sub-runs must not, or a stop raised mid-fanout
    /// would be wiped before the next poll observes it.
    pub fn with_clear_on_bind(mut self, clear: bool) -> Self {
        self.clear_on_bind = clear;
        self
    }

    pub fn with_id_policy(mut self, policy: IdFailurePolicy) -> Self {
        self.allocator = self.allocator.with_policy(policy);
        self
    }

    pub fn kind_tag(&self) -> &'static str {
        self.profile.kind.tag()
    }

    /// Run the full template for one instruction.
    pub async fn run(&self, session: &Session, instruction: &str) -> Result<RunOutcome, Error> {
        let key = &session.key;
        info!(session = %key, kind = self.kind_tag(), "agent run starting");

        // ── Step 1: bind ──
        if self.clear_on_bind {
            self.stops.clear(key).await;
        }
        self.ensure_not_stopped(key).await?;

        // ── Step 2: format prompt ──
        let notes_ctx = self.notes_for_context(key).await;
        let context = format_context(session, &notes_ctx, &self.profile.context_flags);
        let user_prompt = if context.is_empty() {
            instruction.to_string()
        } else {
            format!("{instruction}\n\n{context}")
        };
        let messages = vec![
            ChatMessage::system(&self.profile.system_prompt),
            ChatMessage::user(user_prompt),
        ];

        // ── Step 3: stream ──
        self.ensure_not_stopped(key).await?;
        let raw = stream_response(
            self.llm.as_ref(),
            self.sink.as_ref(),
            self.profile.content_tag,
            messages,
        )
        .await?;

        // ── Step 4: a long stream may have been cancelled mid-flight ──
        self.ensure_not_stopped(key).await?;

        // ── Step 5: parse, allocate, emit ──
        let outcome = inkflow_protocol::parse_response(&raw, &self.profile.schema);
        let display = display_instruction(instruction);

        if outcome.results.is_empty() {
            if raw.trim().is_empty() {
                debug!(session = %key, kind = self.kind_tag(), "empty response, nothing to emit");
                return Ok(RunOutcome {
                    results: Vec::new(),
                    raw,
                    other: None,
                });
            }
            // Parsing failure must never discard the model's answer.
            warn!(
                session = %key,
                kind = self.kind_tag(),
                "no structured results, emitting raw response verbatim"
            );
            self.sink
                .emit(
                    AgentEvent::text(self.profile.content_tag, raw.clone())
                        .with_meta("instruction", display),
                )
                .await;
            return Ok(RunOutcome {
                results: Vec::new(),
                raw,
                other: outcome.other,
            });
        }

        let mut results: Vec<StructuredResult> = Vec::new();
        for draft in outcome.results {
            let Some(id) = self.allocator.allocate(key, self.profile.kind).await else {
                continue;
            };
            results.push(StructuredResult {
                sequence_id: id,
                title: draft.title,
                content: draft.content,
                kind: self.profile.kind,
                aux: draft.aux,
            });
        }

        let mut event = AgentEvent::results(self.profile.content_tag, results.clone())
            .with_meta("instruction", display);
        if let Some(other) = &outcome.other {
            event = event.with_meta("agent_other_message", other.clone());
        }
        self.sink.emit(event).await;

        // ── Step 6: persist ──
        self.persist_results(key, &results).await;

        info!(
            session = %key,
            kind = self.kind_tag(),
            results = results.len(),
            "agent run complete"
        );
        Ok(RunOutcome {
            results,
            raw,
            other: outcome.other,
        })
    }

    async fn ensure_not_stopped(&self, key: &SessionKey) -> Result<(), Error> {
        if self.stops.is_raised(key).await {
            info!(session = %key, kind = self.kind_tag(), "stop observed, unwinding");
            return Err(Error::Stopped);
        }
        Ok(())
    }

    async fn notes_for_context(&self, key: &SessionKey) -> Vec<Note> {
        if !self.profile.context_flags.include_notes {
            return Vec::new();
        }
        let Some(store) = &self.notes else {
            return Vec::new();
        };
        match store.list(key).await {
            Ok(notes) => notes,
            Err(e) => {
                warn!(session = %key, error = %e, "note listing failed, formatting without notes");
                Vec::new()
            }
        }
    }

    /// Persist one note per result. Individual failures are logged and
    /// do not affect the already-emitted payload; a missing store is a
    /// single logged error for the whole batch.
    async fn persist_results(&self, key: &SessionKey, results: &[StructuredResult]) {
        if results.is_empty() {
            return;
        }
        let Some(store) = &self.notes else {
            warn!(session = %key, kind = self.kind_tag(), "note store not configured, batch not persisted");
            return;
        };
        for result in results {
            let mut note = Note::new(
                key.clone(),
                result.kind.tag(),
                result.sequence_id.to_string(),
                result.content.clone(),
            )
            .with_title(result.title.clone());
            note.aux = result.aux.clone();

            if let Err(e) = store.upsert(&note).await {
                warn!(
                    session = %key,
                    kind = self.kind_tag(),
                    id = result.sequence_id,
                    error = %e,
                    "note persistence failed"
                );
            }
        }
    }
}

/// Stream one LLM response to completion: content chunks accumulate into
/// the returned buffer, thought chunks pass straight through to the sink
/// as they arrive.
pub(crate) async fn stream_response(
    llm: &dyn LlmClient,
    sink: &dyn EventSink,
    tag: ContentTag,
    messages: Vec<ChatMessage>,
) -> Result<String, Error> {
    let mut rx = llm.stream(messages).await?;
    let mut buffer = String::new();

    while let Some(chunk) = rx.recv().await {
        let chunk = chunk?;
        if let Some(thought) = chunk.thought {
            if !thought.is_empty() {
                sink.emit(AgentEvent::text(tag, thought).with_meta("stage", "thought"))
                    .await;
            }
        }
        if let Some(content) = chunk.content {
            buffer.push_str(&content);
        }
        if chunk.done {
            break;
        }
    }

    Ok(buffer)
}

/// The display form of an instruction: content after the last `"||"`
/// separator when present, else the whole instruction.
pub fn display_instruction(instruction: &str) -> &str {
    match instruction.rsplit_once("||") {
        Some((_, tail)) => tail,
        None => instruction,
    }
}
