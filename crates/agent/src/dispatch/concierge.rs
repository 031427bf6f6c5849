//! The concierge — the richer directive grammar plus the single-hop
//! search → re-analysis cycle.
//!
//! Pipeline for one request:
//!
//! 1. Stream the concierge's own LLM response.
//! 2. Walk it once for directives: `create_note`/`save_material` are
//!    immediate side effects whose tag text is replaced in place with a
//!    confirmation or failure string; `call_orchestrator` is removed and
//!    queued; `web_search{N}` is replaced with a searching placeholder
//!    and queued.
//! 3. Segment the cleaned text into message/confirm results, allocate
//!    IDs in encounter order, emit one event.
//! 4. Run queued orchestrations, then queued searches (each through the
//!    websearch agent with the event's content tag rewritten).
//! 5. If any search ran: **exactly one** re-analysis LLM round with a
//!    fixed instruction. The re-analysis response carries
//!    [`Phase::ReAnalysis`] and is never re-scanned for directives —
//!    this is the boundary that prevents search ↔ re-analysis loops.

use crate::allocator::ActionIdAllocator;
use crate::context::format_context;
use crate::dispatch::orchestrator::{OrchestrationOutcome, OrchestratorDispatcher};
use crate::dispatch::{Phase, RetagSink};
use crate::profile::{profile_for, AgentProfile};
use crate::runner::{display_instruction, stream_response, AgentRunner};
use inkflow_core::error::Error;
use inkflow_core::{
    AgentEvent, AgentKind, ChatMessage, ContentTag, CounterStore, Directive, EventSink,
    LlmClient, Note, NoteStore, Session, SessionKey, StopFlags, StructuredResult,
};
use inkflow_protocol::{segment_confirms, split_directives, ConciergePiece, SegmentKind};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The fixed instruction seeding the single re-analysis round.
pub const RE_ANALYSIS_INSTRUCTION: &str = "请根据以上搜索结果进行总结";

/// Outcome of one concierge request.
pub struct ConciergeOutcome {
    /// The message/confirm results of the initial response.
    pub results: Vec<StructuredResult>,
    /// Outcomes of queued `call_orchestrator` instructions, in order.
    pub orchestrations: Vec<OrchestrationOutcome>,
    /// How many web searches were queued and run.
    pub searches: usize,
    /// Results of the re-analysis round; `None` when no search fired.
    pub re_analysis: Option<Vec<StructuredResult>>,
}

pub struct ConciergeDispatcher {
    profile: AgentProfile,
    llm: Arc<dyn LlmClient>,
    notes: Option<Arc<dyn NoteStore>>,
    counters: Arc<dyn CounterStore>,
    stops: Arc<dyn StopFlags>,
    sink: Arc<dyn EventSink>,
    allocator: ActionIdAllocator,
    clear_on_bind: bool,
}

impl ConciergeDispatcher {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        notes: Option<Arc<dyn NoteStore>>,
        counters: Arc<dyn CounterStore>,
        stops: Arc<dyn StopFlags>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            profile: profile_for(AgentKind::Concierge),
            llm,
            notes,
            allocator: ActionIdAllocator::new(counters.clone()),
            counters,
            stops,
            sink,
            clear_on_bind: true,
        }
    }

    pub fn with_clear_on_bind(mut self, clear: bool) -> Self {
        self.clear_on_bind = clear;
        self
    }

    /// Handle one user request end to end.
    pub async fn run(
        &self,
        session: &Session,
        instruction: &str,
    ) -> Result<ConciergeOutcome, Error> {
        let key = &session.key;
        info!(session = %key, "concierge run starting");

        if self.clear_on_bind {
            self.stops.clear(key).await;
        }
        self.ensure_not_stopped(key).await?;

        let raw = self.call_llm(session, instruction).await?;

        let (results, queued_orchestrations, queued_searches) = self
            .process_response(key, &raw, instruction, Phase::Initial)
            .await;

        let mut orchestrations = Vec::new();
        for queued in queued_orchestrations {
            match OrchestratorDispatcher::new(
                self.llm.clone(),
                self.notes.clone(),
                self.counters.clone(),
                self.stops.clone(),
                self.sink.clone(),
            )
            .with_clear_on_bind(false)
            .run(session, &queued)
            .await
            {
                Ok(outcome) => orchestrations.push(outcome),
                Err(Error::Stopped) => return Err(Error::Stopped),
                Err(e) => {
                    warn!(session = %key, error = %e, "queued orchestration failed, continuing");
                }
            }
        }

        let searches = queued_searches.len();
        for keyword in &queued_searches {
            let retag: Arc<dyn EventSink> = Arc::new(RetagSink::new(
                self.sink.clone(),
                ContentTag::ConciergeWebSearch,
            ));
            let runner = AgentRunner::new(
                profile_for(AgentKind::Websearch),
                self.llm.clone(),
                self.notes.clone(),
                self.counters.clone(),
                self.stops.clone(),
                retag,
            )
            .with_clear_on_bind(false);

            match runner.run(session, keyword).await {
                Ok(_) => {}
                Err(Error::Stopped) => return Err(Error::Stopped),
                Err(e) => {
                    warn!(session = %key, keyword = %keyword, error = %e, "queued search failed, continuing");
                }
            }
        }

        // The single additional hop. Regardless of how many searches
        // fired, this runs at most once per request.
        let re_analysis = if searches > 0 {
            let raw = self.call_llm(session, RE_ANALYSIS_INSTRUCTION).await?;
            let (results, orchestrations, searches) = self
                .process_response(key, &raw, RE_ANALYSIS_INSTRUCTION, Phase::ReAnalysis)
                .await;
            debug_assert!(orchestrations.is_empty() && searches.is_empty());
            Some(results)
        } else {
            None
        };

        info!(
            session = %key,
            results = results.len(),
            orchestrations = orchestrations.len(),
            searches,
            re_analysis = re_analysis.is_some(),
            "concierge run complete"
        );
        Ok(ConciergeOutcome {
            results,
            orchestrations,
            searches,
            re_analysis,
        })
    }

    /// Interpret one LLM response according to its phase and emit its
    /// message/confirm results. Returns queued orchestrator instructions
    /// and search keywords — both always empty for a re-analysis
    /// response, which is only ever segmented.
    async fn process_response(
        &self,
        key: &SessionKey,
        raw: &str,
        instruction: &str,
        phase: Phase,
    ) -> (Vec<StructuredResult>, Vec<String>, Vec<String>) {
        let (cleaned, orchestrations, searches) = match phase {
            Phase::Initial => self.apply_directives(key, raw).await,
            Phase::ReAnalysis => {
                debug!(session = %key, "re-analysis response, directive scan disabled");
                (raw.to_string(), Vec::new(), Vec::new())
            }
        };

        let results = self.emit_segments(key, &cleaned, instruction).await;
        (results, orchestrations, searches)
    }

    /// Walk the response once: perform immediate side effects, rewrite
    /// their tags into human-readable strings, queue the rest. The user
    /// never sees raw directive markup.
    async fn apply_directives(
        &self,
        key: &SessionKey,
        raw: &str,
    ) -> (String, Vec<String>, Vec<String>) {
        let mut cleaned = String::new();
        let mut orchestrations = Vec::new();
        let mut searches = Vec::new();

        for piece in split_directives(raw) {
            match piece {
                ConciergePiece::Text(text) => cleaned.push_str(&text),
                ConciergePiece::Directive(Directive::CreateNote {
                    note_type,
                    id,
                    content,
                }) => {
                    let replacement = self.persist(key, &note_type, &id, &content, "笔记").await;
                    cleaned.push_str(&replacement);
                }
                ConciergePiece::Directive(Directive::SaveMaterial { id, content }) => {
                    let replacement = self.persist(key, "material", &id, &content, "素材").await;
                    cleaned.push_str(&replacement);
                }
                ConciergePiece::Directive(Directive::CallOrchestrator { instruction }) => {
                    // Removed from the displayed text entirely.
                    orchestrations.push(instruction);
                }
                ConciergePiece::Directive(Directive::WebSearch { keyword }) => {
                    cleaned.push_str(&format!("（正在搜索：{keyword}……）"));
                    searches.push(keyword);
                }
            }
        }

        (cleaned, orchestrations, searches)
    }

    /// Upsert a note/material and return the in-place replacement string.
    async fn persist(
        &self,
        key: &SessionKey,
        kind: &str,
        id: &str,
        content: &str,
        what: &str,
    ) -> String {
        let Some(store) = &self.notes else {
            warn!(session = %key, kind, id, "note store not configured, side effect dropped");
            return format!("（{what}保存失败：{id}）");
        };
        let note = Note::new(key.clone(), kind, id, content);
        match store.upsert(&note).await {
            Ok(()) => {
                debug!(session = %key, kind, id, "directive side effect persisted");
                format!("（已保存{what}：{id}）")
            }
            Err(e) => {
                warn!(session = %key, kind, id, error = %e, "directive side effect failed");
                format!("（{what}保存失败：{id}）")
            }
        }
    }

    /// Segment the cleaned text and emit one event with the full result
    /// list. Each segment gets a fresh sequence ID in encounter order.
    async fn emit_segments(
        &self,
        key: &SessionKey,
        cleaned: &str,
        instruction: &str,
    ) -> Vec<StructuredResult> {
        let segments = segment_confirms(cleaned);
        if segments.is_empty() {
            debug!(session = %key, "nothing left to display after directive rewrite");
            return Vec::new();
        }

        let mut results = Vec::new();
        for (position, segment) in segments.into_iter().enumerate() {
            let Some(id) = self.allocator.allocate(key, AgentKind::Concierge).await else {
                continue;
            };
            let (marker, title) = match segment.kind {
                SegmentKind::Message => ("message", format!("消息 {}", position + 1)),
                SegmentKind::Confirm => ("confirm", format!("确认 {}", position + 1)),
            };
            results.push(
                StructuredResult::new(id, AgentKind::Concierge, title, segment.text)
                    .with_aux("segment", marker),
            );
        }

        self.sink
            .emit(
                AgentEvent::results(self.profile.content_tag, results.clone())
                    .with_meta("instruction", display_instruction(instruction)),
            )
            .await;
        results
    }

    async fn call_llm(&self, session: &Session, instruction: &str) -> Result<String, Error> {
        let key = &session.key;
        let notes_ctx = match &self.notes {
            Some(store) if self.profile.context_flags.include_notes => {
                store.list(key).await.unwrap_or_else(|e| {
                    warn!(session = %key, error = %e, "note listing failed, formatting without notes");
                    Vec::new()
                })
            }
            _ => Vec::new(),
        };
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

        self.ensure_not_stopped(key).await?;
        let raw = stream_response(
            self.llm.as_ref(),
            self.sink.as_ref(),
            self.profile.content_tag,
            messages,
        )
        .await?;
        self.ensure_not_stopped(key).await?;
        Ok(raw)
    }

    async fn ensure_not_stopped(&self, key: &SessionKey) -> Result<(), Error> {
        if self.stops.is_raised(key).await {
            info!(session = %key, "stop observed, unwinding concierge run");
            return Err(Error::Stopped);
        }
        Ok(())
    }
}
