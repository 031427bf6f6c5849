//! The structured result — the parsed, ID-tagged unit of agent output.

use crate::kind::AgentKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One structured result extracted from an agent response.
///
/// `sequence_id` is unique within (session, kind), monotonic, and 1-based.
/// It is assigned at emission time by the allocator — not the numeral
/// suffix of the raw tag the block was parsed from — and is never
/// reassigned: allocation is the single source of truth for uniqueness,
/// even under concurrent retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredResult {
    pub sequence_id: i64,

    /// Display title; synthesized from the kind's label when the block
    /// carried no `<title>`.
    pub title: String,

    pub content: String,

    pub kind: AgentKind,

    /// Kind-specific auxiliary fields (`cover_text`, `hook`, …) plus
    /// markers like the concierge's `segment` discriminator.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aux: BTreeMap<String, String>,
}

impl StructuredResult {
    pub fn new(
        sequence_id: i64,
        kind: AgentKind,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            sequence_id,
            title: title.into(),
            content: content.into(),
            kind,
            aux: BTreeMap::new(),
        }
    }

    /// Attach an auxiliary field, returning self for chaining.
    pub fn with_aux(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.aux.insert(key.into(), value.into());
        self
    }
}
