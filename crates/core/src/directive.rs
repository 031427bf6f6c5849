//! Directives — control instructions embedded in concierge output.
//!
//! Directives are extracted once per response text and are never nested
//! or chained. The orchestrator's `<execute/>` form is a separate grammar
//! and stays in the protocol crate as a raw (action, instruction) pair
//! until the dispatcher maps it to an [`crate::AgentKind`].

use serde::{Deserialize, Serialize};

/// A parsed concierge control instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "directive", rename_all = "snake_case")]
pub enum Directive {
    /// Persist a note of the given type. Immediate side effect; the tag
    /// text is replaced in place with a confirmation or failure string.
    CreateNote {
        note_type: String,
        id: String,
        content: String,
    },

    /// Persist a reusable material. Same replacement behavior.
    SaveMaterial { id: String, content: String },

    /// Queue an instruction for a fresh orchestrator run; the tag is
    /// removed from the displayed text.
    CallOrchestrator { instruction: String },

    /// Queue a web search; the tag is replaced with a searching
    /// placeholder.
    WebSearch { keyword: String },
}
