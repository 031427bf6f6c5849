//! The context formatter — assembles the bounded conversational context
//! fed into each LLM call.
//!
//! History is rendered from the most recent [`HISTORY_WINDOW`] turns
//! only; older turns are dropped, never summarized. Absent categories
//! omit their section entirely rather than emitting an empty header.

use inkflow_core::{Note, Session};
use std::collections::BTreeMap;

/// How many trailing turns of history are rendered into a prompt.
pub const HISTORY_WINDOW: usize = 6;

/// Which context categories to include for a given agent kind.
#[derive(Debug, Clone, Copy)]
pub struct ContextFlags {
    pub include_history: bool,
    pub include_notes: bool,
    pub include_selections: bool,
}

impl ContextFlags {
    pub fn all() -> Self {
        Self {
            include_history: true,
            include_notes: true,
            include_selections: true,
        }
    }

    pub fn none() -> Self {
        Self {
            include_history: false,
            include_notes: false,
            include_selections: false,
        }
    }

    pub fn history_only() -> Self {
        Self {
            include_history: true,
            include_notes: false,
            include_selections: false,
        }
    }
}

impl Default for ContextFlags {
    fn default() -> Self {
        Self::all()
    }
}

/// Render the session context as a single prompt-ready text block.
///
/// Sections are joined with a blank line, each headed by a marker
/// identifying the block. An empty category contributes nothing.
pub fn format_context(session: &Session, notes: &[Note], flags: &ContextFlags) -> String {
    let mut sections: Vec<String> = Vec::new();

    if flags.include_history && !session.turns.is_empty() {
        let lines: Vec<String> = session
            .recent_turns(HISTORY_WINDOW)
            .iter()
            .map(|t| format!("{}:{}", t.role.as_str(), t.content))
            .collect();
        sections.push(format!("[对话历史]\n{}", lines.join("\n")));
    }

    if flags.include_notes && !notes.is_empty() {
        // Group by kind, concatenate per kind.
        let mut by_kind: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for note in notes {
            by_kind.entry(note.kind.as_str()).or_default().push(note.content.as_str());
        }
        let mut block = String::from("[已有笔记]");
        for (kind, contents) in by_kind {
            block.push_str(&format!("\n{}:\n{}", kind, contents.join("\n")));
        }
        sections.push(block);
    }

    if flags.include_selections && !session.selections.is_empty() {
        sections.push(format!(
            "[用户选择]\n{}",
            session.selections.join("\n")
        ));
    }

    sections.join("\n\n")
}
