//! Session and conversation-turn domain types.
//!
//! A session is identified by (user-id, session-id) and owns an ordered
//! sequence of role-tagged turns. The history is semantically unbounded —
//! callers only ever see a bounded suffix, rendered by the context
//! formatter in the agent crate. Eviction and TTL belong to whatever
//! store embeds this runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a session: one user can hold many concurrent sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.user_id, self.session_id)
    }
}

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// An agent response
    Assistant,
    /// System instructions
    System,
}

impl Role {
    /// The wire string used when rendering history for a prompt.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// A single turn in a session's conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A session: conversation history plus the user's current selections.
///
/// Notes and per-kind counters also belong to the session conceptually,
/// but live behind the [`crate::NoteStore`] and [`crate::CounterStore`]
/// collaborators keyed by [`SessionKey`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub key: SessionKey,

    /// Ordered conversation history, oldest first.
    pub turns: Vec<Turn>,

    /// Verbatim user selections (picked results the user wants carried
    /// into the next prompt). May be empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selections: Vec<String>,
}

impl Session {
    pub fn new(key: SessionKey) -> Self {
        Self {
            key,
            turns: Vec::new(),
            selections: Vec::new(),
        }
    }

    /// Append a turn to the history.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// The most recent `n` turns, oldest first.
    pub fn recent_turns(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_display() {
        let key = SessionKey::new("u42", "s7");
        assert_eq!(key.to_string(), "u42:s7");
    }

    #[test]
    fn recent_turns_bounded() {
        let mut session = Session::new(SessionKey::new("u", "s"));
        for i in 0..10 {
            session.push(Turn::user(format!("turn {i}")));
        }
        let recent = session.recent_turns(6);
        assert_eq!(recent.len(), 6);
        assert_eq!(recent[0].content, "turn 4");
        assert_eq!(recent[5].content, "turn 9");
    }

    #[test]
    fn recent_turns_short_history() {
        let mut session = Session::new(SessionKey::new("u", "s"));
        session.push(Turn::user("only one"));
        assert_eq!(session.recent_turns(6).len(), 1);
    }
}
