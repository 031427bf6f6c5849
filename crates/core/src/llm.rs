//! LlmClient trait — the abstraction over streaming text-completion backends.
//!
//! A client knows how to send a fixed system prompt plus a user prompt to
//! an LLM and hand back the response as a stream of chunks. The agent
//! runner accumulates content chunks into one buffer and forwards thought
//! chunks to the caller as they arrive.

use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role of one chat message sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in the request sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A single chunk in a streaming response.
///
/// `content` deltas accumulate into the response buffer; `thought` deltas
/// are reasoning text the caller may surface in real time but which never
/// enters the parsed response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub thought: Option<String>,

    /// Whether this is the final chunk.
    #[serde(default)]
    pub done: bool,
}

/// The streaming LLM collaborator.
///
/// The receiver is bounded: at most one chunk is in flight between the
/// client task and the consuming runner.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// A human-readable name for this client (e.g., "openai_compat").
    fn name(&self) -> &str;

    /// Send the messages and stream the response back chunk by chunk.
    async fn stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, LlmError>>,
        LlmError,
    >;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_roles_serialize_lowercase() {
        let msg = ChatMessage::system("be terse");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""role":"system""#));
    }

    #[test]
    fn stream_chunk_defaults() {
        let chunk: StreamChunk = serde_json::from_str("{}").unwrap();
        assert!(chunk.content.is_none());
        assert!(chunk.thought.is_none());
        assert!(!chunk.done);
    }
}
