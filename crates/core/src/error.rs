//! Error types for the Inkflow domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Inkflow operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- LLM client errors ---
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    // --- Counter store errors ---
    #[error("Counter error: {0}")]
    Counter(#[from] CounterError),

    // --- Note persistence errors ---
    #[error("Note error: {0}")]
    Note(#[from] NoteError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A user-requested stop was observed at one of the two poll points.
    /// Control-flow signal, not a failure: the current runner unwinds
    /// without side effects.
    #[error("stop requested for session")]
    Stopped,

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Client not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("Counter store unavailable: {0}")]
    Unavailable(String),

    #[error("Increment failed for {key}: {reason}")]
    IncrementFailed { key: String, reason: String },
}

#[derive(Debug, Error)]
pub enum NoteError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Note store not configured")]
    NotConfigured,
}
