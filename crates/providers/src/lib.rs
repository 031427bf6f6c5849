//! # Inkflow Providers
//!
//! Implementations of the [`inkflow_core::LlmClient`] trait.
//!
//! The OpenAI-compatible client covers the vast majority of hosted and
//! self-hosted backends, since most expose a `/v1/chat/completions`
//! endpoint with SSE streaming.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatClient;
