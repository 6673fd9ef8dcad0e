//! Inference backends
//!
//! Chat-style access to the models that describe and translate images.

pub mod ollama;
pub mod provider;

pub use ollama::OllamaProvider;
pub use provider::{ChatMessage, ChatRequest, ChatRole, InferenceProvider};

/// Inference errors
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("provider returned {status}: {body}")]
    ApiResponse { status: u16, body: String },
    #[error("failed to parse provider response: {0}")]
    ParseResponse(String),
    #[error("I/O error: {0}")]
    Io(String),
}
