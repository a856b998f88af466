//! Completion clients.
//!
//! A [`Completer`] turns one prompt into one reply. [`GroqClient`] calls the hosted
//! OpenAI-compatible chat completions API in-process; [`GenerateEndpointClient`] reaches the
//! same client through the gateway's own `POST /generate` endpoint.

mod generate;
mod groq;

use async_trait::async_trait;

pub use generate::{GenerateEndpointClient, GENERATE_FALLBACK_REPLY};
pub use groq::GroqClient;

/// Why a completion produced no reply text.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion api error: {status} {body}")]
    Api { status: u16, body: String },
    #[error("completion response has no message content")]
    EmptyResponse,
    #[error("completion response could not be parsed: {0}")]
    Decode(String),
}

/// Prompt in, reply out. No conversation state is kept between calls.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}
