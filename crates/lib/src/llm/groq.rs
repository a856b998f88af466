//! Groq client (OpenAI-compatible `/chat/completions`).
//!
//! One user message per request, temperature and model from config, no output cap unless
//! configured. Transport errors, 408, 409, 429 and 5xx are retried up to `max_retries` extra
//! times.

use crate::config::CompletionConfig;
use crate::llm::{Completer, CompletionError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Client for the hosted completion API.
#[derive(Clone)]
pub struct GroqClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_retries: u32,
    retry_delay: Duration,
    client: reqwest::Client,
}

impl GroqClient {
    pub fn new(config: &CompletionConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_delay: DEFAULT_RETRY_DELAY,
            client: reqwest::Client::new(),
        }
    }

    /// Base delay between attempts; doubles after each retry.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// POST /chat/completions once. Returns the reply text.
    async fn chat_once(&self, prompt: &str) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatRequestMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let mut req = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(CompletionError::Api { status, body });
        }
        let text = res.text().await?;
        parse_chat_response(&text)
    }
}

/// Whether a failed attempt is worth repeating.
fn is_retryable(err: &CompletionError) -> bool {
    match err {
        CompletionError::Request(e) => !e.is_builder(),
        CompletionError::Api { status, .. } => {
            matches!(*status, 408 | 409 | 429) || *status >= 500
        }
        CompletionError::EmptyResponse | CompletionError::Decode(_) => false,
    }
}

/// Extract `choices[0].message.content` from a chat completions body.
fn parse_chat_response(body: &str) -> Result<String, CompletionError> {
    let data: ChatResponse =
        serde_json::from_str(body).map_err(|e| CompletionError::Decode(e.to_string()))?;
    data.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(CompletionError::EmptyResponse)
}

#[async_trait]
impl Completer for GroqClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let mut attempt = 0;
        loop {
            match self.chat_once(prompt).await {
                Ok(reply) => return Ok(reply),
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    let delay = self.retry_delay * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    log::debug!(
                        "completion attempt {} failed, retrying in {:?}: {}",
                        attempt,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
