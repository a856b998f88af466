//! Loopback completer: reaches the completion client through `POST /generate`.

use crate::llm::{Completer, CompletionError};
use async_trait::async_trait;
use serde::Deserialize;

/// Reply used when `/generate` succeeds but its body carries no `response` field.
pub const GENERATE_FALLBACK_REPLY: &str = "Sorry, I can't respond now.";

/// Client for a gateway's `/generate` endpoint.
#[derive(Clone)]
pub struct GenerateEndpointClient {
    url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    #[serde(default)]
    response: Option<String>,
}

impl GenerateEndpointClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Completer for GenerateEndpointClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = serde_json::json!({ "prompt": prompt });
        let res = self.client.post(&self.url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(CompletionError::Api { status, body });
        }
        let text = res.text().await?;
        let reply: GenerateReply =
            serde_json::from_str(&text).map_err(|e| CompletionError::Decode(e.to_string()))?;
        Ok(reply
            .response
            .unwrap_or_else(|| GENERATE_FALLBACK_REPLY.to_string()))
    }
}
