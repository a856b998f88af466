//! Gateway HTTP wire types (generate endpoint, webhook verification query).

use serde::{Deserialize, Serialize};

/// `POST /generate` body. A missing prompt is an empty prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
}

/// `POST /generate` success body: `{ "response": text }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
}

/// Error body for `/generate`: `{ "error": message }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `GET /webhook` query: `hub.mode`, `hub.verify_token`, `hub.challenge`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode", default)]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token", default)]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge", default)]
    pub challenge: Option<String>,
}

impl VerifyQuery {
    /// Build from raw query pairs, keeping the first value of each `hub.*` key.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let first = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };
        Self {
            mode: first("hub.mode"),
            verify_token: first("hub.verify_token"),
            challenge: first("hub.challenge"),
        }
    }
}
