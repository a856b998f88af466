//! Webhook verification handshake (`GET /webhook`).

use crate::gateway::protocol::VerifyQuery;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// The only `hub.mode` the platform uses for subscription checks.
pub const SUBSCRIBE_MODE: &str = "subscribe";

/// Body returned with 403 when the handshake does not match.
pub const VERIFICATION_FAILED: &str = "Verification failed";

/// Result of a verification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Mode and token matched; echo this challenge.
    Verified(String),
    Rejected,
}

/// Compare the query against the configured verify token. An unset token never matches.
pub fn verify_subscription(query: &VerifyQuery, verify_token: Option<&str>) -> Verification {
    let mode_ok = query.mode.as_deref() == Some(SUBSCRIBE_MODE);
    let token_ok = match (query.verify_token.as_deref(), verify_token) {
        (Some(given), Some(expected)) => given == expected,
        _ => false,
    };
    if mode_ok && token_ok {
        Verification::Verified(query.challenge.clone().unwrap_or_default())
    } else {
        Verification::Rejected
    }
}

impl IntoResponse for Verification {
    fn into_response(self) -> Response {
        match self {
            Verification::Verified(challenge) => (StatusCode::OK, challenge).into_response(),
            Verification::Rejected => (StatusCode::FORBIDDEN, VERIFICATION_FAILED).into_response(),
        }
    }
}
