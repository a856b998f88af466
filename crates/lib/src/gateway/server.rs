//! Gateway HTTP server: health, generate, and the WhatsApp webhook on a single port.

use crate::channels::{ChannelHandle, WebhookEnvelope, WhatsAppChannel};
use crate::config::{self, CompletionRoute, Config};
use crate::gateway::handler::{handle_envelope, HandleOutcome};
use crate::gateway::protocol::{ErrorResponse, GenerateRequest, GenerateResponse, VerifyQuery};
use crate::gateway::verify::{verify_subscription, Verification};
use crate::llm::{Completer, GenerateEndpointClient, GroqClient};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Body of every webhook POST response.
pub const WEBHOOK_ACK: &str = "ok";

/// Shared, read-only state for request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    /// Backs `POST /generate`; always the in-process provider client.
    pub generator: Arc<dyn Completer>,
    /// Used by the webhook handler: the generator itself, or a loopback client to `/generate`.
    pub completer: Arc<dyn Completer>,
    /// Outbound delivery for webhook replies.
    pub channel: Arc<dyn ChannelHandle>,
}

impl GatewayState {
    /// Build the production clients from config.
    pub fn from_config(config: Config) -> Self {
        let generator: Arc<dyn Completer> = Arc::new(GroqClient::new(&config.completion));
        let completer: Arc<dyn Completer> = match config.completion.route {
            CompletionRoute::InProcess => generator.clone(),
            CompletionRoute::Loopback => {
                let client = GenerateEndpointClient::new(config::resolve_generate_url(&config));
                log::info!("webhook completions routed through {}", client.url());
                Arc::new(client)
            }
        };
        let channel: Arc<dyn ChannelHandle> = Arc::new(WhatsAppChannel::new(&config.whatsapp));
        Self {
            config: Arc::new(config),
            generator,
            completer,
            channel,
        }
    }
}

/// Routes: `GET /`, `POST /generate`, `GET|POST /webhook`, with permissive CORS.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/generate", post(generate))
        .route(
            "/webhook",
            get(verify_webhook)
                .post(receive_webhook)
                .layer(DefaultBodyLimit::disable()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind from config and serve until SIGINT/SIGTERM.
pub async fn run_gateway(config: Config) -> Result<()> {
    for name in config.missing_secrets() {
        log::warn!("{} is not set; calls that need it will be rejected upstream", name);
    }
    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);
    serve(listener, GatewayState::from_config(config), shutdown_signal()).await
}

/// Serve the router on an already-bound listener until `shutdown` completes.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    state: GatewayState,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
    }))
}

fn generate_error(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { error: message }),
    )
        .into_response()
}

/// POST /generate: `{prompt}` in, `{response}` out; any failure is a 500 with `{error}`.
async fn generate(State(state): State<GatewayState>, body: Bytes) -> Response {
    let req: GenerateRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return generate_error(format!("invalid request body: {}", e)),
    };
    match state.generator.complete(&req.prompt).await {
        Ok(response) => (StatusCode::OK, Json(GenerateResponse { response })).into_response(),
        Err(e) => {
            log::warn!("generate: {}", e);
            generate_error(e.to_string())
        }
    }
}

/// GET /webhook: platform verification handshake. Repeated `hub.*` keys use the first value.
async fn verify_webhook(
    State(state): State<GatewayState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Verification {
    let query = VerifyQuery::from_pairs(&pairs);
    let result = verify_subscription(&query, state.config.whatsapp.verify_token.as_deref());
    if result == Verification::Rejected {
        log::warn!(
            "webhook verification rejected (mode {:?})",
            query.mode.as_deref().unwrap_or("")
        );
    }
    result
}

/// POST /webhook: always `"ok"`/200, whatever happened downstream.
async fn receive_webhook(
    State(state): State<GatewayState>,
    body: Result<Bytes, BytesRejection>,
) -> (StatusCode, &'static str) {
    let body = match body {
        Ok(b) => b,
        Err(e) => {
            log::warn!("webhook: could not read body: {}", e);
            return (StatusCode::OK, WEBHOOK_ACK);
        }
    };
    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            log::warn!("webhook: unparseable body: {}", e);
            return (StatusCode::OK, WEBHOOK_ACK);
        }
    };
    match handle_envelope(&envelope, state.completer.as_ref(), state.channel.as_ref()).await {
        HandleOutcome::Replied { .. } | HandleOutcome::Ignored => {}
        HandleOutcome::CompletionFailed(_) | HandleOutcome::SendFailed(_) => {
            log::debug!("webhook: acknowledged despite failure");
        }
    }
    (StatusCode::OK, WEBHOOK_ACK)
}
