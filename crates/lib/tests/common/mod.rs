//! Shared helpers for gateway integration tests: mock completion provider, mock Graph API,
//! and a gateway bound to an ephemeral port.

#![allow(dead_code)]

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use lib::config::Config;
use lib::gateway::{self, GatewayState};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Requests seen by a mock server, in arrival order.
#[derive(Clone, Default)]
pub struct Recorder {
    inner: Arc<Mutex<Vec<Recorded>>>,
}

#[derive(Clone, Debug)]
pub struct Recorded {
    pub authorization: Option<String>,
    pub body: Value,
}

impl Recorder {
    fn push(&self, headers: &HeaderMap, body: Value) {
        let authorization = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        self.inner.lock().unwrap().push(Recorded {
            authorization,
            body,
        });
    }

    pub fn all(&self) -> Vec<Recorded> {
        self.inner.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: Value,
    recorder: Recorder,
}

async fn record_and_reply(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.recorder.push(&headers, body);
    (state.status, Json(state.body.clone()))
}

async fn spawn_router(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("local_addr");
    let router = router.layer(DefaultBodyLimit::disable());
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{}", addr)
}

/// OpenAI-compatible provider answering `POST /chat/completions`. Returns the base URL.
pub async fn spawn_provider(status: StatusCode, reply: &str) -> (String, Recorder) {
    let recorder = Recorder::default();
    let body = if status.is_success() {
        json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": reply},
                "finish_reason": "stop"
            }]
        })
    } else {
        json!({"error": {"message": reply, "type": "invalid_request_error"}})
    };
    let state = MockState {
        status,
        body,
        recorder: recorder.clone(),
    };
    let router = Router::new()
        .route("/chat/completions", post(record_and_reply))
        .with_state(state);
    (spawn_router(router).await, recorder)
}

/// Graph API answering `POST /v18.0/{phone_number_id}/messages`. Returns the API root.
pub async fn spawn_graph(status: StatusCode) -> (String, Recorder) {
    let recorder = Recorder::default();
    let body = if status.is_success() {
        json!({"messaging_product": "whatsapp", "messages": [{"id": "wamid.test"}]})
    } else {
        json!({"error": {"message": "Invalid OAuth access token.", "code": 190}})
    };
    let state = MockState {
        status,
        body,
        recorder: recorder.clone(),
    };
    let router = Router::new()
        .route("/v18.0/:phone_number_id/messages", post(record_and_reply))
        .with_state(state);
    (spawn_router(router).await, recorder)
}

/// Fake `/generate` endpoint returning a fixed status and body.
pub async fn spawn_generate(status: StatusCode, body: Value) -> (String, Recorder) {
    let recorder = Recorder::default();
    let state = MockState {
        status,
        body,
        recorder: recorder.clone(),
    };
    let router = Router::new()
        .route("/generate", post(record_and_reply))
        .with_state(state);
    (format!("{}/generate", spawn_router(router).await), recorder)
}

/// Config pointing at the given provider and Graph mocks, with retries disabled.
pub fn test_config(provider_base: &str, graph_base: &str) -> Config {
    let mut config = Config::default();
    config.gateway.bind = "127.0.0.1".to_string();
    config.whatsapp.verify_token = Some("s3cret".to_string());
    config.whatsapp.access_token = Some("wa-token".to_string());
    config.whatsapp.phone_number_id = Some("106540352242922".to_string());
    config.whatsapp.graph_api_base = graph_base.to_string();
    config.completion.api_key = Some("gsk-test".to_string());
    config.completion.base_url = provider_base.to_string();
    config.completion.max_retries = 0;
    config
}

/// Start the gateway on an ephemeral port; `config.gateway.port` is set to the bound port.
pub async fn spawn_gateway(mut config: Config) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind gateway");
    let addr = listener.local_addr().expect("local_addr");
    config.gateway.port = addr.port();
    let state = GatewayState::from_config(config);
    tokio::spawn(async move {
        let _ = gateway::serve(listener, state, std::future::pending()).await;
    });
    format!("http://{}", addr)
}

/// WhatsApp text message envelope as the platform posts it.
pub fn text_envelope(from: &str, body: &str) -> Value {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "102290129340398",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {"display_phone_number": "15550783881", "phone_number_id": "106540352242922"},
                    "messages": [{
                        "from": from,
                        "id": "wamid.HBgLMTY1MDM4Nzk0MzkVAgASGBQzQTRBNjU5OUFFRTAzODEwMTQ0RgA=",
                        "timestamp": "1749416383",
                        "type": "text",
                        "text": {"body": body}
                    }]
                }
            }]
        }]
    })
}
