//! WhatsApp channel: Cloud API webhook envelope and outbound send via the Graph API.

use crate::channels::handle::{ChannelHandle, SendError};
use crate::channels::inbound::InboundMessage;
use crate::config::WhatsAppConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Webhook POST body. Every level may be missing: status pings carry `statuses` instead of `messages`.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value: Option<WebhookValue>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub messages: Vec<WhatsAppMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WhatsAppMessage {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub typ: Option<String>,
    #[serde(default)]
    pub text: Option<WhatsAppText>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WhatsAppText {
    #[serde(default)]
    pub body: Option<String>,
}

/// What the first message slot of an envelope holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeContent {
    /// No entry, change, value, message or sender (delivery/read status pings land here).
    NoMessage,
    /// A message without a text body (image, reaction, ...). Carries the platform's type tag.
    NonText { sender: String, kind: Option<String> },
    /// A text message to answer.
    Text(InboundMessage),
}

impl WebhookEnvelope {
    /// Classify `entry[0].changes[0].value.messages[0]`. Only the first message is considered.
    pub fn content(&self) -> EnvelopeContent {
        let Some(message) = self
            .entry
            .first()
            .and_then(|e| e.changes.first())
            .and_then(|c| c.value.as_ref())
            .and_then(|v| v.messages.first())
        else {
            return EnvelopeContent::NoMessage;
        };
        let Some(sender) = message.from.clone() else {
            return EnvelopeContent::NoMessage;
        };
        match message.text.as_ref().and_then(|t| t.body.clone()) {
            Some(text) => EnvelopeContent::Text(InboundMessage { sender, text }),
            None => EnvelopeContent::NonText {
                sender,
                kind: message.typ.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    messaging_product: &'a str,
    to: &'a str,
    text: SendMessageText<'a>,
}

#[derive(Debug, Serialize)]
struct SendMessageText<'a> {
    body: &'a str,
}

/// WhatsApp connector: sends text replies through the Graph API messages endpoint.
pub struct WhatsAppChannel {
    id: String,
    messages_url: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl WhatsAppChannel {
    /// Missing token or phone number id is not checked here; the Graph API rejects the send instead.
    pub fn new(config: &WhatsAppConfig) -> Self {
        let messages_url = format!(
            "{}/{}/{}/messages",
            config.graph_api_base.trim_end_matches('/'),
            config.graph_api_version.trim_matches('/'),
            config.phone_number_id.as_deref().unwrap_or_default()
        );
        Self {
            id: "whatsapp".to_string(),
            messages_url,
            access_token: config.access_token.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Full URL of the send endpoint.
    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }

    /// POST {graph}/{version}/{phone_number_id}/messages with a text body.
    pub async fn send_message(&self, to: &str, text: &str) -> Result<(), SendError> {
        let body = SendMessageRequest {
            messaging_product: "whatsapp",
            to,
            text: SendMessageText { body: text },
        };
        let mut req = self.client.post(&self.messages_url).json(&body);
        if let Some(ref token) = self.access_token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(SendError::Api { status, body });
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelHandle for WhatsAppChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send_message(&self, to: &str, text: &str) -> Result<(), SendError> {
        WhatsAppChannel::send_message(self, to, text).await
    }
}
