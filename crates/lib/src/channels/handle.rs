//! Outbound side of a channel.

use async_trait::async_trait;

/// Why a reply could not be delivered.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("send request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("send api error: {status} {body}")]
    Api { status: u16, body: String },
}

/// Handle to a channel that can deliver a text reply.
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Channel id (e.g. "whatsapp").
    fn id(&self) -> &str;
    /// Send a text message to a recipient (for WhatsApp, a phone number).
    async fn send_message(&self, to: &str, text: &str) -> Result<(), SendError>;
}
