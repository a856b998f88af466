//! Inbound message from a channel: the text to complete and who to answer.

/// A text message extracted from a channel webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Channel-specific sender id (for WhatsApp, the sender's phone number).
    pub sender: String,
    pub text: String,
}
