//! Communication channels (WhatsApp Cloud API).
//!
//! Envelope parsing for inbound webhooks and the [`ChannelHandle`] seam used to deliver replies.

mod handle;
mod inbound;
mod whatsapp;

pub use handle::{ChannelHandle, SendError};
pub use inbound::InboundMessage;
pub use whatsapp::{
    EnvelopeContent, WebhookChange, WebhookEntry, WebhookEnvelope, WebhookValue, WhatsAppChannel,
    WhatsAppMessage, WhatsAppText,
};
