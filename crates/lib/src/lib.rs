//! chatrelay core library: configuration, completion clients, the WhatsApp channel, and the
//! gateway that ties them together. Used by the CLI.

pub mod channels;
pub mod config;
pub mod gateway;
pub mod llm;
