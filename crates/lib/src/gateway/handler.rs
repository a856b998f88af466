//! Inbound webhook pipeline: envelope → completion → reply.
//!
//! Every stage returns an explicit outcome; the HTTP layer acknowledges all of them with
//! `"ok"` so the platform never sees a failure and never redelivers.

use crate::channels::{ChannelHandle, EnvelopeContent, SendError, WebhookEnvelope};
use crate::llm::{Completer, CompletionError};

/// What happened to one webhook delivery.
#[derive(Debug)]
pub enum HandleOutcome {
    /// Nothing to answer (status ping, empty envelope, non-text message).
    Ignored,
    /// Reply delivered to this sender.
    Replied { sender: String },
    /// The completer failed; nothing was sent.
    CompletionFailed(CompletionError),
    /// The completion succeeded but delivery failed.
    SendFailed(SendError),
}

/// Run the pipeline for one envelope: at most one completion call and one send.
pub async fn handle_envelope(
    envelope: &WebhookEnvelope,
    completer: &dyn Completer,
    channel: &dyn ChannelHandle,
) -> HandleOutcome {
    let message = match envelope.content() {
        EnvelopeContent::Text(m) => m,
        EnvelopeContent::NoMessage => {
            log::debug!("webhook: no message in envelope (status update?)");
            return HandleOutcome::Ignored;
        }
        EnvelopeContent::NonText { sender, kind } => {
            log::debug!(
                "webhook: ignoring non-text message from {} (type {})",
                sender,
                kind.as_deref().unwrap_or("unknown")
            );
            return HandleOutcome::Ignored;
        }
    };

    let reply = match completer.complete(&message.text).await {
        Ok(r) => r,
        Err(e) => {
            log::warn!("webhook: completion failed for {}: {}", message.sender, e);
            return HandleOutcome::CompletionFailed(e);
        }
    };

    if let Err(e) = channel.send_message(&message.sender, &reply).await {
        log::warn!(
            "webhook: {} send to {} failed: {}",
            channel.id(),
            message.sender,
            e
        );
        return HandleOutcome::SendFailed(e);
    }
    log::info!("webhook: replied to {} via {}", message.sender, channel.id());
    HandleOutcome::Replied {
        sender: message.sender,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeCompleter {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeCompleter {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Completer for FakeCompleter {
        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().ok_or(CompletionError::Api {
                status: 503,
                body: "over capacity".to_string(),
            })
        }
    }

    struct FakeChannel {
        fail: bool,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl FakeChannel {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChannelHandle for FakeChannel {
        fn id(&self) -> &str {
            "fake"
        }

        async fn send_message(&self, to: &str, text: &str) -> Result<(), SendError> {
            self.sent.lock().unwrap().push((to.to_string(), text.to_string()));
            if self.fail {
                Err(SendError::Api {
                    status: 401,
                    body: "invalid token".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn text_envelope(from: &str, body: &str) -> WebhookEnvelope {
        serde_json::from_value(serde_json::json!({
            "entry": [{"changes": [{"value": {"messages": [
                {"from": from, "type": "text", "text": {"body": body}}
            ]}}]}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn text_message_completes_once_and_replies_once() {
        let completer = FakeCompleter::replying("Hello from the model");
        let channel = FakeChannel::new(false);
        let outcome =
            handle_envelope(&text_envelope("15551234", "hi"), &completer, &channel).await;
        assert!(matches!(outcome, HandleOutcome::Replied { ref sender } if sender == "15551234"));
        assert_eq!(completer.prompts(), vec!["hi".to_string()]);
        assert_eq!(
            channel.sent(),
            vec![("15551234".to_string(), "Hello from the model".to_string())]
        );
    }

    #[tokio::test]
    async fn empty_value_is_ignored_without_calls() {
        let completer = FakeCompleter::replying("unused");
        let channel = FakeChannel::new(false);
        let envelope: WebhookEnvelope =
            serde_json::from_str(r#"{"entry":[{"changes":[{"value":{}}]}]}"#).unwrap();
        let outcome = handle_envelope(&envelope, &completer, &channel).await;
        assert!(matches!(outcome, HandleOutcome::Ignored));
        assert!(completer.prompts().is_empty());
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn non_text_message_is_ignored() {
        let completer = FakeCompleter::replying("unused");
        let channel = FakeChannel::new(false);
        let envelope: WebhookEnvelope = serde_json::from_str(
            r#"{"entry":[{"changes":[{"value":{"messages":[{"from":"1","type":"sticker"}]}}]}]}"#,
        )
        .unwrap();
        let outcome = handle_envelope(&envelope, &completer, &channel).await;
        assert!(matches!(outcome, HandleOutcome::Ignored));
        assert!(completer.prompts().is_empty());
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn completion_failure_sends_nothing() {
        let completer = FakeCompleter::failing();
        let channel = FakeChannel::new(false);
        let outcome =
            handle_envelope(&text_envelope("15551234", "hi"), &completer, &channel).await;
        assert!(matches!(outcome, HandleOutcome::CompletionFailed(_)));
        assert_eq!(completer.prompts().len(), 1);
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn send_failure_is_reported() {
        let completer = FakeCompleter::replying("reply");
        let channel = FakeChannel::new(true);
        let outcome =
            handle_envelope(&text_envelope("15551234", "hi"), &completer, &channel).await;
        assert!(matches!(outcome, HandleOutcome::SendFailed(_)));
        assert_eq!(channel.sent().len(), 1);
    }
}
