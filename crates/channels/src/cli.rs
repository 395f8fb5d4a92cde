use {bytes::Bytes, inlet_protocol::CLI_CHANNEL};

use crate::{Error, Result, adapter::ChannelAdapter, event::ChannelEvent};

/// A single `inlet send` invocation.
#[derive(Debug, Clone)]
pub struct CliInbound {
    pub conversation_id: String,
    pub message: String,
    /// Treat `message` as a JSON object instead of plain text.
    pub json: bool,
    pub idempotency_key: Option<String>,
}

/// Adapter for events submitted from the command line.
///
/// Plain text becomes `{"text": <message>}`; `--json` messages must already
/// be a JSON object.
#[derive(Debug, Clone)]
pub struct CliAdapter {
    channel_id: String,
}

impl Default for CliAdapter {
    fn default() -> Self {
        Self::new(CLI_CHANNEL)
    }
}

impl CliAdapter {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
        }
    }
}

impl ChannelAdapter for CliAdapter {
    type Inbound = CliInbound;

    fn adapt(&self, inbound: CliInbound) -> Result<ChannelEvent> {
        let body = if inbound.json {
            let value: serde_json::Value = serde_json::from_str(&inbound.message)
                .map_err(|e| Error::malformed(format!("message is not valid JSON: {e}")))?;
            if !value.is_object() {
                return Err(Error::malformed("message must be a JSON object"));
            }
            Bytes::from(inbound.message.into_bytes())
        } else {
            let wrapped = serde_json::json!({ "text": inbound.message });
            Bytes::from(serde_json::to_vec(&wrapped).map_err(Error::malformed)?)
        };

        Ok(ChannelEvent::new(
            self.channel_id.clone(),
            inbound.conversation_id,
            body,
            inbound.idempotency_key,
        ))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn send(message: &str, json: bool) -> Result<ChannelEvent> {
        CliAdapter::default().adapt(CliInbound {
            conversation_id: "local".into(),
            message: message.into(),
            json,
            idempotency_key: None,
        })
    }

    #[test]
    fn wraps_plain_text() {
        let event = send("hello there", false).unwrap();
        assert_eq!(event.channel_id(), "cli");
        assert_eq!(event.json().unwrap(), serde_json::json!({ "text": "hello there" }));
    }

    #[test]
    fn keeps_json_body_verbatim() {
        let event = send(r#"{"a": 1}"#, true).unwrap();
        assert_eq!(event.payload().as_ref(), br#"{"a": 1}"#);
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(matches!(send("{nope", true), Err(Error::MalformedInput { .. })));
        assert!(matches!(send("12", true), Err(Error::MalformedInput { .. })));
    }
}
