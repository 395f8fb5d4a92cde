use {
    bytes::Bytes,
    http::HeaderMap,
    inlet_protocol::headers,
    tracing::debug,
};

use crate::{
    Error, Result,
    adapter::{ChannelAdapter, id_field},
    event::ChannelEvent,
};

const CONVERSATION_FIELDS: &[&str] = &["conversationId", "conversation_id"];
const IDEMPOTENCY_FIELDS: &[&str] = &["idempotencyKey", "idempotency_key", "eventId"];

/// An HTTP request as seen by the web channel.
#[derive(Debug, Clone)]
pub struct WebInbound {
    /// Channel id taken from the route.
    pub channel_id: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Adapter for JSON webhook deliveries.
///
/// The body must be a JSON object. The conversation comes from the body
/// (`conversationId`) or the `x-conversation-id` header; the idempotency key
/// from the `idempotency-key` header or the body (`idempotencyKey`,
/// `eventId`). A missing conversation id is left empty for the validator to
/// reject.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebAdapter;

impl ChannelAdapter for WebAdapter {
    type Inbound = WebInbound;

    fn adapt(&self, inbound: WebInbound) -> Result<ChannelEvent> {
        let parsed: serde_json::Value = serde_json::from_slice(&inbound.body)
            .map_err(|e| Error::malformed(format!("body is not valid JSON: {e}")))?;
        let Some(obj) = parsed.as_object() else {
            return Err(Error::malformed("body must be a JSON object"));
        };

        let conversation_id = match id_field(obj, CONVERSATION_FIELDS) {
            Some(id) => id,
            None => header_value(&inbound.headers, headers::CONVERSATION_ID)?.unwrap_or_default(),
        };

        let idempotency_key = match header_value(&inbound.headers, headers::IDEMPOTENCY_KEY)? {
            Some(key) => Some(key),
            None => id_field(obj, IDEMPOTENCY_FIELDS),
        };

        debug!(
            channel_id = %inbound.channel_id,
            conversation_id = %conversation_id,
            bytes = inbound.body.len(),
            "adapted web delivery"
        );
        Ok(ChannelEvent::new(
            inbound.channel_id,
            conversation_id,
            inbound.body,
            idempotency_key,
        ))
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Result<Option<String>> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| Error::malformed(format!("header {name} is not valid text")))?
        .trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}
