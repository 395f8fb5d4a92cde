use {
    bytes::Bytes,
    chrono::{DateTime, Utc},
    sha2::{Digest, Sha256},
};

/// A unit of inbound work, immutable once an adapter has built it.
///
/// The raw transport body is retained untouched; handlers that need the
/// structured form call [`ChannelEvent::json`].
#[derive(Debug, Clone)]
pub struct ChannelEvent {
    channel_id: String,
    conversation_id: String,
    payload: Bytes,
    received_at: DateTime<Utc>,
    idempotency_key: String,
}

impl ChannelEvent {
    /// Build an event received now. Without an explicit key, the key is
    /// derived from the channel, conversation and body bytes, so a
    /// byte-identical redelivery maps to the same key.
    pub fn new(
        channel_id: impl Into<String>,
        conversation_id: impl Into<String>,
        payload: Bytes,
        idempotency_key: Option<String>,
    ) -> Self {
        let channel_id = channel_id.into();
        let conversation_id = conversation_id.into();
        let idempotency_key = idempotency_key
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| derive_idempotency_key(&channel_id, &conversation_id, &payload));
        Self {
            channel_id,
            conversation_id,
            payload,
            received_at: Utc::now(),
            idempotency_key,
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn idempotency_key(&self) -> &str {
        &self.idempotency_key
    }

    /// Parse the retained body as JSON.
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.payload)
    }

    /// JSON description of the event, as forwarded to downstream services.
    pub fn to_envelope(&self) -> serde_json::Value {
        serde_json::json!({
            "channelId": self.channel_id,
            "conversationId": self.conversation_id,
            "idempotencyKey": self.idempotency_key,
            "receivedAt": self.received_at,
            "payload": self.json().unwrap_or(serde_json::Value::Null),
        })
    }
}

/// Hex SHA-256 over `channel \0 conversation \0 body`.
pub fn derive_idempotency_key(channel_id: &str, conversation_id: &str, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(channel_id.as_bytes());
    hasher.update([0]);
    hasher.update(conversation_id.as_bytes());
    hasher.update([0]);
    hasher.update(body);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_key_is_stable_for_identical_bodies() {
        let body = Bytes::from_static(br#"{"text":"hi"}"#);
        let a = ChannelEvent::new("web", "c1", body.clone(), None);
        let b = ChannelEvent::new("web", "c1", body, None);
        assert_eq!(a.idempotency_key(), b.idempotency_key());
        assert_eq!(a.idempotency_key().len(), 64);
    }

    #[test]
    fn derived_key_separates_fields() {
        // "ab" + "c" must not collide with "a" + "bc".
        assert_ne!(
            derive_idempotency_key("ab", "c", b""),
            derive_idempotency_key("a", "bc", b"")
        );
    }

    #[test]
    fn explicit_key_wins_unless_empty() {
        let e = ChannelEvent::new("web", "c1", Bytes::new(), Some("evt-1".into()));
        assert_eq!(e.idempotency_key(), "evt-1");
        let e = ChannelEvent::new("web", "c1", Bytes::new(), Some(String::new()));
        assert_eq!(e.idempotency_key().len(), 64);
    }

    #[test]
    fn envelope_embeds_parsed_payload() {
        let e = ChannelEvent::new(
            "web",
            "c1",
            Bytes::from_static(br#"{"text":"hi"}"#),
            Some("k".into()),
        );
        let env = e.to_envelope();
        assert_eq!(env["channelId"], "web");
        assert_eq!(env["payload"]["text"], "hi");
    }
}
