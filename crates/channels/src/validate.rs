use {
    inlet_config::ValidationConfig,
    serde::{Deserialize, Serialize},
};

use crate::{event::ChannelEvent, gating};

/// Stable, machine-matchable reason an event was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    EmptyChannelId,
    ChannelNotAllowed,
    EmptyConversationId,
    ConversationIdTooLong,
    InvalidConversationId,
    PayloadTooLarge,
}

impl ValidationCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptyChannelId => "EMPTY_CHANNEL_ID",
            Self::ChannelNotAllowed => "CHANNEL_NOT_ALLOWED",
            Self::EmptyConversationId => "EMPTY_CONVERSATION_ID",
            Self::ConversationIdTooLong => "CONVERSATION_ID_TOO_LONG",
            Self::InvalidConversationId => "INVALID_CONVERSATION_ID",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
        }
    }
}

impl std::fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected event: the code for machines, the reason for humans.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {reason}")]
pub struct ValidationError {
    pub code: ValidationCode,
    pub reason: String,
}

impl ValidationError {
    fn new(code: ValidationCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Limits applied by [`EventValidator`].
#[derive(Debug, Clone)]
pub struct ValidationRules {
    pub max_payload_bytes: usize,
    pub max_conversation_id_len: usize,
    /// Exact ids or `*` patterns; empty allows every channel.
    pub allowed_channels: Vec<String>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            max_payload_bytes: inlet_protocol::MAX_PAYLOAD_BYTES,
            max_conversation_id_len: inlet_protocol::MAX_CONVERSATION_ID_LEN,
            allowed_channels: Vec::new(),
        }
    }
}

impl From<&ValidationConfig> for ValidationRules {
    fn from(cfg: &ValidationConfig) -> Self {
        Self {
            max_payload_bytes: cfg.max_payload_bytes,
            max_conversation_id_len: cfg.max_conversation_id_len,
            allowed_channels: cfg.allowed_channels.clone(),
        }
    }
}

/// Semantic checks between adaptation and dispatch.
///
/// Whether a handler exists for the channel is not checked here; that is a
/// configuration fault the dispatcher reports separately.
#[derive(Debug, Clone, Default)]
pub struct EventValidator {
    rules: ValidationRules,
}

impl EventValidator {
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    /// Pass the event through unchanged, or report the first rule it breaks.
    pub fn validate(&self, event: ChannelEvent) -> Result<ChannelEvent, ValidationError> {
        use ValidationCode::*;

        let channel_id = event.channel_id();
        if channel_id.trim().is_empty() {
            return Err(ValidationError::new(EmptyChannelId, "channel id is empty"));
        }
        if !gating::is_allowed(channel_id, &self.rules.allowed_channels) {
            return Err(ValidationError::new(
                ChannelNotAllowed,
                format!("channel \"{channel_id}\" is not accepted"),
            ));
        }

        let conversation_id = event.conversation_id();
        if conversation_id.trim().is_empty() {
            return Err(ValidationError::new(
                EmptyConversationId,
                "conversation id is empty",
            ));
        }
        if conversation_id.len() > self.rules.max_conversation_id_len {
            return Err(ValidationError::new(
                ConversationIdTooLong,
                format!(
                    "conversation id is {} bytes, limit is {}",
                    conversation_id.len(),
                    self.rules.max_conversation_id_len
                ),
            ));
        }
        if conversation_id.chars().any(char::is_control) {
            return Err(ValidationError::new(
                InvalidConversationId,
                "conversation id contains control characters",
            ));
        }

        let size = event.payload().len();
        if size > self.rules.max_payload_bytes {
            return Err(ValidationError::new(
                PayloadTooLarge,
                format!(
                    "payload is {size} bytes, limit is {}",
                    self.rules.max_payload_bytes
                ),
            ));
        }

        Ok(event)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, bytes::Bytes};

    fn event(channel: &str, conversation: &str, body: &'static [u8]) -> ChannelEvent {
        ChannelEvent::new(channel, conversation, Bytes::from_static(body), None)
    }

    fn code(result: Result<ChannelEvent, ValidationError>) -> ValidationCode {
        result.unwrap_err().code
    }

    #[test]
    fn accepts_and_returns_event_unchanged() {
        let e = event("web", "c1", b"{}");
        let key = e.idempotency_key().to_string();
        let out = EventValidator::default().validate(e).unwrap();
        assert_eq!(out.idempotency_key(), key);
        assert_eq!(out.conversation_id(), "c1");
    }

    #[test]
    fn rejects_empty_ids() {
        let v = EventValidator::default();
        assert_eq!(code(v.validate(event("", "c1", b"{}"))), ValidationCode::EmptyChannelId);
        assert_eq!(
            code(v.validate(event("web", "  ", b"{}"))),
            ValidationCode::EmptyConversationId
        );
    }

    #[test]
    fn allow_list_is_enforced() {
        let v = EventValidator::new(ValidationRules {
            allowed_channels: vec!["web".into(), "slack-*".into()],
            ..ValidationRules::default()
        });
        assert!(v.validate(event("slack-eng", "c", b"{}")).is_ok());
        let err = v.validate(event("sms", "c", b"{}")).unwrap_err();
        assert_eq!(err.code, ValidationCode::ChannelNotAllowed);
        assert_eq!(
            err.to_string(),
            "CHANNEL_NOT_ALLOWED: channel \"sms\" is not accepted"
        );
    }

    #[test]
    fn payload_limit() {
        let v = EventValidator::new(ValidationRules {
            max_payload_bytes: 4,
            ..ValidationRules::default()
        });
        assert!(v.validate(event("web", "c", b"{}")).is_ok());
        assert_eq!(
            code(v.validate(event("web", "c", b"{\"a\":1}"))),
            ValidationCode::PayloadTooLarge
        );
    }

    #[test]
    fn conversation_id_limits() {
        let v = EventValidator::new(ValidationRules {
            max_conversation_id_len: 3,
            ..ValidationRules::default()
        });
        assert_eq!(
            code(v.validate(event("web", "abcd", b"{}"))),
            ValidationCode::ConversationIdTooLong
        );
        assert_eq!(
            code(v.validate(event("web", "a\nb", b"{}"))),
            ValidationCode::InvalidConversationId
        );
    }

    #[test]
    fn code_serializes_as_screaming_snake() {
        let json = serde_json::to_string(&ValidationCode::PayloadTooLarge).unwrap();
        assert_eq!(json, "\"PAYLOAD_TOO_LARGE\"");
        assert_eq!(ValidationCode::PayloadTooLarge.as_str(), "PAYLOAD_TOO_LARGE");
    }
}
