//! Wire-level definitions shared by the gateway, the channel adapters and
//! the CLI.
//!
//! The HTTP boundary answers every event submission with a
//! [`ResponseEnvelope`]: `{"success": true}` on success, or
//! `{"success": false, "error": "...", "code": "..."}` on failure.

use serde::{Deserialize, Serialize};

// ── Constants ────────────────────────────────────────────────────────────────

pub const MAX_PAYLOAD_BYTES: usize = 524_288; // 512 KB
pub const MAX_CONVERSATION_ID_LEN: usize = 256;
pub const HANDLER_TIMEOUT_MS: u64 = 30_000; // 30s
pub const DEDUPE_TTL_MS: u64 = 300_000; // 5 min
pub const DEDUPE_MAX_ENTRIES: usize = 1_000;

/// Channel id used by the bare `/api/webhook` route.
pub const WEB_CHANNEL: &str = "web";
/// Channel id used by `inlet send`.
pub const CLI_CHANNEL: &str = "cli";

/// Whether `channel_id` matches an allow-list entry.
///
/// Entries match exactly, or as `*`-wildcard patterns where `*` stands for
/// any run of characters, including none (`slack-*`, `*-webhook`).
pub fn channel_pattern_matches(pattern: &str, channel_id: &str) -> bool {
    let mut segments = pattern.split('*');
    let Some(first) = segments.next() else {
        return channel_id.is_empty();
    };
    let Some(mut rest) = channel_id.strip_prefix(first) else {
        return false;
    };

    let middle: Vec<&str> = segments.collect();
    let Some((last, inner)) = middle.split_last() else {
        // No '*' at all.
        return rest.is_empty();
    };

    for part in inner.iter().filter(|p| !p.is_empty()) {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

// ── Headers ──────────────────────────────────────────────────────────────────

pub mod headers {
    pub const IDEMPOTENCY_KEY: &str = "idempotency-key";
    pub const CONVERSATION_ID: &str = "x-conversation-id";
    /// Set on responses whose outcome was replayed from the idempotency store.
    pub const IDEMPOTENT_REPLAY: &str = "idempotent-replay";
}

// ── Error codes ──────────────────────────────────────────────────────────────

pub mod error_codes {
    pub const MALFORMED_INPUT: &str = "MALFORMED_INPUT";
    pub const UNKNOWN_CHANNEL: &str = "UNKNOWN_CHANNEL";
    pub const HANDLER_FAILURE: &str = "HANDLER_FAILURE";
    pub const TIMEOUT: &str = "TIMEOUT";
}

// ── Envelope ─────────────────────────────────────────────────────────────────

/// JSON body returned by the event endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ResponseEnvelope {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            code: None,
        }
    }

    pub fn err(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            code: Some(code.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_has_no_error_fields() {
        let json = serde_json::to_value(ResponseEnvelope::ok()).unwrap_or_default();
        assert_eq!(json, serde_json::json!({ "success": true }));
    }

    #[test]
    fn channel_patterns() {
        assert!(channel_pattern_matches("web", "web"));
        assert!(!channel_pattern_matches("web", "webhook"));
        assert!(channel_pattern_matches("w*", "web"));
        assert!(channel_pattern_matches("*", ""));
        assert!(!channel_pattern_matches("team_*_prod", "team_a_dev"));
    }

    #[test]
    fn failure_envelope_carries_code() {
        let json = serde_json::to_value(ResponseEnvelope::err(error_codes::TIMEOUT, "timed out"))
            .unwrap_or_default();
        assert_eq!(
            json,
            serde_json::json!({ "success": false, "error": "timed out", "code": "TIMEOUT" })
        );
    }
}
