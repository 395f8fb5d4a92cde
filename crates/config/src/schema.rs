/// Config schema types (server, dispatch, validation, metrics, channels).
use std::{collections::BTreeMap, time::Duration};

use {
    inlet_protocol::{
        DEDUPE_MAX_ENTRIES, DEDUPE_TTL_MS, HANDLER_TIMEOUT_MS, MAX_CONVERSATION_ID_LEN,
        MAX_PAYLOAD_BYTES,
    },
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InletConfig {
    pub server: ServerConfig,
    pub dispatch: DispatchConfig,
    pub validation: ValidationConfig,
    pub metrics: MetricsConfig,
    /// Channel registrations keyed by channel id (`web`, `cli`, ...).
    pub channels: BTreeMap<String, ChannelConfig>,
}

impl Default for InletConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            dispatch: DispatchConfig::default(),
            validation: ValidationConfig::default(),
            metrics: MetricsConfig::default(),
            channels: default_channels(),
        }
    }
}

impl InletConfig {
    /// Channels that should get a registered handler at startup.
    pub fn enabled_channels(&self) -> impl Iterator<Item = (&str, &ChannelConfig)> {
        self.channels
            .iter()
            .filter(|(_, c)| c.enabled)
            .map(|(id, c)| (id.as_str(), c))
    }
}

fn default_channels() -> BTreeMap<String, ChannelConfig> {
    BTreeMap::from([
        ("cli".to_string(), ChannelConfig::default()),
        ("web".to_string(), ChannelConfig::default()),
    ])
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 18789,
        }
    }
}

/// Dispatcher tuning: handler deadline and idempotency retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Deadline for a single handler invocation.
    pub handler_timeout_ms: u64,
    /// How long a recorded outcome answers duplicate deliveries.
    pub idempotency_ttl_ms: u64,
    /// Upper bound on retained idempotency records.
    pub idempotency_max_entries: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            handler_timeout_ms: HANDLER_TIMEOUT_MS,
            idempotency_ttl_ms: DEDUPE_TTL_MS,
            idempotency_max_entries: DEDUPE_MAX_ENTRIES,
        }
    }
}

impl DispatchConfig {
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }

    pub fn idempotency_ttl(&self) -> Duration {
        Duration::from_millis(self.idempotency_ttl_ms)
    }
}

/// Event validation limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub max_payload_bytes: usize,
    pub max_conversation_id_len: usize,
    /// Channel ids accepted at the validation stage. Empty means "all".
    pub allowed_channels: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: MAX_PAYLOAD_BYTES,
            max_conversation_id_len: MAX_CONVERSATION_ID_LEN,
            allowed_channels: Vec::new(),
        }
    }
}

/// Metrics recorder settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Labels attached to every exported metric.
    pub labels: BTreeMap<String, String>,
}

/// Built-in handler selected for a channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    /// Log the event and acknowledge it.
    #[default]
    Acknowledge,
    /// POST the event to `url`.
    Forward,
}

/// Per-channel registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub enabled: bool,
    pub handler: HandlerKind,
    /// Target for the `forward` handler.
    pub url: Option<String>,
    /// Bearer token sent by the `forward` handler.
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub token: Option<Secret<String>>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            handler: HandlerKind::Acknowledge,
            url: None,
            token: None,
        }
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
