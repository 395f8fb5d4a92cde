//! Built-in channel handlers and registry construction from config.

use std::sync::Arc;

use {
    async_trait::async_trait,
    inlet_channels::{ChannelEvent, ChannelHandler, ChannelRegistry, HandlerError},
    inlet_config::{ChannelConfig, HandlerKind, InletConfig},
    inlet_protocol::headers,
    reqwest::{StatusCode, Url},
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, info},
};

// ── Acknowledge ──────────────────────────────────────────────────────────────

/// Accepts every event and echoes its identity back.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcknowledgeHandler;

#[async_trait]
impl ChannelHandler for AcknowledgeHandler {
    async fn handle(&self, event: Arc<ChannelEvent>) -> Result<serde_json::Value, HandlerError> {
        debug!(
            channel = event.channel_id(),
            conversation = event.conversation_id(),
            bytes = event.payload().len(),
            "event acknowledged"
        );
        Ok(serde_json::json!({
            "accepted": true,
            "conversationId": event.conversation_id(),
            "idempotencyKey": event.idempotency_key(),
        }))
    }
}

// ── Forward ──────────────────────────────────────────────────────────────────

/// POSTs the event envelope to a downstream URL.
///
/// Connection failures, 5xx and 429 responses are reported as retryable so
/// a redelivery gets another attempt; any other non-2xx status is final.
pub struct ForwardHandler {
    client: reqwest::Client,
    url: Url,
    token: Option<Secret<String>>,
}

impl ForwardHandler {
    pub fn new(client: reqwest::Client, url: Url, token: Option<Secret<String>>) -> Self {
        Self { client, url, token }
    }
}

#[async_trait]
impl ChannelHandler for ForwardHandler {
    async fn handle(&self, event: Arc<ChannelEvent>) -> Result<serde_json::Value, HandlerError> {
        let mut request = self
            .client
            .post(self.url.clone())
            .header(headers::IDEMPOTENCY_KEY, event.idempotency_key())
            .json(&event.to_envelope());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let retryable = e.is_connect() || e.is_timeout();
                return Err(HandlerError::external("forward request failed", e, retryable));
            },
        };

        let status = response.status();
        if !status.is_success() {
            let retryable = status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;
            return Err(HandlerError::Failed {
                message: format!("forward target {} returned {status}", self.url),
                retryable,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| HandlerError::external("reading forward response", e, false))?;
        let response = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&body).into_owned())
            })
        };

        Ok(serde_json::json!({
            "forwarded": true,
            "status": status.as_u16(),
            "response": response,
        }))
    }
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// Register a handler for every enabled channel in `config`.
pub fn build_registry(config: &InletConfig) -> anyhow::Result<ChannelRegistry> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("inlet/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let mut registry = ChannelRegistry::new();
    for (channel_id, channel) in config.enabled_channels() {
        let handler = build_handler(channel_id, channel, &client)?;
        info!(channel = channel_id, handler = ?channel.handler, "channel registered");
        registry.register(channel_id, handler);
    }
    Ok(registry)
}

fn build_handler(
    channel_id: &str,
    channel: &ChannelConfig,
    client: &reqwest::Client,
) -> anyhow::Result<Arc<dyn ChannelHandler>> {
    Ok(match channel.handler {
        HandlerKind::Acknowledge => Arc::new(AcknowledgeHandler),
        HandlerKind::Forward => {
            let Some(url) = channel.url.as_deref() else {
                anyhow::bail!("channel \"{channel_id}\" uses the forward handler but has no url");
            };
            let url = Url::parse(url)
                .map_err(|e| anyhow::anyhow!("channel \"{channel_id}\" has an invalid url: {e}"))?;
            Arc::new(ForwardHandler::new(
                client.clone(),
                url,
                channel.token.clone(),
            ))
        },
    })
}
