//! Shared fixtures for gateway integration tests.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    async_trait::async_trait,
    bytes::Bytes,
    inlet_channels::{ChannelEvent, ChannelHandler, HandlerError},
};

/// Handler driven by the event body:
///
/// - `label`: name recorded in the start/end log
/// - `sleepMs`: delay before finishing
/// - `hang`: never finish
/// - `fail`: `"fatal"` or `"retryable"`, optionally only on the first call
///   for a key when `failOnce` is set
/// - `panic`: panic inside the handler
#[derive(Default)]
pub struct ScriptedHandler {
    log: Mutex<Vec<String>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Handler invocations for an idempotency key.
    pub fn calls(&self, key: &str) -> usize {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl ChannelHandler for ScriptedHandler {
    async fn handle(&self, event: Arc<ChannelEvent>) -> Result<serde_json::Value, HandlerError> {
        let body = event.json().unwrap_or_default();
        let label = body["label"].as_str().unwrap_or("event").to_string();
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(event.idempotency_key().to_string()).or_default();
            *n += 1;
            *n
        };
        self.log.lock().unwrap().push(format!("start:{label}"));

        if body["hang"].as_bool().unwrap_or(false) {
            std::future::pending::<()>().await;
        }
        if let Some(ms) = body["sleepMs"].as_u64() {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if body["panic"].as_bool().unwrap_or(false) {
            panic!("scripted panic for {label}");
        }

        self.log.lock().unwrap().push(format!("end:{label}"));

        let fail_now = !body["failOnce"].as_bool().unwrap_or(false) || call == 1;
        match body["fail"].as_str() {
            Some("fatal") if fail_now => Err(HandlerError::fatal(format!(
                "internal detail: database row {label} locked"
            ))),
            Some("retryable") if fail_now => Err(HandlerError::retryable(format!(
                "internal detail: upstream for {label} unavailable"
            ))),
            _ => Ok(serde_json::json!({ "label": label, "call": call })),
        }
    }
}

pub fn event(conversation: &str, key: &str, body: serde_json::Value) -> ChannelEvent {
    ChannelEvent::new(
        "web",
        conversation,
        Bytes::from(serde_json::to_vec(&body).unwrap()),
        Some(key.to_string()),
    )
}
