use std::{collections::HashMap, sync::Arc};

use crate::handler::ChannelHandler;

#[cfg(feature = "metrics")]
use inlet_metrics::{gauge, intake};

/// Channel id → handler registrations.
///
/// Populated at startup, then shared read-only (behind an `Arc`) with the
/// dispatcher; there is no process-wide instance.
#[derive(Default)]
pub struct ChannelRegistry {
    handlers: HashMap<String, Arc<dyn ChannelHandler>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for `channel_id`.
    pub fn register(&mut self, channel_id: impl Into<String>, handler: Arc<dyn ChannelHandler>) {
        self.handlers.insert(channel_id.into(), handler);
        #[cfg(feature = "metrics")]
        gauge!(intake::CHANNELS_REGISTERED).set(self.handlers.len() as f64);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, channel_id: impl Into<String>, handler: Arc<dyn ChannelHandler>) -> Self {
        self.register(channel_id, handler);
        self
    }

    pub fn get(&self, channel_id: &str) -> Option<Arc<dyn ChannelHandler>> {
        self.handlers.get(channel_id).cloned()
    }

    pub fn contains(&self, channel_id: &str) -> bool {
        self.handlers.contains_key(channel_id)
    }

    /// Registered channel ids, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
