use std::{sync::Arc, time::Instant};

#[cfg(feature = "metrics")]
use inlet_metrics::MetricsHandle;

use crate::pipeline::Pipeline;

/// Shared gateway runtime state.
pub struct GatewayState {
    pub pipeline: Pipeline,
    /// Server version string.
    pub version: String,
    pub started_at: Instant,
    /// Prometheus render handle; `None` when metrics are disabled.
    #[cfg(feature = "metrics")]
    pub metrics_handle: Option<MetricsHandle>,
}

impl GatewayState {
    pub fn new(pipeline: Pipeline) -> Arc<Self> {
        Arc::new(Self {
            pipeline,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
            #[cfg(feature = "metrics")]
            metrics_handle: None,
        })
    }

    #[cfg(feature = "metrics")]
    pub fn with_metrics(pipeline: Pipeline, metrics_handle: Option<MetricsHandle>) -> Arc<Self> {
        Arc::new(Self {
            pipeline,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
            metrics_handle,
        })
    }
}
