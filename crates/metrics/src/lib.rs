//! Metrics collection and export for inlet.
//!
//! Recording goes through the `metrics` crate facade, so call sites compile
//! to no-ops until a recorder is installed. With the `prometheus` feature,
//! [`init_metrics`] installs a Prometheus recorder whose [`MetricsHandle`]
//! renders the `/metrics` endpoint.
//!
//! ```rust,ignore
//! use inlet_metrics::{counter, dispatch, labels};
//!
//! counter!(dispatch::OUTCOMES_TOTAL, labels::CHANNEL => "web", labels::RESULT => "success")
//!     .increment(1);
//! ```

mod definitions;
mod error;
mod recorder;

pub use {
    definitions::*,
    error::{Error, Result},
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
