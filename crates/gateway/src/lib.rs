//! Event ingestion gateway: HTTP intake, dispatch, and outcome reporting.
//!
//! Every transport feeds the same [`Pipeline`]: a channel adapter builds a
//! [`inlet_channels::ChannelEvent`], the validator checks it, and the
//! [`Dispatcher`] runs the channel's handler with per-conversation ordering
//! and idempotent replay. The [`report`] module turns the resulting
//! [`Outcome`] into an HTTP response or a CLI exit status.

pub mod conversation;
pub mod dispatcher;
pub mod handlers;
pub mod idempotency;
#[cfg(feature = "metrics")]
pub mod metrics_middleware;
#[cfg(feature = "prometheus")]
pub mod metrics_routes;
pub mod outcome;
pub mod pipeline;
pub mod report;
pub mod server;
pub mod state;

pub use {
    dispatcher::{DispatchReport, Dispatcher, DispatcherOptions},
    handlers::{AcknowledgeHandler, ForwardHandler, build_registry},
    outcome::{Failure, FailureKind, Outcome},
    pipeline::Pipeline,
    server::{AppState, build_gateway_app, build_gateway_state, start_gateway},
    state::GatewayState,
};
