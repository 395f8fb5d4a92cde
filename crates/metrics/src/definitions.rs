//! Metric name and label definitions.
//!
//! Every metric recorded by inlet is named here so dashboards and the code
//! agree on spelling.

/// HTTP boundary metrics
pub mod http {
    /// Total number of event submissions received over HTTP
    pub const EVENTS_RECEIVED_TOTAL: &str = "inlet_http_events_received_total";
    /// Responses by status class
    pub const RESPONSES_TOTAL: &str = "inlet_http_responses_total";
}

/// Adapter and validator metrics
pub mod intake {
    /// Events rejected before dispatch (malformed or invalid)
    pub const REJECTED_TOTAL: &str = "inlet_events_rejected_total";
    /// Channels with a registered handler
    pub const CHANNELS_REGISTERED: &str = "inlet_channels_registered";
}

/// Dispatcher metrics
pub mod dispatch {
    /// Terminal outcomes produced by the dispatcher
    pub const OUTCOMES_TOTAL: &str = "inlet_dispatch_outcomes_total";
    /// Duplicate deliveries answered from the idempotency store
    pub const REPLAYS_TOTAL: &str = "inlet_dispatch_replays_total";
    /// Handler invocation duration in seconds
    pub const HANDLER_DURATION_SECONDS: &str = "inlet_handler_duration_seconds";
    /// Conversations with queued or running events
    pub const CONVERSATIONS_ACTIVE: &str = "inlet_conversations_active";
    /// Retained idempotency records
    pub const IDEMPOTENCY_RECORDS: &str = "inlet_idempotency_records";
}

/// Common label keys
pub mod labels {
    pub const CHANNEL: &str = "channel";
    pub const RESULT: &str = "result";
    pub const CODE: &str = "code";
    pub const STATUS: &str = "status";
}

/// Histogram bucket boundaries
pub mod buckets {
    use once_cell::sync::Lazy;

    /// Handler duration buckets (in seconds)
    /// Covers 1ms to 2 minutes
    pub static HANDLER_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
            120.0,
        ]
    });
}
