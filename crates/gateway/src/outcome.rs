//! Terminal result of processing one event.

use {
    inlet_channels::{ValidationCode, ValidationError},
    inlet_protocol::error_codes,
};

/// Caller-facing message for handler failures. Handler error details are
/// logged, never returned.
pub const HANDLER_FAILURE_MESSAGE: &str = "event processing failed";
pub const TIMEOUT_MESSAGE: &str = "event processing timed out";

/// Why an event did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MalformedInput,
    Validation(ValidationCode),
    UnknownChannel,
    HandlerFailure,
    Timeout,
}

impl FailureKind {
    /// Stable machine-readable code sent to callers.
    pub fn code(self) -> &'static str {
        match self {
            Self::MalformedInput => error_codes::MALFORMED_INPUT,
            Self::Validation(code) => code.as_str(),
            Self::UnknownChannel => error_codes::UNKNOWN_CHANNEL,
            Self::HandlerFailure => error_codes::HANDLER_FAILURE,
            Self::Timeout => error_codes::TIMEOUT,
        }
    }

    /// Rejections caused by the caller's input rather than the gateway.
    pub fn is_client_error(self) -> bool {
        matches!(self, Self::MalformedInput | Self::Validation(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    /// Safe to show to the caller.
    pub message: String,
    /// Whether a later retry of the same event may succeed. Retryable
    /// failures are not remembered by the idempotency store.
    pub retryable: bool,
}

impl Failure {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::MalformedInput,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn validation(err: &ValidationError) -> Self {
        Self {
            kind: FailureKind::Validation(err.code),
            message: err.reason.clone(),
            retryable: false,
        }
    }

    pub fn unknown_channel(channel_id: &str) -> Self {
        Self {
            kind: FailureKind::UnknownChannel,
            message: format!("no handler registered for channel \"{channel_id}\""),
            retryable: false,
        }
    }

    pub fn handler_failure(retryable: bool) -> Self {
        Self {
            kind: FailureKind::HandlerFailure,
            message: HANDLER_FAILURE_MESSAGE.into(),
            retryable,
        }
    }

    pub fn timeout() -> Self {
        Self {
            kind: FailureKind::Timeout,
            message: TIMEOUT_MESSAGE.into(),
            retryable: false,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message)
    }
}

impl From<inlet_channels::Error> for Failure {
    fn from(err: inlet_channels::Error) -> Self {
        match err {
            inlet_channels::Error::MalformedInput { message } => Self::malformed(message),
            inlet_channels::Error::Validation(err) => Self::validation(&err),
        }
    }
}

/// Exactly one of these is produced per event.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(serde_json::Value),
    Failure(Failure),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn as_failure(&self) -> Option<&Failure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }

    /// Retryable failures are not remembered, so a retry is processed fresh.
    pub fn is_retryable(&self) -> bool {
        self.as_failure().is_some_and(|f| f.retryable)
    }

    /// Short label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Failure(failure) => failure.code(),
        }
    }
}

impl From<Failure> for Outcome {
    fn from(failure: Failure) -> Self {
        Self::Failure(failure)
    }
}
