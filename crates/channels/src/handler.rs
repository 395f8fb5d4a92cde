use std::{error::Error as StdError, sync::Arc};

use async_trait::async_trait;

use crate::event::ChannelEvent;

/// Downstream processing for one channel's events.
///
/// What a handler does with an event is outside the gateway's concern; it
/// only needs a result value or a [`HandlerError`].
#[async_trait]
pub trait ChannelHandler: Send + Sync {
    async fn handle(&self, event: Arc<ChannelEvent>) -> Result<serde_json::Value, HandlerError>;
}

/// A handler failure. The message is for logs only and never reaches the
/// caller verbatim.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("{message}")]
    Failed { message: String, retryable: bool },

    #[error("{context}: {source}")]
    External {
        context: String,
        retryable: bool,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl HandlerError {
    /// A failure that must not be retried automatically; the outcome is
    /// recorded against the idempotency key.
    #[must_use]
    pub fn fatal(message: impl std::fmt::Display) -> Self {
        Self::Failed {
            message: message.to_string(),
            retryable: false,
        }
    }

    /// A failure that left no side effects; a redelivery may run the
    /// handler again.
    #[must_use]
    pub fn retryable(message: impl std::fmt::Display) -> Self {
        Self::Failed {
            message: message.to_string(),
            retryable: true,
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
        retryable: bool,
    ) -> Self {
        Self::External {
            context: context.into(),
            retryable,
            source: Box::new(source),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Failed { retryable, .. } | Self::External { retryable, .. } => *retryable,
        }
    }
}
