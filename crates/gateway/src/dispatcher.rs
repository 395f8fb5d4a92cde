use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use {
    futures::{FutureExt, future::BoxFuture},
    inlet_channels::{ChannelEvent, ChannelHandler, ChannelRegistry},
    tokio::time::Instant,
    tracing::{debug, error, info, warn},
};

#[cfg(feature = "metrics")]
use inlet_metrics::{counter, dispatch as dispatch_metrics, gauge, histogram, labels};

use crate::{
    conversation::{ConversationLocks, ConversationTicket},
    idempotency::{Claim, IdempotencyStore, SharedOutcome},
    outcome::{Failure, Outcome},
};

/// Tunables for [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct DispatcherOptions {
    pub handler_timeout: Duration,
    pub idempotency_ttl: Duration,
    pub idempotency_max_entries: usize,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            handler_timeout: Duration::from_millis(inlet_protocol::HANDLER_TIMEOUT_MS),
            idempotency_ttl: Duration::from_millis(inlet_protocol::DEDUPE_TTL_MS),
            idempotency_max_entries: inlet_protocol::DEDUPE_MAX_ENTRIES,
        }
    }
}

impl From<&inlet_config::DispatchConfig> for DispatcherOptions {
    fn from(config: &inlet_config::DispatchConfig) -> Self {
        Self {
            handler_timeout: config.handler_timeout(),
            idempotency_ttl: config.idempotency_ttl(),
            idempotency_max_entries: config.idempotency_max_entries,
        }
    }
}

/// What a caller learns about one delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub outcome: Outcome,
    /// The outcome came from an earlier or concurrent delivery of the same
    /// idempotency key; the handler was not invoked for this one.
    pub replayed: bool,
}

impl DispatchReport {
    pub fn fresh(outcome: Outcome) -> Self {
        Self {
            outcome,
            replayed: false,
        }
    }
}

/// Routes validated events to their channel handler.
///
/// Guarantees:
/// - at most one handler invocation per idempotency key within the retention
///   window, with concurrent duplicates sharing that invocation's outcome;
/// - events of one conversation are handled one at a time in the order
///   [`Dispatcher::submit`] was called;
/// - a handler that hangs is cut off after the configured deadline, so its
///   conversation is always released.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    registry: Arc<ChannelRegistry>,
    conversations: ConversationLocks,
    idempotency: IdempotencyStore,
    options: DispatcherOptions,
}

impl Dispatcher {
    pub fn new(registry: Arc<ChannelRegistry>, options: DispatcherOptions) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                registry,
                conversations: ConversationLocks::new(),
                idempotency: IdempotencyStore::new(
                    options.idempotency_ttl,
                    options.idempotency_max_entries,
                ),
                options,
            }),
        }
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.inner.registry
    }

    pub fn options(&self) -> &DispatcherOptions {
        &self.inner.options
    }

    /// Conversations with queued or running events.
    pub fn active_conversations(&self) -> usize {
        self.inner.conversations.active()
    }

    /// Idempotency records currently held, in flight or completed.
    pub fn idempotency_records(&self) -> usize {
        self.inner.idempotency.len()
    }

    /// Process `event` and wait for its outcome.
    pub async fn dispatch(&self, event: ChannelEvent) -> DispatchReport {
        self.submit(event).await
    }

    /// Claim the event's idempotency key and its place in the conversation
    /// before returning, then resolve to the outcome.
    ///
    /// The handler runs on its own task: dropping the returned future stops
    /// waiting but never cancels the invocation.
    pub fn submit(&self, event: ChannelEvent) -> BoxFuture<'static, DispatchReport> {
        let claim = match self.inner.registry.get(event.channel_id()) {
            Some(handler) => {
                let event = Arc::new(event);
                let key = record_key(&event);
                let claim = self
                    .inner
                    .idempotency
                    .claim(&key, || self.start(handler, event, key.clone()));
                Ok(claim)
            },
            None => {
                warn!(
                    channel = event.channel_id(),
                    "no handler registered for channel"
                );
                Err(Failure::unknown_channel(event.channel_id()))
            },
        };

        #[cfg(feature = "metrics")]
        gauge!(dispatch_metrics::IDEMPOTENCY_RECORDS).set(self.inner.idempotency.len() as f64);

        async move {
            match claim {
                Err(failure) => DispatchReport::fresh(failure.into()),
                Ok(Claim::Started(shared)) => DispatchReport::fresh(shared.await),
                Ok(Claim::Join(shared)) => {
                    debug!("joining in-flight delivery of the same event");
                    #[cfg(feature = "metrics")]
                    counter!(dispatch_metrics::REPLAYS_TOTAL, labels::RESULT => "joined")
                        .increment(1);
                    DispatchReport {
                        outcome: shared.await,
                        replayed: true,
                    }
                },
                Ok(Claim::Replay(outcome)) => {
                    debug!("replaying recorded outcome");
                    #[cfg(feature = "metrics")]
                    counter!(dispatch_metrics::REPLAYS_TOTAL, labels::RESULT => "replayed")
                        .increment(1);
                    DispatchReport {
                        outcome,
                        replayed: true,
                    }
                },
            }
        }
        .boxed()
    }

    /// Called with the idempotency key locked. Takes the conversation
    /// ticket synchronously so receipt order is fixed here.
    fn start(
        &self,
        handler: Arc<dyn ChannelHandler>,
        event: Arc<ChannelEvent>,
        key: String,
    ) -> SharedOutcome {
        let ticket = self.inner.conversations.enqueue(event.conversation_id());
        #[cfg(feature = "metrics")]
        gauge!(dispatch_metrics::CONVERSATIONS_ACTIVE)
            .set(self.inner.conversations.active() as f64);

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.process(handler, event, key, ticket).await });

        async move {
            task.await.unwrap_or_else(|e| {
                error!(error = %e, "dispatch task did not complete");
                Outcome::from(Failure::handler_failure(false))
            })
        }
        .boxed()
        .shared()
    }
}

/// Idempotency keys are only unique within a channel.
fn record_key(event: &ChannelEvent) -> String {
    format!("{}\u{0}{}", event.channel_id(), event.idempotency_key())
}

impl DispatcherInner {
    async fn process(
        &self,
        handler: Arc<dyn ChannelHandler>,
        event: Arc<ChannelEvent>,
        key: String,
        ticket: ConversationTicket,
    ) -> Outcome {
        let guard = ticket.acquire().await;
        let started = Instant::now();

        let invocation = AssertUnwindSafe(handler.handle(Arc::clone(&event))).catch_unwind();
        let result = tokio::time::timeout(self.options.handler_timeout, invocation).await;
        let elapsed = started.elapsed();
        drop(guard);

        let outcome = match result {
            Ok(Ok(Ok(value))) => Outcome::Success(value),
            Ok(Ok(Err(err))) => {
                warn!(
                    channel = event.channel_id(),
                    conversation = event.conversation_id(),
                    retryable = err.is_retryable(),
                    error = %err,
                    "handler failed"
                );
                Failure::handler_failure(err.is_retryable()).into()
            },
            Ok(Err(_panic)) => {
                error!(
                    channel = event.channel_id(),
                    conversation = event.conversation_id(),
                    "handler panicked"
                );
                Failure::handler_failure(false).into()
            },
            Err(_elapsed) => {
                warn!(
                    channel = event.channel_id(),
                    conversation = event.conversation_id(),
                    timeout_ms = self.options.handler_timeout.as_millis() as u64,
                    "handler timed out"
                );
                Failure::timeout().into()
            },
        };

        self.idempotency.complete(&key, &outcome);

        info!(
            channel = event.channel_id(),
            conversation = event.conversation_id(),
            outcome = outcome.label(),
            elapsed_ms = elapsed.as_millis() as u64,
            "event processed"
        );

        #[cfg(feature = "metrics")]
        {
            let channel = event.channel_id().to_owned();
            counter!(
                dispatch_metrics::OUTCOMES_TOTAL,
                labels::CHANNEL => channel.clone(),
                labels::RESULT => outcome.label()
            )
            .increment(1);
            histogram!(dispatch_metrics::HANDLER_DURATION_SECONDS, labels::CHANNEL => channel)
                .record(elapsed.as_secs_f64());
            gauge!(dispatch_metrics::CONVERSATIONS_ACTIVE).set(self.conversations.active() as f64);
        }

        outcome
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        bytes::Bytes,
        inlet_channels::HandlerError,
        std::sync::atomic::{AtomicUsize, Ordering},
    };

    struct Counting(AtomicUsize);

    #[async_trait]
    impl ChannelHandler for Counting {
        async fn handle(&self, _event: Arc<ChannelEvent>) -> Result<serde_json::Value, HandlerError> {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(serde_json::json!({ "calls": n }))
        }
    }

    fn dispatcher(handler: Arc<dyn ChannelHandler>) -> Dispatcher {
        let registry = ChannelRegistry::new().with("web", handler);
        Dispatcher::new(Arc::new(registry), DispatcherOptions::default())
    }

    fn event(channel: &str, key: &str) -> ChannelEvent {
        ChannelEvent::new(channel, "c1", Bytes::from_static(b"{}"), Some(key.into()))
    }

    #[tokio::test]
    async fn unknown_channel_is_not_recorded() {
        let d = dispatcher(Arc::new(Counting(AtomicUsize::new(0))));
        let report = d.dispatch(event("sms", "k")).await;
        assert_eq!(
            report.outcome.as_failure().unwrap().kind,
            crate::outcome::FailureKind::UnknownChannel
        );
        assert!(!report.replayed);
        assert_eq!(d.idempotency_records(), 0);
        assert_eq!(d.active_conversations(), 0);
    }

    #[tokio::test]
    async fn duplicate_replays_without_invoking_handler() {
        let handler = Arc::new(Counting(AtomicUsize::new(0)));
        let d = dispatcher(handler.clone());

        let first = d.dispatch(event("web", "k")).await;
        let second = d.dispatch(event("web", "k")).await;

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.outcome, second.outcome);
        assert_eq!(handler.0.load(Ordering::SeqCst), 1);
        assert_eq!(d.active_conversations(), 0);
    }

    #[tokio::test]
    async fn same_key_on_different_channels_is_not_a_duplicate() {
        let handler = Arc::new(Counting(AtomicUsize::new(0)));
        let registry = ChannelRegistry::new()
            .with("web", handler.clone())
            .with("cli", handler.clone());
        let d = Dispatcher::new(Arc::new(registry), DispatcherOptions::default());

        assert!(!d.dispatch(event("web", "k")).await.replayed);
        assert!(!d.dispatch(event("cli", "k")).await.replayed);
        assert_eq!(handler.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn options_from_config() {
        let config = inlet_config::DispatchConfig {
            handler_timeout_ms: 1_500,
            idempotency_ttl_ms: 60_000,
            idempotency_max_entries: 7,
        };
        let options = DispatcherOptions::from(&config);
        assert_eq!(options.handler_timeout, Duration::from_millis(1_500));
        assert_eq!(options.idempotency_ttl, Duration::from_secs(60));
        assert_eq!(options.idempotency_max_entries, 7);
    }
}
