use std::sync::Arc;

use {
    futures::{FutureExt, future::BoxFuture},
    inlet_channels::{ChannelAdapter, ChannelEvent, EventValidator, ValidationRules},
    inlet_config::InletConfig,
    tracing::debug,
};

#[cfg(feature = "metrics")]
use inlet_metrics::{counter, intake, labels};

use crate::{
    dispatcher::{DispatchReport, Dispatcher, DispatcherOptions},
    handlers::build_registry,
    outcome::Failure,
};

/// Adapter → validator → dispatcher, shared by every transport.
#[derive(Clone)]
pub struct Pipeline {
    validator: Arc<EventValidator>,
    dispatcher: Dispatcher,
}

impl Pipeline {
    pub fn new(validator: EventValidator, dispatcher: Dispatcher) -> Self {
        Self {
            validator: Arc::new(validator),
            dispatcher,
        }
    }

    /// Wire up handlers, limits and dispatch settings from `config`.
    pub fn from_config(config: &InletConfig) -> anyhow::Result<Self> {
        let registry = build_registry(config)?;
        Ok(Self::new(
            EventValidator::new(ValidationRules::from(&config.validation)),
            Dispatcher::new(Arc::new(registry), DispatcherOptions::from(&config.dispatch)),
        ))
    }

    pub fn validator(&self) -> &EventValidator {
        &self.validator
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Turn a raw inbound message into a validated event.
    pub fn intake<A: ChannelAdapter>(
        &self,
        adapter: &A,
        inbound: A::Inbound,
    ) -> Result<ChannelEvent, Failure> {
        let event = adapter.adapt(inbound).map_err(Failure::from);
        let event = event.and_then(|event| {
            self.validator
                .validate(event)
                .map_err(|err| Failure::validation(&err))
        });
        if let Err(failure) = &event {
            debug!(code = failure.code(), reason = %failure.message, "event rejected");
            #[cfg(feature = "metrics")]
            counter!(intake::REJECTED_TOTAL, labels::CODE => failure.code()).increment(1);
        }
        event
    }

    /// Run `inbound` through the whole pipeline.
    ///
    /// Intake happens before this returns, so a caller that submits events
    /// one after another fixes their processing order even if it awaits
    /// the results out of order.
    pub fn submit<A: ChannelAdapter>(
        &self,
        adapter: &A,
        inbound: A::Inbound,
    ) -> BoxFuture<'static, DispatchReport> {
        let submitted = self
            .intake(adapter, inbound)
            .map(|event| self.dispatcher.submit(event));
        async move {
            match submitted {
                Ok(dispatch) => dispatch.await,
                Err(failure) => DispatchReport::fresh(failure.into()),
            }
        }
        .boxed()
    }

    pub async fn process<A: ChannelAdapter>(
        &self,
        adapter: &A,
        inbound: A::Inbound,
    ) -> DispatchReport {
        self.submit(adapter, inbound).await
    }
}
