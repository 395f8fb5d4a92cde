//! Channel intake: turning transport payloads into validated events.
//!
//! Each transport (the web webhook, the CLI, anything added later) has a
//! [`ChannelAdapter`] that produces a [`ChannelEvent`]. The
//! [`EventValidator`] then applies configurable rules before the event is
//! handed to whatever [`ChannelHandler`] the [`ChannelRegistry`] holds for
//! its channel id.

pub mod adapter;
pub mod cli;
pub mod error;
pub mod event;
pub mod gating;
pub mod handler;
pub mod registry;
pub mod validate;
pub mod web;

pub use {
    adapter::ChannelAdapter,
    cli::{CliAdapter, CliInbound},
    error::{Error, Result},
    event::{ChannelEvent, derive_idempotency_key},
    handler::{ChannelHandler, HandlerError},
    registry::ChannelRegistry,
    validate::{EventValidator, ValidationCode, ValidationError, ValidationRules},
    web::{WebAdapter, WebInbound},
};
