//! Shared error plumbing used across the inlet crates.

pub mod error;

pub use error::FromMessage;
