//! Configuration loading, env substitution, and validation.
//!
//! Config files: `inlet.toml`, `inlet.yaml`, `inlet.yml` or `inlet.json`,
//! searched in `./` then the user config directory (`~/.config/inlet/`).
//!
//! String values support `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, find_config_file, load_config},
    schema::{
        ChannelConfig, DispatchConfig, HandlerKind, InletConfig, MetricsConfig, ServerConfig,
        ValidationConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, check_config},
};
