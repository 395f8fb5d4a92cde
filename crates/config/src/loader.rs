use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Context, Error, Result},
    schema::InletConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["inlet.toml", "inlet.yaml", "inlet.yml", "inlet.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<InletConfig> {
    let raw = read_substituted(path)?;
    let invalid = || format!("invalid config {}", path.display());
    match extension(path) {
        "toml" => toml::from_str(&raw).with_context(invalid),
        "yaml" | "yml" => serde_yaml::from_str(&raw).with_context(invalid),
        "json" => serde_json::from_str(&raw).with_context(invalid),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}

/// Load the config file as an untyped JSON value (after env substitution).
///
/// Used by validation to inspect keys the typed schema would silently drop.
pub fn load_config_value(path: &Path) -> Result<serde_json::Value> {
    let raw = read_substituted(path)?;
    match extension(path) {
        "toml" => {
            let v: toml::Value = toml::from_str(&raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value = serde_yaml::from_str(&raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "json" => Ok(serde_json::from_str(&raw)?),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}

/// Discover and load config from standard locations, or `explicit` if given.
///
/// Search order:
/// 1. `./inlet.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/inlet/inlet.{toml,yaml,yml,json}` (user-global)
///
/// A missing file yields `InletConfig::default()`. An explicit path that
/// fails to load is an error; a discovered one only logs a warning.
pub fn discover_and_load(explicit: Option<&Path>) -> Result<InletConfig> {
    let config = if let Some(path) = explicit {
        debug!(path = %path.display(), "loading config");
        load_config(path)?
    } else if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                InletConfig::default()
            },
        }
    } else {
        debug!("no config file found, using defaults");
        InletConfig::default()
    };
    Ok(apply_env_overrides(config))
}

/// Apply `INLET_BIND` / `INLET_PORT` on top of the file values.
pub fn apply_env_overrides(config: InletConfig) -> InletConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    mut config: InletConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> InletConfig {
    if let Some(bind) = lookup("INLET_BIND").filter(|b| !b.is_empty()) {
        config.server.bind = bind;
    }
    if let Some(port) = lookup("INLET_PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(e) => warn!(value = %port, error = %e, "ignoring invalid INLET_PORT"),
        }
    }
    config
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/inlet/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "inlet").map(|d| d.config_dir().to_path_buf())
}

fn read_substituted(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(substitute_env(&raw))
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("toml")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(name: &str, body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_toml() {
        let (_dir, path) = write_config("inlet.toml", "[server]\nport = 9100\n");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.port, 9100);
    }

    #[test]
    fn loads_yaml() {
        let (_dir, path) = write_config(
            "inlet.yaml",
            "dispatch:\n  handler_timeout_ms: 250\nvalidation:\n  allowed_channels: [web]\n",
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.dispatch.handler_timeout_ms, 250);
        assert_eq!(cfg.validation.allowed_channels, vec!["web".to_string()]);
    }

    #[test]
    fn loads_json_value() {
        let (_dir, path) = write_config("inlet.json", r#"{"server": {"bind": "0.0.0.0"}}"#);
        let value = load_config_value(&path).unwrap();
        assert_eq!(value["server"]["bind"], "0.0.0.0");
    }

    #[test]
    fn rejects_unknown_extension() {
        let (_dir, path) = write_config("inlet.ini", "port=1");
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }

    #[test]
    fn syntax_error_names_the_file() {
        let (_dir, path) = write_config("inlet.toml", "[server\nport = 1\n");
        let err = load_config(&path).unwrap_err().to_string();
        assert!(err.starts_with("invalid config "), "{err}");
        assert!(err.contains("inlet.toml"), "{err}");
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = discover_and_load(Some(Path::new("/nonexistent/inlet.toml"))).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn env_overrides_bind_and_port() {
        let cfg = apply_env_overrides_with(InletConfig::default(), |name| match name {
            "INLET_BIND" => Some("0.0.0.0".into()),
            "INLET_PORT" => Some("8088".into()),
            _ => None,
        });
        assert_eq!(cfg.server.bind, "0.0.0.0");
        assert_eq!(cfg.server.port, 8088);
    }

    #[test]
    fn invalid_port_override_is_ignored() {
        let cfg = apply_env_overrides_with(InletConfig::default(), |name| {
            (name == "INLET_PORT").then(|| "eighty".to_string())
        });
        assert_eq!(cfg.server.port, 18789);
    }
}
