//! Configuration validation.
//!
//! Reports unknown (likely misspelled) keys, type errors, and semantic
//! problems such as a `forward` channel without a target URL.

use std::path::{Path, PathBuf};

use inlet_protocol::channel_pattern_matches;

use crate::{
    loader,
    schema::{HandlerKind, InletConfig},
};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "value", "security", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "channels.web.url"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Known keys ──────────────────────────────────────────────────────────────

const TOP_LEVEL_KEYS: &[&str] = &["server", "dispatch", "validation", "metrics", "channels"];
const SERVER_KEYS: &[&str] = &["bind", "port"];
const DISPATCH_KEYS: &[&str] = &[
    "handler_timeout_ms",
    "idempotency_ttl_ms",
    "idempotency_max_entries",
];
const VALIDATION_KEYS: &[&str] = &[
    "max_payload_bytes",
    "max_conversation_id_len",
    "allowed_channels",
];
const METRICS_KEYS: &[&str] = &["enabled", "labels"];
const CHANNEL_KEYS: &[&str] = &["enabled", "handler", "url", "token"];

fn section_keys(section: &str) -> Option<&'static [&'static str]> {
    match section {
        "server" => Some(SERVER_KEYS),
        "dispatch" => Some(DISPATCH_KEYS),
        "validation" => Some(VALIDATION_KEYS),
        "metrics" => Some(METRICS_KEYS),
        _ => None,
    }
}

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| *d > 0 && *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

fn check_keys(
    table: &serde_json::Map<String, serde_json::Value>,
    known: &[&str],
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for key in table.keys() {
        if known.contains(&key.as_str()) {
            continue;
        }
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        let message = match suggest(key, known, 3) {
            Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
            None => "unknown field".to_string(),
        };
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "unknown-field",
            path,
            message,
        ));
    }
}

fn check_unknown_fields(value: &serde_json::Value, diagnostics: &mut Vec<Diagnostic>) {
    let Some(root) = value.as_object() else {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            "config root must be a table",
        ));
        return;
    };
    check_keys(root, TOP_LEVEL_KEYS, "", diagnostics);

    for (section, body) in root {
        if let (Some(known), Some(table)) = (section_keys(section), body.as_object()) {
            check_keys(table, known, section, diagnostics);
        }
    }

    if let Some(channels) = root.get("channels").and_then(|v| v.as_object()) {
        for (id, body) in channels {
            if let Some(table) = body.as_object() {
                check_keys(table, CHANNEL_KEYS, &format!("channels.{id}"), diagnostics);
            }
        }
    }
}

// ── Semantic checks ─────────────────────────────────────────────────────────

/// Semantic checks on an already-parsed config.
///
/// Also run by the gateway at startup, which refuses to start on errors.
#[must_use]
pub fn check_config(config: &InletConfig) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    if config.dispatch.handler_timeout_ms == 0 {
        out.push(Diagnostic::new(
            Severity::Error,
            "value",
            "dispatch.handler_timeout_ms",
            "must be greater than zero",
        ));
    }
    if config.dispatch.idempotency_max_entries == 0 {
        out.push(Diagnostic::new(
            Severity::Error,
            "value",
            "dispatch.idempotency_max_entries",
            "must be greater than zero",
        ));
    }
    if config.dispatch.idempotency_ttl_ms == 0 {
        out.push(Diagnostic::new(
            Severity::Warning,
            "value",
            "dispatch.idempotency_ttl_ms",
            "zero retention: redelivered events will run their handler again",
        ));
    }
    if config.validation.max_payload_bytes == 0 {
        out.push(Diagnostic::new(
            Severity::Error,
            "value",
            "validation.max_payload_bytes",
            "must be greater than zero",
        ));
    }
    if config.validation.max_conversation_id_len == 0 {
        out.push(Diagnostic::new(
            Severity::Error,
            "value",
            "validation.max_conversation_id_len",
            "must be greater than zero",
        ));
    }

    for pattern in &config.validation.allowed_channels {
        if pattern.is_empty()
            || pattern.contains('/')
            || pattern.chars().any(char::is_whitespace)
        {
            out.push(Diagnostic::new(
                Severity::Warning,
                "value",
                "validation.allowed_channels",
                format!("\"{pattern}\" can never match a channel id"),
            ));
        } else if !config
            .enabled_channels()
            .any(|(id, _)| channel_pattern_matches(pattern, id))
        {
            out.push(Diagnostic::new(
                Severity::Warning,
                "value",
                "validation.allowed_channels",
                format!(
                    "\"{pattern}\" matches no enabled channel; events it admits will fail with UNKNOWN_CHANNEL"
                ),
            ));
        }
    }

    if config.enabled_channels().next().is_none() {
        out.push(Diagnostic::new(
            Severity::Warning,
            "value",
            "channels",
            "no enabled channels; every event will fail with UNKNOWN_CHANNEL",
        ));
    }

    for (id, channel) in &config.channels {
        let path = format!("channels.{id}");
        if id.is_empty() || id.contains('/') || id.chars().any(char::is_whitespace) {
            out.push(Diagnostic::new(
                Severity::Error,
                "value",
                path.clone(),
                "channel id must be non-empty and contain no '/' or whitespace",
            ));
        }
        match (channel.handler, channel.url.as_deref()) {
            (HandlerKind::Forward, None) => out.push(Diagnostic::new(
                Severity::Error,
                "value",
                format!("{path}.url"),
                "forward handler requires a url",
            )),
            (HandlerKind::Forward, Some(raw)) => check_forward_url(&path, raw, channel, &mut out),
            (HandlerKind::Acknowledge, Some(_)) => out.push(Diagnostic::new(
                Severity::Info,
                "value",
                format!("{path}.url"),
                "url is ignored by the acknowledge handler",
            )),
            (HandlerKind::Acknowledge, None) => {},
        }
    }

    if !is_loopback_bind(&config.server.bind) {
        out.push(Diagnostic::new(
            Severity::Warning,
            "security",
            "server.bind",
            format!(
                "binding to {} exposes the event endpoints without authentication",
                config.server.bind
            ),
        ));
    }

    out
}

fn check_forward_url(
    path: &str,
    raw: &str,
    channel: &crate::schema::ChannelConfig,
    out: &mut Vec<Diagnostic>,
) {
    let url_path = format!("{path}.url");
    let parsed = match url::Url::parse(raw) {
        Ok(u) => u,
        Err(e) => {
            out.push(Diagnostic::new(
                Severity::Error,
                "value",
                url_path,
                format!("invalid url: {e}"),
            ));
            return;
        },
    };
    match parsed.scheme() {
        "https" => {},
        "http" => {
            let local = parsed
                .host_str()
                .is_some_and(|h| h == "localhost" || is_loopback_bind(h));
            if channel.token.is_some() && !local {
                out.push(Diagnostic::new(
                    Severity::Warning,
                    "security",
                    url_path,
                    "bearer token would be sent over plain http",
                ));
            }
        },
        other => out.push(Diagnostic::new(
            Severity::Error,
            "value",
            url_path,
            format!("unsupported url scheme \"{other}\""),
        )),
    }
}

fn is_loopback_bind(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.parse::<std::net::IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(host == "localhost")
}

// ── Entry points ────────────────────────────────────────────────────────────

/// Validate a config file at the given path, or the discovered config file
/// when `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = path.map(Path::to_path_buf).or_else(loader::find_config_file);

    let Some(actual_path) = config_path else {
        let mut diagnostics = vec![Diagnostic::new(
            Severity::Info,
            "file-ref",
            "",
            "no config file found; using defaults",
        )];
        diagnostics.extend(check_config(&InletConfig::default()));
        return ValidationResult {
            diagnostics,
            config_path: None,
        };
    };

    let mut diagnostics = Vec::new();
    match loader::load_config_value(&actual_path) {
        Ok(value) => check_unknown_fields(&value, &mut diagnostics),
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                e.to_string(),
            ));
            return ValidationResult {
                diagnostics,
                config_path: Some(actual_path),
            };
        },
    }

    match loader::load_config(&actual_path) {
        Ok(config) => diagnostics.extend(check_config(&config)),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: Some(actual_path),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn validate_toml(body: &str) -> ValidationResult {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inlet.toml");
        std::fs::write(&path, body).unwrap();
        validate(Some(&path))
    }

    fn has(result: &ValidationResult, severity: Severity, path: &str) -> bool {
        result
            .diagnostics
            .iter()
            .any(|d| d.severity == severity && d.path == path)
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("port", "prt"), 1);
        assert_eq!(levenshtein("dispatch", "dispatch"), 0);
    }

    #[test]
    fn suggests_close_key() {
        assert_eq!(suggest("dispach", TOP_LEVEL_KEYS, 3), Some("dispatch"));
        assert_eq!(suggest("zzzzzzzz", TOP_LEVEL_KEYS, 3), None);
    }

    #[test]
    fn default_config_is_clean() {
        let diags = check_config(&InletConfig::default());
        assert!(
            diags.iter().all(|d| d.severity != Severity::Error),
            "{diags:?}"
        );
    }

    #[test]
    fn flags_misspelled_section_key() {
        let result = validate_toml("[dispatch]\nhandler_timeout = 10\n");
        assert!(has(&result, Severity::Error, "dispatch.handler_timeout"));
        let d = result
            .diagnostics
            .iter()
            .find(|d| d.path == "dispatch.handler_timeout")
            .unwrap();
        assert!(d.message.contains("handler_timeout_ms"));
    }

    #[test]
    fn flags_unknown_channel_field() {
        let result = validate_toml("[channels.web]\nhandlr = \"acknowledge\"\n");
        assert!(has(&result, Severity::Error, "channels.web.handlr"));
    }

    #[test]
    fn forward_without_url_is_error() {
        let result = validate_toml("[channels.hooks]\nhandler = \"forward\"\n");
        assert!(result.has_errors());
        assert!(has(&result, Severity::Error, "channels.hooks.url"));
    }

    #[test]
    fn forward_with_bad_scheme_is_error() {
        let result =
            validate_toml("[channels.hooks]\nhandler = \"forward\"\nurl = \"ftp://x/y\"\n");
        assert!(has(&result, Severity::Error, "channels.hooks.url"));
    }

    #[test]
    fn token_over_remote_http_warns() {
        let result = validate_toml(
            "[channels.hooks]\nhandler = \"forward\"\nurl = \"http://example.com/in\"\ntoken = \"t\"\n",
        );
        assert!(has(&result, Severity::Warning, "channels.hooks.url"));
        assert!(!result.has_errors());
    }

    #[test]
    fn zero_timeout_is_error() {
        let result = validate_toml("[dispatch]\nhandler_timeout_ms = 0\n");
        assert!(has(&result, Severity::Error, "dispatch.handler_timeout_ms"));
    }

    #[test]
    fn allowed_channel_without_registration_warns() {
        let result = validate_toml("[validation]\nallowed_channels = [\"sms\"]\n");
        assert!(has(&result, Severity::Warning, "validation.allowed_channels"));
    }

    #[test]
    fn wildcard_covering_an_enabled_channel_is_clean() {
        let result = validate_toml("[validation]\nallowed_channels = [\"w*\", \"*li\"]\n");
        assert!(!has(&result, Severity::Warning, "validation.allowed_channels"));
    }

    #[test]
    fn wildcard_matching_no_enabled_channel_warns() {
        let result = validate_toml("[validation]\nallowed_channels = [\"slack-*\"]\n");
        let warning = result
            .diagnostics
            .iter()
            .find(|d| d.path == "validation.allowed_channels")
            .unwrap();
        assert!(warning.message.contains("\"slack-*\" matches no enabled channel"));
    }

    #[test]
    fn unmatchable_allow_list_entry_warns() {
        let result = validate_toml("[validation]\nallowed_channels = [\"\", \"web hooks\"]\n");
        let count = result
            .diagnostics
            .iter()
            .filter(|d| d.message.ends_with("can never match a channel id"))
            .count();
        assert_eq!(count, 2);
    }

    #[test]
    fn public_bind_warns() {
        let result = validate_toml("[server]\nbind = \"0.0.0.0\"\n");
        assert!(has(&result, Severity::Warning, "server.bind"));
    }

    #[test]
    fn syntax_error_is_reported() {
        let result = validate_toml("[server\nport = 1\n");
        assert_eq!(result.count(Severity::Error), 1);
        assert_eq!(result.diagnostics[0].category, "syntax");
    }

    #[test]
    fn type_error_is_reported() {
        let result = validate_toml("[server]\nport = \"high\"\n");
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.category == "type-error")
        );
    }
}
