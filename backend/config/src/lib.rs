//! `linerelay-config`: runtime configuration for the relay.
//!
//! Provides:
//! - Typed config schema
//! - Environment loading with defaults
//! - Semantic validation (errors and warnings)
//! - Config redaction for safe logging/display

pub mod defaults;
pub mod env;
pub mod redact;
pub mod schema;
pub mod validation;

pub use env::{load_from_env, load_from_map, load_with, logging_from_env, ConfigError};
pub use redact::redact;
pub use schema::{
    DirectLineSettings, LineSettings, LoggingSettings, PollSettings, RelayConfig, ServerSettings,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use serde_json::Value;

/// Load from the environment, validate, and log any warnings.
///
/// This is the main entry point for loading a config at runtime. Validation errors
/// are logged individually and then returned as a single [`ConfigError::Validation`].
pub fn load_and_validate() -> Result<RelayConfig, ConfigError> {
    let config = load_from_env()?;
    check(config)
}

/// Validate an already loaded config, logging every finding.
pub fn check(config: RelayConfig) -> Result<RelayConfig, ConfigError> {
    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }

    if report.is_valid() {
        Ok(config)
    } else {
        let summary = report
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::Validation(summary))
    }
}

/// Redacted JSON snapshot of the effective config.
pub fn redacted_snapshot(config: &RelayConfig) -> Value {
    serde_json::to_value(config)
        .map(|v| redact(&v))
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env() -> HashMap<String, String> {
        [
            ("MBF_DIRECT_LINE_SECRET", "dl-secret-value"),
            ("LINE_BOT_CHANNEL_ACCESS_TOKEN", "line-token-value"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn snapshot_hides_credentials() {
        let cfg = load_from_map(&env()).unwrap();
        let snapshot = redacted_snapshot(&cfg).to_string();
        assert!(!snapshot.contains("dl-secret-value"));
        assert!(!snapshot.contains("line-token-value"));
        assert!(snapshot.contains("directline.botframework.com"));
    }

    #[test]
    fn check_rejects_invalid() {
        let mut cfg = load_from_map(&env()).unwrap();
        cfg.poll.interval_ms = 0;
        let err = check(cfg).unwrap_err();
        assert!(err.to_string().contains("poll.intervalMs"));
    }
}
