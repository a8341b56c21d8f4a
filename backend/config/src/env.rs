//! Environment variable loading.
//!
//! All settings come from the process environment. Loading goes through a lookup
//! function so tests can supply a plain map instead of mutating the real environment.
//! Blank values count as unset.

use std::collections::HashMap;

use crate::defaults::{self, normalize_base_url};
use crate::schema::{
    DirectLineSettings, LineSettings, LoggingSettings, PollSettings, RelayConfig, ServerSettings,
};

pub const ENV_DIRECT_LINE_ENDPOINT: &str = "MBF_DIRECT_LINE_ENDPOINT";
pub const ENV_DIRECT_LINE_SECRET: &str = "MBF_DIRECT_LINE_SECRET";
pub const ENV_LINE_CHANNEL_ACCESS_TOKEN: &str = "LINE_BOT_CHANNEL_ACCESS_TOKEN";
pub const ENV_LINE_API_BASE: &str = "LINE_API_BASE";
pub const ENV_PORT: &str = "PORT";
pub const ENV_BIND: &str = "RELAY_BIND";
pub const ENV_WEBHOOK_PATH: &str = "RELAY_WEBHOOK_PATH";
pub const ENV_POLL_MAX_ATTEMPTS: &str = "RELAY_POLL_MAX_ATTEMPTS";
pub const ENV_POLL_INTERVAL_MS: &str = "RELAY_POLL_INTERVAL_MS";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "RELAY_HTTP_TIMEOUT_SECS";
pub const ENV_LOG_LEVEL: &str = "RELAY_LOG_LEVEL";
pub const ENV_RUST_LOG: &str = "RUST_LOG";
pub const ENV_LOG_DIR: &str = "RELAY_LOG_DIR";

/// Errors raised while reading the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable(s): {}", vars.join(", "))]
    Missing { vars: Vec<&'static str> },

    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("config validation failed: {0}")]
    Validation(String),
}

/// Load the full config from the process environment.
pub fn load_from_env() -> Result<RelayConfig, ConfigError> {
    load_with(|key| std::env::var(key).ok())
}

/// Load the full config from a provided map (useful for testing).
pub fn load_from_map(env: &HashMap<String, String>) -> Result<RelayConfig, ConfigError> {
    load_with(|key| env.get(key).cloned())
}

/// Load the full config through an arbitrary lookup.
///
/// Every missing required variable is reported at once.
pub fn load_with<F>(lookup: F) -> Result<RelayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let secret = get(ENV_DIRECT_LINE_SECRET);
    let access_token = get(ENV_LINE_CHANNEL_ACCESS_TOKEN);

    let mut missing = Vec::new();
    if secret.is_none() {
        missing.push(ENV_DIRECT_LINE_SECRET);
    }
    if access_token.is_none() {
        missing.push(ENV_LINE_CHANNEL_ACCESS_TOKEN);
    }
    let (Some(secret), Some(channel_access_token)) = (secret, access_token) else {
        return Err(ConfigError::Missing { vars: missing });
    };

    let direct_line = DirectLineSettings {
        endpoint: normalize_base_url(
            &get(ENV_DIRECT_LINE_ENDPOINT)
                .unwrap_or_else(|| defaults::DEFAULT_DIRECT_LINE_ENDPOINT.to_string()),
        ),
        secret,
        request_timeout_secs: parse_or(
            ENV_HTTP_TIMEOUT_SECS,
            get(ENV_HTTP_TIMEOUT_SECS),
            defaults::DEFAULT_REQUEST_TIMEOUT_SECS,
        )?,
    };

    let line = LineSettings {
        api_base: normalize_base_url(
            &get(ENV_LINE_API_BASE).unwrap_or_else(|| defaults::DEFAULT_LINE_API_BASE.to_string()),
        ),
        channel_access_token,
    };

    let server = ServerSettings {
        bind_address: get(ENV_BIND).unwrap_or_else(|| defaults::DEFAULT_BIND_ADDRESS.to_string()),
        port: parse_or(ENV_PORT, get(ENV_PORT), defaults::DEFAULT_PORT)?,
        webhook_path: get(ENV_WEBHOOK_PATH)
            .unwrap_or_else(|| defaults::DEFAULT_WEBHOOK_PATH.to_string()),
    };

    let poll = PollSettings {
        max_attempts: parse_or(
            ENV_POLL_MAX_ATTEMPTS,
            get(ENV_POLL_MAX_ATTEMPTS),
            defaults::DEFAULT_POLL_MAX_ATTEMPTS,
        )?,
        interval_ms: parse_or(
            ENV_POLL_INTERVAL_MS,
            get(ENV_POLL_INTERVAL_MS),
            defaults::DEFAULT_POLL_INTERVAL_MS,
        )?,
    };

    Ok(RelayConfig {
        direct_line,
        line,
        server,
        poll,
        logging: logging_with(&lookup),
    })
}

/// Logging settings alone. Never fails, so the logger can start before the rest
/// of the config is known to be valid.
pub fn logging_from_env() -> LoggingSettings {
    logging_with(|key| std::env::var(key).ok())
}

pub fn logging_with<F>(lookup: F) -> LoggingSettings
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    LoggingSettings {
        level: get(ENV_RUST_LOG)
            .or_else(|| get(ENV_LOG_LEVEL))
            .unwrap_or_else(|| defaults::DEFAULT_LOG_LEVEL.to_string()),
        dir: get(ENV_LOG_DIR),
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
