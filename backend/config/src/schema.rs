//! Relay runtime configuration schema.
//!
//! Every section serializes camelCase so the effective config can be redacted and
//! printed as JSON.

use serde::{Deserialize, Serialize};

use crate::defaults;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    /// Bot Framework Direct Line backend
    pub direct_line: DirectLineSettings,

    /// LINE Messaging API
    pub line: LineSettings,

    /// Inbound HTTP server
    pub server: ServerSettings,

    /// Reply polling window
    pub poll: PollSettings,

    /// Logging
    pub logging: LoggingSettings,
}

// ---------------------------------------------------------------------------
// Direct Line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectLineSettings {
    /// Base endpoint, without trailing slash.
    pub endpoint: String,
    /// Service secret used to open conversations.
    pub secret: String,
    /// Per-request timeout for every backend call.
    pub request_timeout_secs: u64,
}

// ---------------------------------------------------------------------------
// LINE
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSettings {
    pub api_base: String,
    pub channel_access_token: String,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    pub bind_address: String,
    pub port: u16,
    /// Route the LINE webhook is mounted on.
    pub webhook_path: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: defaults::DEFAULT_BIND_ADDRESS.to_string(),
            port: defaults::DEFAULT_PORT,
            webhook_path: defaults::DEFAULT_WEBHOOK_PATH.to_string(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSettings {
    pub max_attempts: u32,
    pub interval_ms: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: defaults::DEFAULT_POLL_MAX_ATTEMPTS,
            interval_ms: defaults::DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl PollSettings {
    /// Longest time a single message can spend waiting for a reply.
    pub fn window_ms(&self) -> u64 {
        u64::from(self.max_attempts).saturating_mul(self.interval_ms)
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingSettings {
    /// `EnvFilter` directive, e.g. `info` or `linerelay_gateway=debug`.
    pub level: String,
    /// When set, NDJSON logs are also written to a daily-rolling file here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::DEFAULT_LOG_LEVEL.to_string(),
            dir: None,
        }
    }
}
