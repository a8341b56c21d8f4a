//! Default values for optional settings.

/// Public Direct Line endpoint.
pub const DEFAULT_DIRECT_LINE_ENDPOINT: &str = "https://directline.botframework.com";

pub const DEFAULT_LINE_API_BASE: &str = "https://api.line.me";

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

pub const DEFAULT_PORT: u16 = 3000;

pub const DEFAULT_WEBHOOK_PATH: &str = "/";

/// Polls per message before giving up on a reply.
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 5;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Strip trailing slashes so paths can be appended with `format!`.
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
