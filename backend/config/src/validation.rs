//! Config validation: semantic checks with user-friendly error messages.

use crate::schema::RelayConfig;
use thiserror::Error;

/// Reply tokens are only honoured for a short time after the webhook fires.
pub const REPLY_TOKEN_WINDOW_MS: u64 = 60_000;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &RelayConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_direct_line(config, &mut report);
    validate_line(config, &mut report);
    validate_server(config, &mut report);
    validate_poll(config, &mut report);
    report
}

fn validate_direct_line(config: &RelayConfig, report: &mut ValidationReport) {
    let dl = &config.direct_line;
    if !is_http_url(&dl.endpoint) {
        report.error("directLine.endpoint", format!("'{}' is not an http(s) URL", dl.endpoint));
    }
    if dl.request_timeout_secs == 0 {
        report.error("directLine.requestTimeoutSecs", "requestTimeoutSecs must be >= 1");
    }
}

fn validate_line(config: &RelayConfig, report: &mut ValidationReport) {
    if !is_http_url(&config.line.api_base) {
        report.error(
            "line.apiBase",
            format!("'{}' is not an http(s) URL", config.line.api_base),
        );
    }
}

fn validate_server(config: &RelayConfig, report: &mut ValidationReport) {
    let server = &config.server;
    if server.port != 0 && server.port < 1024 && server.port != 80 && server.port != 443 {
        report.warn(
            "server.port",
            format!(
                "Port {} requires elevated privileges; consider using a port >= 1024",
                server.port
            ),
        );
    }
    if !server.webhook_path.starts_with('/') {
        report.error("server.webhookPath", "webhookPath must start with '/'");
    }
}

fn validate_poll(config: &RelayConfig, report: &mut ValidationReport) {
    let poll = &config.poll;
    if poll.max_attempts == 0 {
        report.error("poll.maxAttempts", "maxAttempts must be >= 1");
    }
    if poll.interval_ms == 0 {
        report.error("poll.intervalMs", "intervalMs must be >= 1");
    }
    if poll.window_ms() >= REPLY_TOKEN_WINDOW_MS {
        report.warn(
            "poll",
            format!(
                "Polling window of {} ms outlives the LINE reply token; late replies will be rejected",
                poll.window_ms()
            ),
        );
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
