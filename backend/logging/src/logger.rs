//! Structured Logger
//!
//! Wraps `tracing` to provide console output, optional NDJSON file rotation,
//! and environment-based level control.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// File name prefix of the rolling log (`line-copilot-relay.log.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "line-copilot-relay.log";

/// Initialize the global structured logger.
///
/// `level` is an `EnvFilter` directive used when `RUST_LOG` is unset or unparsable.
/// When `log_dir` is given a daily-rolling JSON file layer is added next to the
/// console layer. Calling this twice is harmless; the second call is ignored.
pub fn init_logger(level: &str, log_dir: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = log_dir.map(|dir| {
        let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
        fmt::layer().json().with_writer(file_appender).with_ansi(false)
    });

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_ansi(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
