mod check_cmd;
mod status_cmd;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use linerelay_channels::{DirectLineClient, DirectLineConfig, LineClient, LineConfig};
use linerelay_config::{ConfigError, RelayConfig};
use linerelay_gateway::{GatewayState, RelayService, ReplyPoller, start_server};

#[derive(Parser)]
#[command(name = "line-copilot-relay")]
#[command(about = "Relays LINE messages to a Copilot Studio bot over Direct Line")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay server (default)
    Serve {
        /// Port to bind the HTTP server to (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Load, validate and print the effective configuration with secrets masked
    CheckConfig,
    /// Query the health endpoint of a running relay
    Status {
        /// Port the relay listens on (defaults to PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging settings never fail to load, so the logger is up before config errors.
    let logging = linerelay_config::logging_from_env();
    linerelay_logging::init_logger(&logging.level, logging.dir.as_deref().map(Path::new));

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            let config = load_or_exit(port);
            run_server(config).await?;
        }
        Commands::CheckConfig => {
            if !check_cmd::run() {
                std::process::exit(1);
            }
        }
        Commands::Status { port } => {
            status_cmd::run(port.unwrap_or_else(status_cmd::port_from_env)).await?;
        }
    }

    Ok(())
}

/// Load the config or terminate with a diagnostic and exit status 1.
fn load_or_exit(port: Option<u16>) -> RelayConfig {
    match linerelay_config::load_from_env().and_then(|config| prepare(config, port)) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Startup aborted");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Apply command-line overrides, then validate the result.
fn prepare(mut config: RelayConfig, port: Option<u16>) -> Result<RelayConfig, ConfigError> {
    if let Some(port) = port {
        config.server.port = port;
    }
    linerelay_config::check(config)
}

async fn run_server(config: RelayConfig) -> Result<()> {
    info!(
        config = %linerelay_config::redacted_snapshot(&config),
        "Starting line-copilot-relay"
    );

    let backend = DirectLineClient::new(DirectLineConfig {
        endpoint: config.direct_line.endpoint.clone(),
        secret: config.direct_line.secret.clone(),
        request_timeout: Duration::from_secs(config.direct_line.request_timeout_secs),
    })?;

    let sink = LineClient::new(LineConfig {
        api_base: config.line.api_base.clone(),
        channel_access_token: config.line.channel_access_token.clone(),
        request_timeout: Duration::from_secs(config.direct_line.request_timeout_secs),
    })?;

    let poller = ReplyPoller::new(
        config.poll.max_attempts,
        Duration::from_millis(config.poll.interval_ms),
    );
    info!(
        max_attempts = poller.max_attempts(),
        interval_ms = poller.interval().as_millis() as u64,
        "Reply polling configured"
    );

    let relay = Arc::new(RelayService::new(Arc::new(backend), Arc::new(sink), poller));
    start_server(
        &config.server.socket_addr(),
        &config.server.webhook_path,
        GatewayState::new(relay),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env() -> HashMap<String, String> {
        [
            ("MBF_DIRECT_LINE_SECRET", "dl-secret"),
            ("LINE_BOT_CHANNEL_ACCESS_TOKEN", "line-token"),
            ("PORT", "3000"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn port_flag_overrides_environment() {
        let config = linerelay_config::load_from_map(&env()).unwrap();
        let config = prepare(config, Some(8080)).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.socket_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn overridden_config_is_still_validated() {
        let mut vars = env();
        vars.insert("RELAY_POLL_INTERVAL_MS".into(), "0".into());
        let config = linerelay_config::load_from_map(&vars).unwrap();
        let err = prepare(config, Some(8080)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["line-copilot-relay"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["line-copilot-relay", "serve", "--port", "9000"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve { port: Some(9000) })));
    }
}
