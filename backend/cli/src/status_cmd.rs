//! `status` command
//!
//! Queries the health endpoint of a locally running relay.

use anyhow::Result;
use linerelay_config::defaults::DEFAULT_PORT;
use linerelay_config::env::ENV_PORT;

pub fn port_from_env() -> u16 {
    parse_port(std::env::var(ENV_PORT).ok().as_deref())
}

fn parse_port(value: Option<&str>) -> u16 {
    value
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

pub async fn run(port: u16) -> Result<()> {
    let url = format!("http://127.0.0.1:{port}/api/health");
    match reqwest::get(&url).await {
        Ok(resp) => {
            let body: serde_json::Value = resp.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Err(_) => {
            println!("line-copilot-relay is not running on port {port}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_parsing() {
        assert_eq!(parse_port(Some("8080")), 8080);
        assert_eq!(parse_port(Some(" 4000 ")), 4000);
        assert_eq!(parse_port(Some("not-a-port")), DEFAULT_PORT);
        assert_eq!(parse_port(Some("70000")), DEFAULT_PORT);
        assert_eq!(parse_port(None), DEFAULT_PORT);
    }

    #[tokio::test]
    async fn status_against_stopped_relay_is_not_an_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        assert!(run(port).await.is_ok());
    }
}
