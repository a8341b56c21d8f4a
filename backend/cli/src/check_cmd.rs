//! `check-config` command
//!
//! Loads the configuration from the environment, prints it with secrets masked and
//! lists every validation finding.

use linerelay_config::{ConfigError, RelayConfig, load_from_env, redacted_snapshot, validate};

/// Returns whether the configuration is usable.
pub fn run() -> bool {
    report(load_from_env())
}

fn report(loaded: Result<RelayConfig, ConfigError>) -> bool {
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            println!("🔴 {e}");
            return false;
        }
    };

    let snapshot = redacted_snapshot(&config);
    println!(
        "{}",
        serde_json::to_string_pretty(&snapshot).unwrap_or_else(|_| snapshot.to_string())
    );
    println!();

    let report = validate(&config);
    for warning in &report.warnings {
        println!("🟡 {}: {}", warning.path, warning.message);
    }
    for error in &report.errors {
        println!("🔴 {}: {}", error.path, error.message);
    }

    if report.is_valid() {
        println!("✅ Configuration is valid.");
    } else {
        println!("❌ Configuration has errors.");
    }
    report.is_valid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use linerelay_config::load_from_map;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn complete_config_passes() {
        let env = vars(&[
            ("MBF_DIRECT_LINE_SECRET", "dl-secret"),
            ("LINE_BOT_CHANNEL_ACCESS_TOKEN", "line-token"),
        ]);
        assert!(report(load_from_map(&env)));
    }

    #[test]
    fn missing_credentials_fail() {
        let env = vars(&[("MBF_DIRECT_LINE_SECRET", "dl-secret")]);
        assert!(!report(load_from_map(&env)));
    }

    #[test]
    fn validation_errors_fail() {
        let env = vars(&[
            ("MBF_DIRECT_LINE_SECRET", "dl-secret"),
            ("LINE_BOT_CHANNEL_ACCESS_TOKEN", "line-token"),
            ("RELAY_WEBHOOK_PATH", "callback"),
        ]);
        assert!(!report(load_from_map(&env)));
    }
}
