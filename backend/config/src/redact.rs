//! Config redaction: produce safe-to-log config snapshots by masking secrets.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Keys whose string values are always masked.
static SECRET_KEYS: &[&str] = &[
    "secret",
    "channelAccessToken",
    "channel_access_token",
    "sessionToken",
    "session_token",
    "accessToken",
    "access_token",
    "token",
    "apiKey",
    "api_key",
    "password",
];

/// Query-string credentials embedded in URLs (e.g. Direct Line stream URLs).
static URL_CREDENTIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([?&](?:t|token|key|secret)=)[^&\s]+").unwrap());

/// Redact a config JSON value, masking every sensitive field.
///
/// The first four characters survive as a hint so operators can tell which secret
/// is loaded without exposing it.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn is_sensitive_key(key: &str) -> bool {
    SECRET_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn redact_string(s: &str, key: &str) -> Value {
    if is_sensitive_key(key) && !s.is_empty() {
        let hint = if s.chars().count() > 4 {
            format!("{}***", s.chars().take(4).collect::<String>())
        } else {
            "***".to_string()
        };
        return Value::String(hint);
    }

    Value::String(URL_CREDENTIAL.replace_all(s, "${1}***").into_owned())
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) => redact_string(s, key),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                result.insert(k.clone(), redact_recursive(v, k));
            }
            Value::Object(result)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_secrets() {
        let v = json!({
            "directLine": { "endpoint": "https://directline.botframework.com", "secret": "abcdefghijkl" },
            "line": { "channelAccessToken": "xyz" }
        });
        let redacted = redact(&v);
        assert_eq!(redacted["directLine"]["secret"], "abcd***");
        assert_eq!(redacted["line"]["channelAccessToken"], "***");
        assert_eq!(redacted["directLine"]["endpoint"], "https://directline.botframework.com");
    }

    #[test]
    fn masks_url_credentials() {
        let v = json!({ "streamUrl": "wss://directline.botframework.com/stream?t=eyJhbGci&x=1" });
        let redacted = redact(&v);
        assert_eq!(
            redacted["streamUrl"],
            "wss://directline.botframework.com/stream?t=***&x=1"
        );
    }

    #[test]
    fn passthrough_non_sensitive() {
        let v = json!({ "logging": { "level": "debug" }, "poll": { "maxAttempts": 5 } });
        assert_eq!(redact(&v), v);
    }
}
