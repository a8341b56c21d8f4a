//! Relay Event Logger
//!
//! Structured relay milestones (session opened, message forwarded, reply delivered,
//! no reply, failure) emitted through `tracing` under the `relay_events` target.
//! User message text never appears in these events, only its length.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

pub const RELAY_EVENTS_TARGET: &str = "relay_events";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    SessionOpened {
        conversation_id: String,
    },
    MessageForwarded {
        conversation_id: String,
        chars: usize,
    },
    ReplyDelivered {
        conversation_id: String,
        attempts: u32,
        chars: usize,
    },
    NoReply {
        conversation_id: String,
        attempts: u32,
    },
    Failed {
        stage: String,
        error_msg: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: RelayEvent,
}

impl EventLogEntry {
    /// Build an entry, scrubbing any free-form error text.
    pub fn new(user_id: &str, mut event: RelayEvent) -> Self {
        if let RelayEvent::Failed { error_msg, .. } = &mut event {
            *error_msg = redact_sensitive_data(error_msg);
        }
        Self {
            user_id: user_id.into(),
            timestamp: Utc::now(),
            event,
        }
    }
}

pub struct EventLogger;

impl EventLogger {
    /// Logs a relay event for `user_id`, serializing it as a structured field.
    pub fn log_event(user_id: &str, event: RelayEvent) {
        let entry = EventLogEntry::new(user_id, event);
        let payload = serde_json::to_string(&entry).unwrap_or_default();

        match entry.event {
            RelayEvent::Failed { .. } => {
                warn!(target: RELAY_EVENTS_TARGET, event = %payload, "Relay event")
            }
            _ => info!(target: RELAY_EVENTS_TARGET, event = %payload, "Relay event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_event_is_scrubbed() {
        let entry = EventLogEntry::new(
            "U1",
            RelayEvent::Failed {
                stage: "send_message".into(),
                error_msg: "401 for Bearer secret-token-value".into(),
            },
        );
        match &entry.event {
            RelayEvent::Failed { error_msg, .. } => {
                assert!(!error_msg.contains("secret-token-value"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn serializes_with_type_tag() {
        let entry = EventLogEntry::new(
            "U1",
            RelayEvent::NoReply {
                conversation_id: "c1".into(),
                attempts: 5,
            },
        );
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["event"]["type"], "no_reply");
        assert_eq!(v["event"]["attempts"], 5);
        assert_eq!(v["user_id"], "U1");
    }
}
