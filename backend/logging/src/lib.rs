//! Telemetry and structured logging for the relay.
//!
//! Handles log redaction, console and rolling NDJSON file output, and relay
//! milestone events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger, RELAY_EVENTS_TARGET, RelayEvent};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
