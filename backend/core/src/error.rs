use thiserror::Error;

/// Top-level error type for the relay runtime.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Session creation or message send was rejected or never answered.
    #[error("bot backend unavailable during {operation}: {message}")]
    BackendUnavailable { operation: String, message: String },

    /// A single activity poll failed. Counted against the poll budget, never fatal.
    #[error("activity poll failed: {0}")]
    PollTransientFailure(String),

    #[error("reply delivery failed: {0}")]
    ReplyDeliveryFailed(String),
}

impl RelayError {
    pub fn backend(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::BackendUnavailable {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Short stage label used in structured logs.
    pub fn stage(&self) -> &str {
        match self {
            Self::BackendUnavailable { operation, .. } => operation,
            Self::PollTransientFailure(_) => "poll",
            Self::ReplyDeliveryFailed(_) => "reply",
        }
    }
}
