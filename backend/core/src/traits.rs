use async_trait::async_trait;

use crate::activity::ActivitySet;
use crate::error::RelayError;
use crate::session::ConversationSession;

/// A conversational bot reached through a poll-based session API (Direct Line).
#[async_trait]
pub trait BotBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Allocate a new conversation.
    async fn create_session(&self) -> Result<ConversationSession, RelayError>;

    /// Post a user message into the conversation, attributed to `from_id`.
    async fn send_message(
        &self,
        session: &ConversationSession,
        from_id: &str,
        text: &str,
    ) -> Result<(), RelayError>;

    /// Fetch every activity after the session's watermark.
    ///
    /// Failures are reported as [`RelayError::PollTransientFailure`].
    async fn fetch_activities(&self, session: &ConversationSession) -> Result<ActivitySet, RelayError>;
}

/// Delivers a reply back to the messaging platform.
#[async_trait]
pub trait ReplySink: Send + Sync {
    fn name(&self) -> &str;

    /// Send `text` as the reply bound to `reply_token`.
    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), RelayError>;
}
