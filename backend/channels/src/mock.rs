//! Scripted in-memory backends for driving the relay without a network.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use linerelay_core::{ActivitySet, BotBackend, ConversationSession, RelayError, ReplySink};

/// A call observed by [`MockBotBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    CreateSession,
    SendMessage {
        conversation_id: String,
        session_token: String,
        from_id: String,
        text: String,
    },
    FetchActivities {
        conversation_id: String,
        watermark: Option<String>,
    },
}

/// Bot backend that hands out numbered sessions and replays a poll script.
///
/// Each poll pops the next scripted step; once the script is exhausted polls return
/// an empty activity set.
#[derive(Default)]
pub struct MockBotBackend {
    calls: Mutex<Vec<BackendCall>>,
    polls: Mutex<VecDeque<Result<ActivitySet, String>>>,
    sessions_created: Mutex<u32>,
    create_delay: Option<Duration>,
    fail_create: bool,
    fail_send: bool,
    hang: bool,
}

impl MockBotBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful poll result.
    pub fn with_poll(self, set: ActivitySet) -> Self {
        self.polls.lock().unwrap().push_back(Ok(set));
        self
    }

    /// Queue a failed poll.
    pub fn with_poll_failure(self, message: impl Into<String>) -> Self {
        self.polls.lock().unwrap().push_back(Err(message.into()));
        self
    }

    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_send(mut self) -> Self {
        self.fail_send = true;
        self
    }

    /// Every call waits forever.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn create_count(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::CreateSession))
    }

    pub fn send_count(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::SendMessage { .. }))
    }

    pub fn poll_count(&self) -> usize {
        self.count(|c| matches!(c, BackendCall::FetchActivities { .. }))
    }

    fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }

    async fn maybe_hang(&self) {
        if self.hang {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl BotBackend for MockBotBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_session(&self) -> Result<ConversationSession, RelayError> {
        self.maybe_hang().await;
        self.record(BackendCall::CreateSession);
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_create {
            return Err(RelayError::backend("create_session", "scripted failure"));
        }

        let n = {
            let mut created = self.sessions_created.lock().unwrap();
            *created += 1;
            *created
        };
        Ok(ConversationSession::new(format!("conv-{n}"), format!("token-{n}")))
    }

    async fn send_message(
        &self,
        session: &ConversationSession,
        from_id: &str,
        text: &str,
    ) -> Result<(), RelayError> {
        self.maybe_hang().await;
        self.record(BackendCall::SendMessage {
            conversation_id: session.conversation_id.clone(),
            session_token: session.session_token.clone(),
            from_id: from_id.to_string(),
            text: text.to_string(),
        });
        if self.fail_send {
            return Err(RelayError::backend("send_message", "scripted failure"));
        }
        Ok(())
    }

    async fn fetch_activities(&self, session: &ConversationSession) -> Result<ActivitySet, RelayError> {
        self.maybe_hang().await;
        self.record(BackendCall::FetchActivities {
            conversation_id: session.conversation_id.clone(),
            watermark: session.watermark.clone(),
        });
        let step = self.polls.lock().unwrap().pop_front();
        match step {
            Some(Ok(set)) => Ok(set),
            Some(Err(message)) => Err(RelayError::PollTransientFailure(message)),
            None => Ok(ActivitySet::default()),
        }
    }
}

/// Reply sink that records every reply instead of sending it.
#[derive(Default)]
pub struct RecordingReplySink {
    replies: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingReplySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// `(reply_token, text)` pairs in delivery order.
    pub fn replies(&self) -> Vec<(String, String)> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplySink for RecordingReplySink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), RelayError> {
        self.replies
            .lock()
            .unwrap()
            .push((reply_token.to_string(), text.to_string()));
        if self.fail {
            return Err(RelayError::ReplyDeliveryFailed("scripted failure".into()));
        }
        Ok(())
    }
}

/// Activity page holding one bot text message per entry.
pub fn bot_messages(texts: &[&str], watermark: &str) -> ActivitySet {
    let activities = texts
        .iter()
        .map(|text| json!({ "type": "message", "from": { "id": "bot", "role": "bot" }, "text": text }))
        .collect::<Vec<_>>();
    activity_set(json!({ "activities": activities, "watermark": watermark }))
}

/// Activity page holding only the echo of the user's own message.
pub fn user_echo(text: &str, watermark: &str) -> ActivitySet {
    activity_set(json!({
        "activities": [{ "type": "message", "from": { "id": "user" }, "text": text }],
        "watermark": watermark
    }))
}

fn activity_set(value: serde_json::Value) -> ActivitySet {
    serde_json::from_value(value).unwrap_or_default()
}
