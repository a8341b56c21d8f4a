//! Bot Framework Direct Line client. Opens conversations, posts user messages and
//! polls for bot activities.
//!
//! Conversation creation authenticates with the service secret; every later call on
//! a conversation uses the token issued with it.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use linerelay_core::{ActivitySet, BotBackend, ConversationSession, RelayError};

pub struct DirectLineConfig {
    /// Base endpoint without trailing slash, e.g. `https://directline.botframework.com`.
    pub endpoint: String,
    pub secret: String,
    pub request_timeout: Duration,
}

pub struct DirectLineClient {
    config: DirectLineConfig,
    http: Client,
}

impl DirectLineClient {
    pub fn new(config: DirectLineConfig) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { config, http })
    }

    fn conversations_url(&self) -> String {
        format!("{}/v3/directline/conversations", self.config.endpoint)
    }

    fn activities_url(&self, conversation_id: &str) -> String {
        format!(
            "{}/{}/activities",
            self.conversations_url(),
            urlencoding::encode(conversation_id)
        )
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationResponse {
    conversation_id: Option<String>,
    token: Option<String>,
    stream_url: Option<String>,
}

#[derive(Serialize)]
struct OutgoingActivity<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    from: OutgoingFrom<'a>,
    text: &'a str,
}

#[derive(Serialize)]
struct OutgoingFrom<'a> {
    id: &'a str,
}

/// Turn a non-success status into an error carrying the response body.
async fn check_status(response: Response) -> Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(format!("Direct Line returned {status}: {body}"))
}

#[async_trait]
impl BotBackend for DirectLineClient {
    fn name(&self) -> &str {
        "directline"
    }

    async fn create_session(&self) -> Result<ConversationSession, RelayError> {
        const OP: &str = "create_session";

        let response = self
            .http
            .post(self.conversations_url())
            .bearer_auth(&self.config.secret)
            .send()
            .await
            .map_err(|e| RelayError::backend(OP, e))?;
        let response = check_status(response).await.map_err(|e| RelayError::backend(OP, e))?;

        let body: ConversationResponse = response
            .json()
            .await
            .map_err(|e| RelayError::backend(OP, format!("undecodable response: {e}")))?;

        let (Some(conversation_id), Some(token)) = (body.conversation_id, body.token) else {
            return Err(RelayError::backend(
                OP,
                "response is missing conversationId or token",
            ));
        };

        debug!(conversation_id = %conversation_id, "Direct Line conversation opened");
        let mut session = ConversationSession::new(conversation_id, token);
        session.stream_url = body.stream_url;
        Ok(session)
    }

    async fn send_message(
        &self,
        session: &ConversationSession,
        from_id: &str,
        text: &str,
    ) -> Result<(), RelayError> {
        const OP: &str = "send_message";

        let activity = OutgoingActivity {
            kind: "message",
            from: OutgoingFrom { id: from_id },
            text,
        };

        let response = self
            .http
            .post(self.activities_url(&session.conversation_id))
            .bearer_auth(&session.session_token)
            .json(&activity)
            .send()
            .await
            .map_err(|e| RelayError::backend(OP, e))?;
        check_status(response).await.map_err(|e| RelayError::backend(OP, e))?;

        debug!(conversation_id = %session.conversation_id, chars = text.chars().count(), "Message posted to Direct Line");
        Ok(())
    }

    async fn fetch_activities(&self, session: &ConversationSession) -> Result<ActivitySet, RelayError> {
        let response = self
            .http
            .get(self.activities_url(&session.conversation_id))
            .query(&[("watermark", session.watermark_param())])
            .bearer_auth(&session.session_token)
            .send()
            .await
            .map_err(|e| RelayError::PollTransientFailure(e.to_string()))?;
        let response = check_status(response)
            .await
            .map_err(RelayError::PollTransientFailure)?;

        let set: ActivitySet = response
            .json()
            .await
            .map_err(|e| RelayError::PollTransientFailure(format!("undecodable activities: {e}")))?;

        debug!(
            conversation_id = %session.conversation_id,
            activities = set.activities.len(),
            watermark = ?set.watermark,
            "Direct Line poll"
        );
        Ok(set)
    }
}
