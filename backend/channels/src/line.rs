//! LINE adapter. Decodes webhook payloads from the LINE Messaging API and sends
//! replies via the LINE Reply API.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use linerelay_core::{RelayError, ReplySink};

/// Longest text LINE accepts in a single text message.
pub const LINE_TEXT_LIMIT: usize = 5000;

pub struct LineConfig {
    /// API base without trailing slash, e.g. `https://api.line.me`.
    pub api_base: String,
    pub channel_access_token: String,
    pub request_timeout: Duration,
}

pub struct LineClient {
    config: LineConfig,
    http: Client,
}

impl LineClient {
    pub fn new(config: LineConfig) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { config, http })
    }

    fn reply_url(&self) -> String {
        format!("{}/v2/bot/message/reply", self.config.api_base)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[async_trait]
impl ReplySink for LineClient {
    fn name(&self) -> &str {
        "line"
    }

    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), RelayError> {
        let text = truncate_chars(text, LINE_TEXT_LIMIT);
        let body = ReplyRequest {
            reply_token,
            messages: [TextMessage { kind: "text", text }],
        };

        let response = self
            .http
            .post(self.reply_url())
            .bearer_auth(&self.config.channel_access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::ReplyDeliveryFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(RelayError::ReplyDeliveryFailed(format!(
                "LINE returned {status}: {error_body}"
            )));
        }

        debug!(chars = text.chars().count(), "[LINE] Reply delivered");
        Ok(())
    }
}

/// Cut `text` to at most `limit` characters on a char boundary.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ---------------------------------------------------------------------------
// Webhook payload
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct LineWebhook {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<LineEvent>,
}

impl LineWebhook {
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub message: Option<LineMessage>,
    #[serde(default)]
    pub source: Option<LineSource>,
    #[serde(rename = "replyToken", default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineSource {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

/// A user text message ready to relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundText {
    pub user_id: String,
    pub reply_token: String,
    pub text: String,
}

/// What the relay should do with one webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Text(InboundText),
    /// Not a text message (follow, postback, sticker, image, ...).
    Ignored { event_type: String },
    /// A text message we cannot relay because a required field is absent.
    Incomplete { reason: &'static str },
}

impl LineEvent {
    pub fn classify(self) -> InboundEvent {
        let is_text = self.event_type == "message"
            && self.message.as_ref().is_some_and(|m| m.kind == "text");
        if !is_text {
            let event_type = match &self.message {
                Some(m) if self.event_type == "message" => format!("message/{}", m.kind),
                _ => self.event_type,
            };
            return InboundEvent::Ignored { event_type };
        }

        let Some(user_id) = self.source.and_then(|s| s.user_id) else {
            return InboundEvent::Incomplete { reason: "source.userId missing" };
        };
        let Some(reply_token) = self.reply_token else {
            return InboundEvent::Incomplete { reason: "replyToken missing" };
        };
        let text = self.message.and_then(|m| m.text).unwrap_or_default();

        InboundEvent::Text(InboundText { user_id, reply_token, text })
    }
}
