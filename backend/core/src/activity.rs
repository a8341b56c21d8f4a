//! Direct Line activity wire types.
//!
//! Only the fields the relay reads are modelled; everything else in the payload is
//! ignored on decode.

use serde::{Deserialize, Serialize};

/// Role string the backend puts on activities authored by the bot.
pub const BOT_ROLE: &str = "bot";

/// Text used when a bot activity only carries attachments we cannot render as text.
pub const ATTACHMENT_PLACEHOLDER: &str = "[attachment]";

/// Participant reference on an activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentContent {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default)]
    pub content_type: Option<String>,
    /// Card payloads are objects; plain media attachments may carry anything else here.
    #[serde(default, deserialize_with = "lenient_content")]
    pub content: Option<AttachmentContent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub from: Option<ChannelAccount>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Activity {
    pub fn is_from_bot(&self) -> bool {
        self.from
            .as_ref()
            .and_then(|f| f.role.as_deref())
            .is_some_and(|role| role == BOT_ROLE)
    }

    /// Text a user can read for this activity, if any.
    ///
    /// Prefers the activity text. Otherwise the first attachment's `content.text`,
    /// then its `content.title`, then [`ATTACHMENT_PLACEHOLDER`]. Activities with
    /// neither text nor attachments (typing indicators, events) yield `None`.
    pub fn usable_text(&self) -> Option<String> {
        if let Some(text) = non_blank(self.text.as_deref()) {
            return Some(text.to_string());
        }

        let first = self.attachments.first()?;
        let content = first.content.as_ref();
        let text = content
            .and_then(|c| non_blank(c.text.as_deref()))
            .or_else(|| content.and_then(|c| non_blank(c.title.as_deref())))
            .unwrap_or(ATTACHMENT_PLACEHOLDER);
        Some(text.to_string())
    }
}

/// One page of activities returned by a poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySet {
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub watermark: Option<String>,
}

impl ActivitySet {
    /// Usable bot texts in arrival order.
    pub fn bot_texts(&self) -> Vec<String> {
        self.activities
            .iter()
            .filter(|a| a.is_from_bot())
            .filter_map(Activity::usable_text)
            .collect()
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

fn lenient_content<'de, D>(deserializer: D) -> Result<Option<AttachmentContent>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}
