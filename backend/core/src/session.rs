use serde::{Deserialize, Serialize};

/// A bot-backend conversation bound to one LINE user for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSession {
    pub conversation_id: String,
    /// Bearer credential scoped to this conversation.
    pub session_token: String,
    /// Streaming endpoint issued with the conversation. Polling never uses it.
    pub stream_url: Option<String>,
    /// Cursor of the last activity already seen. `None` until a poll returns one.
    pub watermark: Option<String>,
}

impl ConversationSession {
    pub fn new(conversation_id: impl Into<String>, session_token: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            session_token: session_token.into(),
            stream_url: None,
            watermark: None,
        }
    }

    pub fn with_stream_url(mut self, stream_url: impl Into<String>) -> Self {
        self.stream_url = Some(stream_url.into());
        self
    }

    /// Move the watermark to `next`. Returns whether the stored value changed.
    ///
    /// The watermark never moves backwards: a missing or empty `next` is ignored, and
    /// when both values are numeric a lower `next` is ignored too. Non-numeric
    /// watermarks are opaque and simply replace the stored one.
    pub fn advance_watermark(&mut self, next: Option<&str>) -> bool {
        let Some(next) = next.filter(|w| !w.is_empty()) else {
            return false;
        };

        if let Some(current) = self.watermark.as_deref() {
            if current == next {
                return false;
            }
            if let (Ok(cur), Ok(new)) = (current.parse::<u64>(), next.parse::<u64>()) {
                if new < cur {
                    return false;
                }
            }
        }

        self.watermark = Some(next.to_string());
        true
    }

    /// Watermark value as sent on the poll query string (empty before the first poll).
    pub fn watermark_param(&self) -> &str {
        self.watermark.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_watermark_is_taken() {
        let mut s = ConversationSession::new("c1", "t1");
        assert_eq!(s.watermark_param(), "");
        assert!(s.advance_watermark(Some("3")));
        assert_eq!(s.watermark.as_deref(), Some("3"));
    }

    #[test]
    fn watermark_never_decreases() {
        let mut s = ConversationSession::new("c1", "t1");
        s.advance_watermark(Some("7"));
        assert!(!s.advance_watermark(Some("4")));
        assert!(!s.advance_watermark(None));
        assert!(!s.advance_watermark(Some("")));
        assert_eq!(s.watermark.as_deref(), Some("7"));
        assert!(s.advance_watermark(Some("12")));
        assert_eq!(s.watermark.as_deref(), Some("12"));
    }

    #[test]
    fn opaque_watermark_replaces() {
        let mut s = ConversationSession::new("c1", "t1");
        s.advance_watermark(Some("abc"));
        assert!(s.advance_watermark(Some("abd")));
        assert_eq!(s.watermark_param(), "abd");
    }

    #[test]
    fn serializes_camel_case() {
        let s = ConversationSession::new("c1", "t1").with_stream_url("wss://x");
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["conversationId"], "c1");
        assert_eq!(v["sessionToken"], "t1");
        assert_eq!(v["streamUrl"], "wss://x");
    }
}
