//! `linerelay-core`: shared types for the LINE to Copilot relay.
//!
//! Holds the conversation session model, the Direct Line activity wire types, the
//! relay error taxonomy and the traits the relay drives its two remote sides through.

pub mod activity;
pub mod error;
pub mod session;
pub mod traits;

pub use activity::{
    Activity, ActivitySet, Attachment, AttachmentContent, ChannelAccount, ATTACHMENT_PLACEHOLDER,
    BOT_ROLE,
};
pub use error::RelayError;
pub use session::ConversationSession;
pub use traits::{BotBackend, ReplySink};
