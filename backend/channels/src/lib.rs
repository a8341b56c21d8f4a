//! Wire clients for the two sides of the relay: the Bot Framework Direct Line API
//! and the LINE Messaging API.

pub mod directline;
pub mod line;
pub mod mock;

pub use directline::{DirectLineClient, DirectLineConfig};
pub use line::{InboundEvent, InboundText, LineClient, LineConfig, LineEvent, LineWebhook};
