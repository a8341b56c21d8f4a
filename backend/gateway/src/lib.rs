//! Relay gateway: LINE webhook server, conversation cache and reply polling.
//!
//! The webhook handler acknowledges every delivery at once and hands the batch to
//! [`RelayService`], which talks to the bot backend and replies on LINE.

pub mod conversation_cache;
pub mod poller;
pub mod relay;
pub mod server;

pub use conversation_cache::{ConversationCache, SessionHandle};
pub use poller::{PollState, ReplyPoller};
pub use relay::{EventOutcome, RelayService};
pub use server::{GatewayState, HealthReport, build_router, start_server};
