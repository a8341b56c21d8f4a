//! Reply poller.
//!
//! Waits for the bot's answer by polling the conversation at a fixed interval for a
//! bounded number of attempts. The transition logic lives in [`PollState::advance`]
//! so it can be checked without timers.

use std::time::Duration;

use tracing::{debug, warn};

use linerelay_core::{ActivitySet, BotBackend, ConversationSession, RelayError};

use crate::conversation_cache::SessionHandle;

/// Where a poll loop stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Polling { attempt: u32 },
    /// Bot text arrived; all usable messages of that poll joined by newlines.
    Found { text: String, attempts: u32 },
    TimedOut { attempts: u32 },
}

impl PollState {
    pub fn start() -> Self {
        Self::Polling { attempt: 0 }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Polling { .. })
    }

    /// Attempts spent so far.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Polling { attempt } => *attempt,
            Self::Found { attempts, .. } | Self::TimedOut { attempts } => *attempts,
        }
    }

    /// Apply the outcome of one poll.
    ///
    /// Every successful poll moves the session watermark, whether or not it carried
    /// bot text. A failed poll leaves the watermark alone but still uses up an
    /// attempt. Terminal states are returned unchanged.
    pub fn advance(
        self,
        outcome: Result<ActivitySet, RelayError>,
        session: &mut ConversationSession,
        max_attempts: u32,
    ) -> Self {
        let attempt = match self {
            Self::Polling { attempt } => attempt + 1,
            terminal => return terminal,
        };

        match outcome {
            Ok(set) => {
                session.advance_watermark(set.watermark.as_deref());
                let texts = set.bot_texts();
                if !texts.is_empty() {
                    return Self::Found {
                        text: texts.join("\n"),
                        attempts: attempt,
                    };
                }
            }
            Err(e) => {
                warn!(
                    conversation_id = %session.conversation_id,
                    attempt,
                    error = %e,
                    "Poll failed, counting as empty"
                );
            }
        }

        if attempt >= max_attempts {
            Self::TimedOut { attempts: attempt }
        } else {
            Self::Polling { attempt }
        }
    }
}

/// Bounded, fixed-interval polling loop.
#[derive(Debug, Clone, Copy)]
pub struct ReplyPoller {
    max_attempts: u32,
    interval: Duration,
}

impl ReplyPoller {
    /// A `max_attempts` of zero is treated as one.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until bot text shows up or the attempt budget runs out.
    ///
    /// The first poll happens one interval after the call. Always returns a terminal
    /// state, after at most `max_attempts` polls. The session lock is taken per tick,
    /// so other loops on the same conversation keep running.
    pub async fn poll(&self, backend: &dyn BotBackend, session: &SessionHandle) -> PollState {
        let mut state = PollState::start();
        while !state.is_terminal() {
            tokio::time::sleep(self.interval).await;
            let snapshot = session.lock().await.clone();
            let outcome = backend.fetch_activities(&snapshot).await;
            let mut current = session.lock().await;
            state = state.advance(outcome, &mut current, self.max_attempts);
            debug!(
                conversation_id = %current.conversation_id,
                attempts = state.attempts(),
                terminal = state.is_terminal(),
                "Poll tick"
            );
        }
        state
    }
}
