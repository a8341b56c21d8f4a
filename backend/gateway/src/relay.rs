//! Relay service.
//!
//! Drives one webhook batch end to end: for every LINE text message it resolves the
//! user's conversation, forwards the text to the bot, waits for the answer and
//! replies on LINE. Batches run as detached tasks; events inside a batch run one
//! after another.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info_span, warn};
use uuid::Uuid;

use linerelay_channels::{InboundEvent, InboundText, LineEvent};
use linerelay_core::{BotBackend, RelayError, ReplySink};
use linerelay_logging::{EventLogger, RelayEvent};

use crate::conversation_cache::ConversationCache;
use crate::poller::{PollState, ReplyPoller};

/// How a relayed text message ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Replied { attempts: u32 },
    NoReply { attempts: u32 },
}

pub struct RelayService {
    cache: ConversationCache,
    backend: Arc<dyn BotBackend>,
    sink: Arc<dyn ReplySink>,
    poller: ReplyPoller,
}

impl RelayService {
    pub fn new(backend: Arc<dyn BotBackend>, sink: Arc<dyn ReplySink>, poller: ReplyPoller) -> Self {
        Self {
            cache: ConversationCache::new(),
            backend,
            sink,
            poller,
        }
    }

    pub fn cache(&self) -> &ConversationCache {
        &self.cache
    }

    /// Process `events` on a detached task and return immediately.
    pub fn dispatch(self: &Arc<Self>, events: Vec<LineEvent>) -> JoinHandle<()> {
        self.dispatch_after(events, std::future::ready(()))
    }

    /// Like [`dispatch`](Self::dispatch), but the task makes no backend call before
    /// `acked` completes.
    pub fn dispatch_after<F>(self: &Arc<Self>, events: Vec<LineEvent>, acked: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let relay = Arc::clone(self);
        let span = info_span!(
            "batch",
            batch_id = %Uuid::new_v4(),
            events = events.len(),
            backend = self.backend.name(),
            sink = self.sink.name()
        );
        tokio::spawn(
            async move {
                acked.await;
                relay.process_batch(events).await
            }
            .instrument(span),
        )
    }

    /// Relay every text event in order. Failures are logged per event and never stop
    /// the rest of the batch.
    pub async fn process_batch(&self, events: Vec<LineEvent>) {
        for event in events {
            match event.classify() {
                InboundEvent::Text(msg) => {
                    if let Err(e) = self.relay_text(&msg).await {
                        error!(user_id = %msg.user_id, stage = e.stage(), error = %e, "Relay failed for event");
                        EventLogger::log_event(
                            &msg.user_id,
                            RelayEvent::Failed {
                                stage: e.stage().to_string(),
                                error_msg: e.to_string(),
                            },
                        );
                    }
                }
                InboundEvent::Ignored { event_type } => {
                    debug!(event_type = %event_type, "Ignoring non-text event");
                }
                InboundEvent::Incomplete { reason } => {
                    warn!(reason, "Skipping text event");
                }
            }
        }
    }

    /// Forward one text message and deliver the bot's answer, if any.
    pub async fn relay_text(&self, msg: &InboundText) -> Result<EventOutcome, RelayError> {
        let backend = Arc::clone(&self.backend);
        let user_id = msg.user_id.clone();
        let handle = self
            .cache
            .get_or_create(&msg.user_id, || async move {
                let session = backend.create_session().await?;
                EventLogger::log_event(
                    &user_id,
                    RelayEvent::SessionOpened {
                        conversation_id: session.conversation_id.clone(),
                    },
                );
                Ok(session)
            })
            .await?;

        let session = handle.lock().await.clone();
        let conversation_id = session.conversation_id.clone();

        self.backend
            .send_message(&session, &msg.user_id, &msg.text)
            .await?;
        EventLogger::log_event(
            &msg.user_id,
            RelayEvent::MessageForwarded {
                conversation_id: conversation_id.clone(),
                chars: msg.text.chars().count(),
            },
        );

        let state = self.poller.poll(self.backend.as_ref(), &handle).await;

        match state {
            PollState::Found { text, attempts } => {
                self.sink.reply(&msg.reply_token, &text).await?;
                EventLogger::log_event(
                    &msg.user_id,
                    RelayEvent::ReplyDelivered {
                        conversation_id,
                        attempts,
                        chars: text.chars().count(),
                    },
                );
                Ok(EventOutcome::Replied { attempts })
            }
            other => {
                let attempts = other.attempts();
                EventLogger::log_event(
                    &msg.user_id,
                    RelayEvent::NoReply {
                        conversation_id,
                        attempts,
                    },
                );
                Ok(EventOutcome::NoReply { attempts })
            }
        }
    }
}
