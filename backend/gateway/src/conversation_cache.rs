//! Conversation cache.
//!
//! Maps a LINE user id to the Direct Line conversation opened for that user. Entries
//! are never evicted; the cache lives as long as the process.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, RwLock};

use linerelay_core::{ConversationSession, RelayError};

pub type UserId = String;

/// A cached conversation. Lock it only to copy the session out or to move its
/// watermark; never hold the guard across a backend call.
pub type SessionHandle = Arc<Mutex<ConversationSession>>;

type Slot = Arc<OnceCell<SessionHandle>>;

/// Process-wide user → conversation mapping with insert-if-absent creation.
#[derive(Clone, Default)]
pub struct ConversationCache {
    slots: Arc<RwLock<HashMap<UserId, Slot>>>,
}

impl ConversationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached conversation for `user_id`, if one has been created.
    pub async fn get(&self, user_id: &str) -> Option<SessionHandle> {
        let r = self.slots.read().await;
        r.get(user_id).and_then(|slot| slot.get().cloned())
    }

    /// Store `session` for `user_id`, replacing whatever was there.
    pub async fn put(&self, user_id: impl Into<UserId>, session: ConversationSession) -> SessionHandle {
        let handle = Arc::new(Mutex::new(session));
        let slot = Arc::new(OnceCell::new_with(Some(handle.clone())));
        let mut w = self.slots.write().await;
        w.insert(user_id.into(), slot);
        handle
    }

    /// Cached conversation for `user_id`, creating it with `create` on first contact.
    ///
    /// Concurrent callers for the same user share a single `create` call. If it fails
    /// the slot stays empty and the next caller tries again.
    pub async fn get_or_create<F, Fut>(&self, user_id: &str, create: F) -> Result<SessionHandle, RelayError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ConversationSession, RelayError>>,
    {
        let slot = self.slot(user_id).await;
        let handle = slot
            .get_or_try_init(|| async move { create().await.map(|s| Arc::new(Mutex::new(s))) })
            .await?;
        Ok(handle.clone())
    }

    /// Number of users with an established conversation.
    pub async fn len(&self) -> usize {
        let r = self.slots.read().await;
        r.values().filter(|slot| slot.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn slot(&self, user_id: &str) -> Slot {
        if let Some(slot) = self.slots.read().await.get(user_id) {
            return slot.clone();
        }
        let mut w = self.slots.write().await;
        w.entry(user_id.to_string()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn put_then_get() {
        let cache = ConversationCache::new();
        assert!(cache.get("U1").await.is_none());

        cache.put("U1", ConversationSession::new("conv-1", "token-1")).await;
        let handle = cache.get("U1").await.unwrap();
        assert_eq!(handle.lock().await.conversation_id, "conv-1");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn get_or_create_reuses_existing() {
        let cache = ConversationCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let handle = cache
                .get_or_create("U1", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(ConversationSession::new("conv-1", "token-1"))
                })
                .await
                .unwrap();
            assert_eq!(handle.lock().await.session_token, "token-1");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_first_contact_creates_once() {
        let cache = ConversationCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_create("U1", || async move {
                            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(ConversationSession::new(format!("conv-{n}"), "t"))
                        })
                        .await
                        .unwrap()
                })
            })
            .collect();

        for task in tasks {
            let handle = task.await.unwrap();
            assert_eq!(handle.lock().await.conversation_id, "conv-1");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn failed_creation_is_retried() {
        let cache = ConversationCache::new();

        let err = cache
            .get_or_create("U1", || async { Err(RelayError::backend("create_session", "down")) })
            .await;
        assert!(err.is_err());
        assert!(cache.get("U1").await.is_none());
        assert!(cache.is_empty().await);

        let handle = cache
            .get_or_create("U1", || async { Ok(ConversationSession::new("conv-2", "t")) })
            .await
            .unwrap();
        assert_eq!(handle.lock().await.conversation_id, "conv-2");
    }
}
