//! Token pruner: background removal of device tokens the gateway reported
//! as invalid or unregistered.
//!
//! The dispatcher only enqueues; a single [`PruneWorker`] applies removals
//! in order. The worker finishes once every [`TokenPruner`] handle is
//! dropped and the queue is drained, so awaiting its task is the shutdown
//! barrier for pending removals.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::dispatcher::truncate_token;
use crate::store::NotificationStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneRequest {
    pub user_id: String,
    pub token: String,
}

/// Totals reported by a drained [`PruneWorker`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PruneStats {
    pub removed: u64,
    pub failed: u64,
}

/// Cloneable handle for queueing token removals.
#[derive(Clone)]
pub struct TokenPruner {
    tx: mpsc::UnboundedSender<PruneRequest>,
}

pub struct PruneWorker {
    rx: mpsc::UnboundedReceiver<PruneRequest>,
    store: Arc<dyn NotificationStore>,
}

impl TokenPruner {
    pub fn new(store: Arc<dyn NotificationStore>) -> (Self, PruneWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, PruneWorker { rx, store })
    }

    /// Queue removal of `token` from `user_id`. Returns `false` if the worker
    /// has already stopped.
    pub fn enqueue(&self, user_id: &str, token: &str) -> bool {
        let request = PruneRequest {
            user_id: user_id.to_string(),
            token: token.to_string(),
        };

        match self.tx.send(request) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    user_id,
                    token = %truncate_token(token),
                    "Token prune queue closed, dropping removal"
                );
                false
            }
        }
    }
}

impl PruneWorker {
    pub async fn run(mut self) -> PruneStats {
        let mut stats = PruneStats::default();

        while let Some(request) = self.rx.recv().await {
            let removed =
                remove_invalid_token(self.store.as_ref(), &request.user_id, &request.token).await;
            if removed {
                stats.removed += 1;
            } else {
                stats.failed += 1;
            }
        }

        tracing::info!(
            removed = stats.removed,
            failed = stats.failed,
            "Token prune queue drained"
        );
        stats
    }
}

/// Remove one token and stamp `last_token_update`. Errors are logged and
/// reported as `false`, never propagated.
pub async fn remove_invalid_token(
    store: &dyn NotificationStore,
    user_id: &str,
    token: &str,
) -> bool {
    match store.remove_device_token(user_id, token).await {
        Ok(()) => {
            tracing::info!(
                user_id,
                token = %truncate_token(token),
                "Removed invalid token for user"
            );
            true
        }
        Err(e) => {
            tracing::error!(
                user_id,
                token = %truncate_token(token),
                error = %e,
                "Error removing invalid token"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStore, user};

    #[tokio::test]
    async fn test_worker_drains_queue_after_handles_drop() {
        let store = Arc::new(MemoryStore::default());
        store.insert_user(user("u1", &["a", "b", "c"]));

        let (pruner, worker) = TokenPruner::new(store.clone());
        let handle = tokio::spawn(worker.run());

        assert!(pruner.enqueue("u1", "b"));
        assert!(pruner.enqueue("u1", "c"));
        drop(pruner);

        let stats = handle.await.unwrap();
        assert_eq!(stats, PruneStats { removed: 2, failed: 0 });

        let stored = store.user("u1").unwrap();
        assert_eq!(stored.device_tokens, vec!["a".to_string()]);
        assert!(stored.last_token_update.is_some());
    }

    #[tokio::test]
    async fn test_absent_token_is_noop() {
        let store = Arc::new(MemoryStore::default());
        store.insert_user(user("u1", &["a"]));

        assert!(remove_invalid_token(store.as_ref(), "u1", "zzz").await);
        assert_eq!(store.user("u1").unwrap().device_tokens, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_user_counts_as_failure() {
        let store = Arc::new(MemoryStore::default());
        let (pruner, worker) = TokenPruner::new(store.clone());
        let handle = tokio::spawn(worker.run());

        pruner.enqueue("ghost", "token");
        drop(pruner);

        let stats = handle.await.unwrap();
        assert_eq!(stats, PruneStats { removed: 0, failed: 1 });
    }

    #[tokio::test]
    async fn test_enqueue_after_worker_stopped() {
        let store = Arc::new(MemoryStore::default());
        let (pruner, worker) = TokenPruner::new(store);
        drop(worker);
        assert!(!pruner.enqueue("u1", "token"));
    }
}
