//! Dispatch guard, an optional once-per-record claim in front of the dispatcher.
//!
//! The trigger delivers at least once, so a record can reach the dispatcher
//! twice. Without a guard every delivery sends pushes. With
//! [`RedisDispatchGuard`] the first claim for a record id wins for `ttl`
//! seconds and later ones are reported as duplicates.
//!
//! Uses Redis `SET NX EX` for an atomic claim with automatic expiry.

use async_trait::async_trait;
use redis::aio::ConnectionManager;

#[async_trait]
pub trait DispatchGuard: Send + Sync {
    /// `true` if this invocation may process the record.
    async fn claim(&self, notification_id: &str) -> bool;
}

/// Allows every invocation.
pub struct NoGuard;

#[async_trait]
impl DispatchGuard for NoGuard {
    async fn claim(&self, _notification_id: &str) -> bool {
        true
    }
}

/// Redis-backed once-per-record claim.
pub struct RedisDispatchGuard {
    redis: ConnectionManager,
    ttl_seconds: u64,
}

impl RedisDispatchGuard {
    pub fn new(redis: ConnectionManager, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }

    fn claim_key(notification_id: &str) -> String {
        format!("notification:dispatched:{}", notification_id)
    }
}

#[async_trait]
impl DispatchGuard for RedisDispatchGuard {
    /// Fails open: if Redis is unreachable the record is processed anyway.
    async fn claim(&self, notification_id: &str) -> bool {
        let key = Self::claim_key(notification_id);
        let mut redis = self.redis.clone();

        // Some("OK") if the key was set, None if another invocation holds it
        let result: Result<Option<String>, redis::RedisError> = redis::cmd("SET")
            .arg(&key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_seconds)
            .query_async(&mut redis)
            .await;

        match result {
            Ok(Some(_)) => true,
            Ok(None) => {
                tracing::info!(
                    notification_id,
                    ttl_seconds = self.ttl_seconds,
                    "Notification already dispatched, skipping redelivery"
                );
                false
            }
            Err(e) => {
                tracing::warn!(
                    notification_id,
                    error = %e,
                    "Dispatch claim failed, processing without dedup"
                );
                true
            }
        }
    }
}
