use std::time::Duration;

use sqlx::PgPool;

use donorlink_common::types::NotificationRecord;
use donorlink_engine::dispatcher::{Dispatch, NotificationDispatcher};

/// Polls the `notifications` table for rows that have not been dispatched yet
/// and hands each one to the dispatcher, oldest first.
///
/// Progress is tracked per row (`claimed_at`, `dispatched_at`) rather than as
/// a position in the table: rows commit out of `seq` order, and a late commit
/// must still be picked up. A row claimed by a poller that dies before
/// marking it dispatched is claimed again once its lease expires
/// (at-least-once).
pub struct NotificationPoller {
    pool: PgPool,
    dispatcher: NotificationDispatcher,
    poll_interval: Duration,
    batch_size: i64,
    claim_lease: Duration,
}

impl NotificationPoller {
    pub fn new(
        pool: PgPool,
        dispatcher: NotificationDispatcher,
        poll_interval_ms: u64,
        batch_size: i64,
        claim_lease_secs: u64,
    ) -> Self {
        Self {
            pool,
            dispatcher,
            poll_interval: Duration::from_millis(poll_interval_ms),
            batch_size: batch_size.max(1),
            claim_lease: Duration::from_secs(claim_lease_secs),
        }
    }

    /// Start the polling loop. Runs until the task is cancelled.
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            batch_size = self.batch_size,
            claim_lease_secs = self.claim_lease.as_secs(),
            "Notification poller started"
        );

        loop {
            match self.poll_once().await {
                // A full page means there may be more waiting
                Ok(processed) if processed as i64 >= self.batch_size => continue,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Poll failed, retrying");
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Claim one page of pending records and dispatch them in `seq` order.
    /// Returns the number of records claimed.
    pub async fn poll_once(&self) -> anyhow::Result<usize> {
        let mut records = self.claim_pending().await?;
        records.sort_by_key(|record| record.seq);

        for record in &records {
            let result = self.dispatcher.dispatch(record).await;
            if let Dispatch::Completed(summary) = &result
                && !summary.recorded
            {
                tracing::warn!(
                    notification_id = %record.id,
                    status = %summary.status,
                    "Delivery status could not be recorded"
                );
            }

            // Left claimed on failure; the lease hands it out again later
            if let Err(e) = self.mark_dispatched(&record.id).await {
                tracing::warn!(
                    notification_id = %record.id,
                    error = %e,
                    "Failed to mark notification dispatched"
                );
            }
        }

        Ok(records.len())
    }

    /// Take the lease on up to `batch_size` undispatched rows. Rows locked by
    /// another poller, or under an unexpired lease, are skipped.
    async fn claim_pending(&self) -> anyhow::Result<Vec<NotificationRecord>> {
        let records: Vec<NotificationRecord> = sqlx::query_as(
            r#"
            UPDATE notifications AS n
            SET claimed_at = NOW()
            FROM (
                SELECT id
                FROM notifications
                WHERE dispatched_at IS NULL
                  AND (claimed_at IS NULL
                       OR claimed_at < NOW() - make_interval(secs => $2))
                ORDER BY seq
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            ) AS pending
            WHERE n.id = pending.id
            RETURNING n.id, n.seq, n.type, n.user_id, n.title, n.body, n.responder_name,
                      n.responder_phone, n.blood_type, n.responder_id, n.request_id,
                      n.created_at
            "#,
        )
        .bind(self.batch_size)
        .bind(self.claim_lease.as_secs_f64())
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn mark_dispatched(&self, notification_id: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE notifications SET dispatched_at = NOW() WHERE id = $1")
            .bind(notification_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
