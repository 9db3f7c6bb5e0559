//! Record store: the reads and writes the dispatcher makes against the
//! `users` and `notifications` tables.

use async_trait::async_trait;
use sqlx::PgPool;

use donorlink_common::error::AppError;
use donorlink_common::types::{DeliveryStatusUpdate, UserRecord};

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// `None` when no user row exists.
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, AppError>;

    /// Replace the record's `delivery_status` with `update`, stamping
    /// `updatedAt` (and `sentAt` for send results) with the database clock.
    /// Other columns of the record are left alone.
    async fn write_delivery_status(
        &self,
        notification_id: &str,
        update: &DeliveryStatusUpdate,
    ) -> Result<(), AppError>;

    /// Drop `token` from the user's token set; absent tokens are a no-op.
    async fn remove_device_token(&self, user_id: &str, token: &str) -> Result<(), AppError>;
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The stored `delivery_status` of a record. `NotFound` when the record
    /// does not exist or has not been processed yet.
    pub async fn delivery_status(
        &self,
        notification_id: &str,
    ) -> Result<serde_json::Value, AppError> {
        let row: Option<(Option<serde_json::Value>,)> =
            sqlx::query_as("SELECT delivery_status FROM notifications WHERE id = $1")
                .bind(notification_id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((Some(status),)) => Ok(status),
            Some((None,)) => Err(AppError::NotFound(format!(
                "Notification {} has no delivery status",
                notification_id
            ))),
            None => Err(AppError::NotFound(format!(
                "Notification {} not found",
                notification_id
            ))),
        }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, AppError> {
        let user: Option<UserRecord> = sqlx::query_as(
            r#"
            SELECT id, notifications_enabled, device_tokens, last_token_update
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn write_delivery_status(
        &self,
        notification_id: &str,
        update: &DeliveryStatusUpdate,
    ) -> Result<(), AppError> {
        let fields = serde_json::to_value(update)?;

        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET delivery_status = $2::jsonb
                || jsonb_build_object('updatedAt', NOW())
                || CASE WHEN $3 THEN jsonb_build_object('sentAt', NOW()) ELSE '{}'::jsonb END
            WHERE id = $1
            "#,
        )
        .bind(notification_id)
        .bind(&fields)
        .bind(update.status.is_send_result())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Notification {} not found",
                notification_id
            )));
        }

        Ok(())
    }

    async fn remove_device_token(&self, user_id: &str, token: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET device_tokens = array_remove(device_tokens, $2),
                last_token_update = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(token)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }

        Ok(())
    }
}
