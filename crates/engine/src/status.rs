use std::sync::Arc;

use donorlink_common::error::AppError;
use donorlink_common::types::DeliveryStatusUpdate;

use crate::store::NotificationStore;

/// Writes the single `delivery_status` update for a processed record.
#[derive(Clone)]
pub struct StatusRecorder {
    store: Arc<dyn NotificationStore>,
}

impl StatusRecorder {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// One write, no retry. Failures are logged and handed back.
    pub async fn record(
        &self,
        notification_id: &str,
        update: &DeliveryStatusUpdate,
    ) -> Result<(), AppError> {
        match self
            .store
            .write_delivery_status(notification_id, update)
            .await
        {
            Ok(()) => {
                tracing::debug!(
                    notification_id,
                    status = %update.status,
                    "Delivery status recorded"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    notification_id,
                    status = %update.status,
                    error = %e,
                    "Error updating notification status"
                );
                Err(e)
            }
        }
    }
}
