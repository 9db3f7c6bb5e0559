//! Notification dispatcher.
//!
//! For each new `blood_request_response` record:
//! 1. Load the target user and honour their opt-out
//! 2. Send to their device tokens in batches of 500, or to `user_<id>` when
//!    they have none
//! 3. Fold per-batch results into one [`DeliveryOutcome`]
//! 4. Queue removal of tokens FCM reported as dead
//! 5. Write exactly one `delivery_status` update back onto the record

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use donorlink_common::error::AppError;
use donorlink_common::types::{
    DeliveryState, DeliveryStatusUpdate, ErrorDetail, FailedTarget, NotificationRecord, UserRecord,
};
use donorlink_notifier::{
    GatewayError, MAX_MULTICAST_TOKENS, MulticastMessage, PushGateway, TopicMessage,
};

use crate::guard::{DispatchGuard, NoGuard};
use crate::payload;
use crate::pruner::TokenPruner;
use crate::status::StatusRecorder;
use crate::store::NotificationStore;

pub const USER_NOT_FOUND: &str = "User document not found";
pub const NOTIFICATIONS_DISABLED: &str = "User has disabled notifications";

/// Errors that abandon a dispatch and end it in the `error` state.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] AppError),
}

/// What happened to one incoming record.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Not a type this dispatcher handles; nothing was read or written
    Ignored,
    /// The dispatch guard saw this record before
    Duplicate,
    Completed(DispatchSummary),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSummary {
    pub status: DeliveryState,
    pub success_count: u32,
    pub failure_count: u32,
    /// Token removals handed to the pruner
    pub prunes_queued: usize,
    /// Whether the status write succeeded
    pub recorded: bool,
}

/// Aggregate of every send made for one record.
#[derive(Debug, Default)]
pub struct DeliveryOutcome {
    pub success_count: u32,
    pub failure_count: u32,
    pub error_details: Vec<ErrorDetail>,
    pub prunes_queued: usize,
}

impl DeliveryOutcome {
    fn push_error(&mut self, target: FailedTarget, err: &GatewayError) {
        self.error_details.push(ErrorDetail {
            target,
            code: err.code().to_string(),
            message: err.to_string(),
        });
    }
}

/// First ten characters of a token followed by `...`, for logs and records.
pub fn truncate_token(token: &str) -> String {
    let head: String = token.chars().take(10).collect();
    format!("{}...", head)
}

/// Dispatches push notifications for new notification records.
pub struct NotificationDispatcher {
    store: Arc<dyn NotificationStore>,
    gateway: Arc<dyn PushGateway>,
    recorder: StatusRecorder,
    pruner: TokenPruner,
    guard: Arc<dyn DispatchGuard>,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        gateway: Arc<dyn PushGateway>,
        pruner: TokenPruner,
    ) -> Self {
        Self {
            recorder: StatusRecorder::new(store.clone()),
            store,
            gateway,
            pruner,
            guard: Arc::new(NoGuard),
        }
    }

    /// Claim each record through `guard` before processing it.
    pub fn with_guard(mut self, guard: Arc<dyn DispatchGuard>) -> Self {
        self.guard = guard;
        self
    }

    /// Process one newly created record end to end.
    ///
    /// Never fails: every problem past the type filter ends up in the
    /// record's `delivery_status`.
    pub async fn dispatch(&self, record: &NotificationRecord) -> Dispatch {
        if !record.is_blood_request_response() {
            tracing::debug!(
                notification_id = %record.id,
                kind = %record.kind,
                "Skipping notification - not a blood request response"
            );
            return Dispatch::Ignored;
        }

        if !self.guard.claim(&record.id).await {
            return Dispatch::Duplicate;
        }

        tracing::info!(
            notification_id = %record.id,
            user_id = %record.user_id,
            "Processing notification"
        );

        let (update, prunes_queued) = match self.deliver(record).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    notification_id = %record.id,
                    error = %e,
                    "Unhandled error processing notification"
                );
                (
                    DeliveryStatusUpdate::without_send(DeliveryState::Error, e.to_string()),
                    0,
                )
            }
        };

        let recorded = self.recorder.record(&record.id, &update).await.is_ok();

        let summary = DispatchSummary {
            status: update.status,
            success_count: update.success_count.unwrap_or(0),
            failure_count: update.failure_count.unwrap_or(0),
            prunes_queued,
            recorded,
        };

        tracing::info!(
            notification_id = %record.id,
            status = %summary.status,
            success = summary.success_count,
            failure = summary.failure_count,
            "Notification processed"
        );

        Dispatch::Completed(summary)
    }

    async fn deliver(
        &self,
        record: &NotificationRecord,
    ) -> Result<(DeliveryStatusUpdate, usize), DispatchError> {
        let Some(user) = self.store.get_user(&record.user_id).await? else {
            tracing::error!(user_id = %record.user_id, "User document not found");
            return Ok((
                DeliveryStatusUpdate::without_send(DeliveryState::Error, USER_NOT_FOUND),
                0,
            ));
        };

        if !user.notifications_enabled() {
            tracing::info!(user_id = %user.id, "User has disabled notifications");
            return Ok((
                DeliveryStatusUpdate::without_send(DeliveryState::Skipped, NOTIFICATIONS_DISABLED),
                0,
            ));
        }

        let outcome = if user.device_tokens.is_empty() {
            tracing::info!(
                user_id = %user.id,
                "No device tokens found, trying topic notification as fallback"
            );
            self.send_to_topic(record).await
        } else {
            tracing::info!(
                user_id = %user.id,
                tokens = user.device_tokens.len(),
                "Found device tokens for user"
            );
            self.send_to_devices(record, &user).await
        };

        let prunes_queued = outcome.prunes_queued;
        let update = DeliveryStatusUpdate::from_counts(
            outcome.success_count,
            outcome.failure_count,
            outcome.error_details,
        );
        Ok((update, prunes_queued))
    }

    /// Direct mode. Batches go out one after another; a batch whose call
    /// fails outright is recorded and the next batch still runs.
    async fn send_to_devices(
        &self,
        record: &NotificationRecord,
        user: &UserRecord,
    ) -> DeliveryOutcome {
        let mut outcome = DeliveryOutcome::default();

        for (index, batch) in user.device_tokens.chunks(MAX_MULTICAST_TOKENS).enumerate() {
            let batch_number = index + 1;
            let multicast = MulticastMessage {
                tokens: batch.to_vec(),
                message: payload::direct_message(record, Utc::now().timestamp_millis()),
            };

            let response = match self.gateway.send_multicast(&multicast).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(
                        notification_id = %record.id,
                        batch = batch_number,
                        code = e.code(),
                        error = %e,
                        "Error sending batch"
                    );
                    let target = FailedTarget::Batch(format!("Batch {}", batch_number));
                    outcome.push_error(target, &e);
                    continue;
                }
            };

            outcome.success_count += response.success_count();
            outcome.failure_count += response.failure_count();

            for (token, result) in batch.iter().zip(response.responses.iter()) {
                let Err(e) = result else {
                    continue;
                };

                tracing::warn!(
                    token = %truncate_token(token),
                    code = e.code(),
                    error = %e,
                    "Error sending to token"
                );
                outcome.push_error(FailedTarget::Token(truncate_token(token)), e);

                if e.is_stale_token() && self.pruner.enqueue(&user.id, token) {
                    outcome.prunes_queued += 1;
                }
            }
        }

        outcome
    }

    /// Topic fallback. All or nothing: one success or one failure.
    async fn send_to_topic(&self, record: &NotificationRecord) -> DeliveryOutcome {
        let mut outcome = DeliveryOutcome::default();
        let topic = TopicMessage {
            topic: payload::user_topic(&record.user_id),
            message: payload::topic_message(record),
        };

        match self.gateway.send_to_topic(&topic).await {
            Ok(message_name) => {
                tracing::info!(
                    topic = %topic.topic,
                    message = %message_name,
                    "Sent topic message"
                );
                outcome.success_count = 1;
            }
            Err(e) => {
                tracing::error!(
                    topic = %topic.topic,
                    code = e.code(),
                    error = %e,
                    "Error sending topic notification"
                );
                outcome.failure_count = 1;
                outcome.push_error(FailedTarget::Method("topic".to_string()), &e);
            }
        }

        outcome
    }
}
