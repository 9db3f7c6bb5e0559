use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The only notification `type` the dispatcher acts on.
pub const BLOOD_REQUEST_RESPONSE: &str = "blood_request_response";

/// A row of the `notifications` table, created by the app backend.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: String,
    /// Insertion order, used to dispatch oldest first
    pub seq: i64,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub user_id: String,
    pub title: Option<String>,
    pub body: Option<String>,
    pub responder_name: Option<String>,
    pub responder_phone: Option<String>,
    pub blood_type: Option<String>,
    pub responder_id: Option<String>,
    pub request_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn is_blood_request_response(&self) -> bool {
        self.kind == BLOOD_REQUEST_RESPONSE
    }
}

/// A row of the `users` table, as far as push delivery cares.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    /// `NULL` means the user never touched the setting
    pub notifications_enabled: Option<bool>,
    pub device_tokens: Vec<String>,
    pub last_token_update: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Notifications are on unless explicitly disabled.
    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled != Some(false)
    }
}

/// Terminal delivery state written to `notifications.delivery_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    Delivered,
    Failed,
    Skipped,
    Error,
}

impl DeliveryState {
    /// States that carry counts and a `sentAt` stamp.
    pub fn is_send_result(&self) -> bool {
        matches!(self, DeliveryState::Delivered | DeliveryState::Failed)
    }
}

impl std::fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryState::Delivered => write!(f, "delivered"),
            DeliveryState::Failed => write!(f, "failed"),
            DeliveryState::Skipped => write!(f, "skipped"),
            DeliveryState::Error => write!(f, "error"),
        }
    }
}

/// Which send a recorded failure belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailedTarget {
    /// A single device token, truncated
    Token(String),
    /// A whole batch call, e.g. "Batch 2"
    Batch(String),
    /// The topic fallback
    Method(String),
}

/// One failed send, as stored in `deliveryStatus.errorDetails`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(flatten)]
    pub target: FailedTarget,
    pub code: String,
    pub message: String,
}

/// The value written to `notifications.delivery_status`.
///
/// `updatedAt` and `sentAt` are stamped by the database, not carried here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStatusUpdate {
    pub status: DeliveryState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_details: Vec<ErrorDetail>,
}

impl DeliveryStatusUpdate {
    /// A terminal state reached without sending anything.
    pub fn without_send(status: DeliveryState, error: impl Into<String>) -> Self {
        Self {
            status,
            success_count: None,
            failure_count: None,
            error: Some(error.into()),
            error_details: Vec::new(),
        }
    }

    /// The result of a send pass: `delivered` if anything got through.
    pub fn from_counts(success: u32, failure: u32, error_details: Vec<ErrorDetail>) -> Self {
        let status = if success > 0 {
            DeliveryState::Delivered
        } else {
            DeliveryState::Failed
        };
        Self {
            status,
            success_count: Some(success),
            failure_count: Some(failure),
            error: None,
            error_details,
        }
    }
}
