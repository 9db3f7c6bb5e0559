//! Push payloads for blood request responses.
//!
//! Direct sends carry per-send `timestamp` and `notification_id` data and
//! full Android/APNs hints; the topic fallback carries the shared subset.

use std::collections::BTreeMap;

use donorlink_common::types::{BLOOD_REQUEST_RESPONSE, NotificationRecord};
use donorlink_notifier::message::{
    AndroidConfig, AndroidNotification, AndroidPriority, ApnsConfig, ApnsPayload, Aps,
    Notification, NotificationPriority, PushMessage,
};

pub const DEFAULT_TITLE: &str = "Blood Donation Request Response";
pub const ANDROID_CHANNEL_ID: &str = "blood_donation_high_importance";
const ANDROID_ICON: &str = "ic_stat_blooddrop";
const ANDROID_COLOR: &str = "#E53935";
const CLICK_ACTION: &str = "FLUTTER_NOTIFICATION_CLICK";
/// Stands in for a missing responder name in the default body.
const UNKNOWN_RESPONDER: &str = "A donor";

/// Topic a user's devices subscribe to when no tokens are on file.
pub fn user_topic(user_id: &str) -> String {
    format!("user_{}", user_id)
}

/// Message for a batch of device tokens. `sent_at_ms` becomes the
/// `timestamp` data field.
pub fn direct_message(record: &NotificationRecord, sent_at_ms: i64) -> PushMessage {
    let mut data = base_data(record);
    data.insert("timestamp".to_string(), sent_at_ms.to_string());
    data.insert("notification_id".to_string(), record.id.clone());

    PushMessage {
        notification: Some(notification(record)),
        data,
        android: Some(AndroidConfig {
            priority: Some(AndroidPriority::High),
            notification: Some(AndroidNotification {
                channel_id: Some(ANDROID_CHANNEL_ID.to_string()),
                icon: Some(ANDROID_ICON.to_string()),
                color: Some(ANDROID_COLOR.to_string()),
                sound: None,
                notification_priority: Some(NotificationPriority::Max),
                default_vibrate_timings: Some(true),
                default_sound: Some(true),
            }),
        }),
        apns: Some(ApnsConfig {
            payload: ApnsPayload {
                aps: Aps {
                    sound: Some("default".to_string()),
                    badge: Some(1),
                    content_available: Some(1),
                },
            },
        }),
    }
}

/// Message for the `user_<id>` topic fallback.
pub fn topic_message(record: &NotificationRecord) -> PushMessage {
    PushMessage {
        notification: Some(notification(record)),
        data: base_data(record),
        android: Some(AndroidConfig {
            priority: Some(AndroidPriority::High),
            notification: Some(AndroidNotification {
                sound: Some("default".to_string()),
                notification_priority: Some(NotificationPriority::Max),
                ..Default::default()
            }),
        }),
        apns: Some(ApnsConfig {
            payload: ApnsPayload {
                aps: Aps {
                    sound: Some("default".to_string()),
                    badge: Some(1),
                    content_available: None,
                },
            },
        }),
    }
}

fn notification(record: &NotificationRecord) -> Notification {
    let title = non_empty(&record.title)
        .unwrap_or(DEFAULT_TITLE)
        .to_string();
    let body = match non_empty(&record.body) {
        Some(body) => body.to_string(),
        None => format!(
            "{} has responded to your blood request",
            non_empty(&record.responder_name).unwrap_or(UNKNOWN_RESPONDER)
        ),
    };

    Notification { title, body }
}

fn base_data(record: &NotificationRecord) -> BTreeMap<String, String> {
    let field = |value: &Option<String>| value.clone().unwrap_or_default();

    BTreeMap::from([
        ("type".to_string(), BLOOD_REQUEST_RESPONSE.to_string()),
        ("requestId".to_string(), field(&record.request_id)),
        ("responderName".to_string(), field(&record.responder_name)),
        ("responderPhone".to_string(), field(&record.responder_phone)),
        ("bloodType".to_string(), field(&record.blood_type)),
        ("responderId".to_string(), field(&record.responder_id)),
        ("click_action".to_string(), CLICK_ACTION.to_string()),
    ])
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
