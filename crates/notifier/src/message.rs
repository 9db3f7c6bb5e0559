//! FCM HTTP v1 message model.
//!
//! Field names follow the v1 `Message` resource so a [`PushMessage`]
//! serializes straight into the request body.

use std::collections::BTreeMap;

use serde::Serialize;

/// A push message without an address; the gateway adds the token or topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PushMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    /// FCM data values must be strings
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<ApnsConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AndroidPriority {
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationPriority {
    #[serde(rename = "PRIORITY_DEFAULT")]
    Default,
    #[serde(rename = "PRIORITY_HIGH")]
    High,
    #[serde(rename = "PRIORITY_MAX")]
    Max,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AndroidConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<AndroidPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<AndroidNotification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AndroidNotification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_priority: Option<NotificationPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_vibrate_timings: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_sound: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApnsConfig {
    pub payload: ApnsPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApnsPayload {
    pub aps: Aps,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<u32>,
    /// 1 wakes the app for background delivery
    #[serde(rename = "content-available", skip_serializing_if = "Option::is_none")]
    pub content_available: Option<u8>,
}

/// Where a single v1 request is addressed.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Target<'a> {
    Token(&'a str),
    Topic(&'a str),
}

#[derive(Debug, Serialize)]
pub(crate) struct AddressedMessage<'a> {
    #[serde(flatten)]
    pub target: Target<'a>,
    #[serde(flatten)]
    pub message: &'a PushMessage,
}

/// Body of `POST /v1/projects/{project}/messages:send`.
#[derive(Debug, Serialize)]
pub(crate) struct SendRequest<'a> {
    pub message: AddressedMessage<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_addressed_message_body() {
        let message = PushMessage {
            notification: Some(Notification {
                title: "Hi".to_string(),
                body: "There".to_string(),
            }),
            data: BTreeMap::from([("type".to_string(), "x".to_string())]),
            android: Some(AndroidConfig {
                priority: Some(AndroidPriority::High),
                notification: Some(AndroidNotification {
                    notification_priority: Some(NotificationPriority::Max),
                    ..Default::default()
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
        };

        let body = SendRequest {
            message: AddressedMessage {
                target: Target::Token("tok-1"),
                message: &message,
            },
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "message": {
                    "token": "tok-1",
                    "notification": { "title": "Hi", "body": "There" },
                    "data": { "type": "x" },
                    "android": {
                        "priority": "HIGH",
                        "notification": { "notification_priority": "PRIORITY_MAX" }
                    },
                    "apns": {
                        "payload": {
                            "aps": { "sound": "default", "badge": 1, "content-available": 1 }
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_topic_target_omits_empty_sections() {
        let message = PushMessage::default();
        let body = SendRequest {
            message: AddressedMessage {
                target: Target::Topic("user_42"),
                message: &message,
            },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "message": { "topic": "user_42" } })
        );
    }
}
