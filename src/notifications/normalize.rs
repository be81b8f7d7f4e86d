//! Turns caller requests into the message shape the FCM HTTP v1 API expects.
//!
//! The provider only accepts a flat string-to-string `data` map, so every
//! custom value goes through [`stringify_value`] before it is sent.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::entities::{CustomData, NotificationRequest, Target};

pub const DEFAULT_SOUND: &str = "default";
pub const DEFAULT_CHANNEL_ID: &str = "default";
pub const DEFAULT_CLICK_ACTION: &str = "OPEN_APP";
pub const SINGLE_NOTIFICATION_TAG: &str = "timeless_notification";

pub const TOPIC_PREFIX: &str = "/topics/";

const HIGH_NOTIFICATION_PRIORITY: &str = "PRIORITY_HIGH";
const HIGH_MESSAGE_PRIORITY: &str = "HIGH";

/// Textual form of a custom data value.
///
/// Strings pass through, numbers and booleans use their literal text, `null`
/// becomes `"null"` and arrays or objects become their compact JSON encoding.
pub fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

pub fn stringify_data(data: &CustomData) -> BTreeMap<String, String> {
    data.iter()
        .map(|(key, value)| (key.clone(), stringify_value(value)))
        .collect()
}

/// Bare topic name, without the optional `/topics/` prefix.
///
/// Returns `None` unless the name matches `(private/)?[a-zA-Z0-9-_.~%]+`,
/// the format the provider accepts.
pub fn topic_name(topic: &str) -> Option<&str> {
    let name = topic.strip_prefix(TOPIC_PREFIX).unwrap_or(topic);
    let chars = name.strip_prefix("private/").unwrap_or(name);
    let valid = !chars.is_empty()
        && chars
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.~%".contains(c));

    valid.then_some(name)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageTarget {
    Token(String),
    Topic(String),
}

/// Provider-shaped message body, serialized as the `message` field of a send call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedMessage {
    /// Absent for multicast templates, which get a token per delivery
    #[serde(flatten)]
    pub target: Option<MessageTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationBlock>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<ApnsConfig>,
}

impl NormalizedMessage {
    /// Copy of this message addressed to a single device
    pub fn addressed_to(&self, token: &str) -> Self {
        Self {
            target: Some(MessageTarget::Token(token.to_string())),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationBlock {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AndroidConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<AndroidNotification>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AndroidNotification {
    pub sound: String,
    pub channel_id: String,
    pub notification_priority: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApnsConfig {
    pub payload: ApnsPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm_options: Option<ApnsFcmOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApnsPayload {
    pub aps: Aps,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<u32>,
    #[serde(rename = "mutable-content", skip_serializing_if = "Option::is_none")]
    pub mutable_content: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApnsFcmOptions {
    pub image: String,
}

/// Builds the message for a request, shaped by the kind of its target.
///
/// `timestamp_millis` is stamped into the data block as `timestamp`.
pub fn normalize(request: &NotificationRequest, timestamp_millis: i64) -> NormalizedMessage {
    match &request.target {
        Target::Token(token) => normalize_single(request, token, timestamp_millis),
        Target::Tokens(_) => normalize_multicast(request, timestamp_millis),
        Target::Topic(topic) => normalize_topic(request, topic, timestamp_millis),
    }
}

/// Minimal data-only message used to probe whether a token is deliverable
pub fn validation_probe(token: &str) -> NormalizedMessage {
    let data = [("test", "true"), ("validation", "token-check")]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

    NormalizedMessage {
        target: Some(MessageTarget::Token(token.to_string())),
        notification: None,
        data,
        android: Some(AndroidConfig {
            priority: Some(HIGH_MESSAGE_PRIORITY.to_string()),
            notification: None,
            data: BTreeMap::new(),
        }),
        apns: None,
    }
}

fn normalize_single(
    request: &NotificationRequest,
    token: &str,
    timestamp_millis: i64,
) -> NormalizedMessage {
    let deep_link = request.deep_link.clone().unwrap_or_default();
    let web_link = request.web_link.clone().unwrap_or_default();
    let click_action = click_action(request);
    let timestamp = timestamp_millis.to_string();

    let mut data = stringify_data(&request.data);
    data.insert("deepLink".to_string(), deep_link.clone());
    data.insert("webLink".to_string(), web_link.clone());
    data.insert("clickAction".to_string(), click_action.clone());
    data.insert("timestamp".to_string(), timestamp.clone());

    // Android reads its own data block with the snake_case action key
    let mut android_data = stringify_data(&request.data);
    android_data.insert("deepLink".to_string(), deep_link);
    android_data.insert("webLink".to_string(), web_link);
    android_data.insert("click_action".to_string(), DEFAULT_CLICK_ACTION.to_string());
    android_data.insert("timestamp".to_string(), timestamp);

    NormalizedMessage {
        target: Some(MessageTarget::Token(token.to_string())),
        notification: Some(notification_block(request)),
        data,
        android: Some(AndroidConfig {
            priority: None,
            notification: Some(android_notification(
                request,
                Some(SINGLE_NOTIFICATION_TAG.to_string()),
            )),
            data: android_data,
        }),
        apns: Some(ApnsConfig {
            payload: ApnsPayload {
                aps: Aps {
                    sound: Some(sound(request)),
                    badge: request.badge.filter(|badge| *badge > 0),
                    mutable_content: Some(1),
                    category: Some(click_action),
                },
            },
            fcm_options: request
                .image_url
                .clone()
                .map(|image| ApnsFcmOptions { image }),
        }),
    }
}

fn normalize_multicast(request: &NotificationRequest, timestamp_millis: i64) -> NormalizedMessage {
    let mut data = stringify_data(&request.data);
    data.insert("timestamp".to_string(), timestamp_millis.to_string());

    NormalizedMessage {
        target: None,
        notification: Some(notification_block(request)),
        data,
        android: Some(AndroidConfig {
            priority: None,
            notification: Some(android_notification(request, None)),
            data: BTreeMap::new(),
        }),
        apns: Some(shared_apns(request)),
    }
}

fn normalize_topic(
    request: &NotificationRequest,
    topic: &str,
    timestamp_millis: i64,
) -> NormalizedMessage {
    let mut data = stringify_data(&request.data);
    data.insert(
        "deepLink".to_string(),
        request.deep_link.clone().unwrap_or_default(),
    );
    data.insert(
        "webLink".to_string(),
        request.web_link.clone().unwrap_or_default(),
    );
    data.insert("timestamp".to_string(), timestamp_millis.to_string());

    NormalizedMessage {
        target: Some(MessageTarget::Topic(topic.to_string())),
        notification: Some(notification_block(request)),
        data,
        android: Some(AndroidConfig {
            priority: None,
            notification: Some(android_notification(request, None)),
            data: BTreeMap::new(),
        }),
        apns: Some(shared_apns(request)),
    }
}

fn notification_block(request: &NotificationRequest) -> NotificationBlock {
    NotificationBlock {
        title: request.title.clone(),
        body: request.body.clone(),
        image: request.image_url.clone(),
    }
}

fn android_notification(request: &NotificationRequest, tag: Option<String>) -> AndroidNotification {
    AndroidNotification {
        sound: sound(request),
        channel_id: DEFAULT_CHANNEL_ID.to_string(),
        notification_priority: HIGH_NOTIFICATION_PRIORITY.to_string(),
        tag,
    }
}

fn shared_apns(request: &NotificationRequest) -> ApnsConfig {
    ApnsConfig {
        payload: ApnsPayload {
            aps: Aps {
                sound: Some(sound(request)),
                badge: None,
                mutable_content: Some(1),
                category: None,
            },
        },
        fcm_options: None,
    }
}

fn sound(request: &NotificationRequest) -> String {
    request
        .sound
        .clone()
        .unwrap_or_else(|| DEFAULT_SOUND.to_string())
}

fn click_action(request: &NotificationRequest) -> String {
    request
        .click_action
        .clone()
        .unwrap_or_else(|| DEFAULT_CLICK_ACTION.to_string())
}
