use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::{
    error::NotificationError,
    gateway::{MulticastOutcome, SendOutcome},
    normalize::topic_name,
};

/// Most tokens a single multicast may address
pub const MAX_MULTICAST_TOKENS: usize = 500;
/// Most tokens a single topic subscription may carry
pub const MAX_TOPIC_MANAGEMENT_TOKENS: usize = 1000;

/// Caller-supplied custom data, values of any JSON kind
pub type CustomData = Map<String, Value>;

/// Recipient of a send operation
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Token(String),
    Tokens(Vec<String>),
    Topic(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    pub target: Target,
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    pub sound: Option<String>,
    pub badge: Option<u32>,
    pub click_action: Option<String>,
    pub deep_link: Option<String>,
    pub web_link: Option<String>,
    pub data: CustomData,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationRequest {
    pub token: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub data: Option<CustomData>,
    pub image_url: Option<String>,
    pub sound: Option<String>,
    pub badge: Option<u32>,
    pub click_action: Option<String>,
    pub deep_link: Option<String>,
    pub web_link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendBulkNotificationsRequest {
    pub tokens: Option<Vec<String>>,
    pub title: Option<String>,
    pub body: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub data: Option<CustomData>,
    pub image_url: Option<String>,
    pub sound: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendTopicNotificationRequest {
    pub topic: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub data: Option<CustomData>,
    pub image_url: Option<String>,
    pub sound: Option<String>,
    pub deep_link: Option<String>,
    pub web_link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ValidateTokenRequest {
    pub token: Option<String>,
}

/// Either a single token or a list of tokens
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum TokenList {
    One(String),
    Many(Vec<String>),
}

impl TokenList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            TokenList::One(token) => vec![token],
            TokenList::Many(tokens) => tokens,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SubscribeToTopicRequest {
    pub tokens: Option<TokenList>,
    pub topic: Option<String>,
}

impl SendNotificationRequest {
    pub fn into_notification(self) -> Result<NotificationRequest, NotificationError> {
        let (token, title, body) = match (present(self.token), present(self.title), present(self.body))
        {
            (Some(token), Some(title), Some(body)) => (token, title, body),
            (token, title, body) => {
                return Err(missing(&[
                    ("token", token.is_none()),
                    ("title", title.is_none()),
                    ("body", body.is_none()),
                ]));
            }
        };

        Ok(NotificationRequest {
            target: Target::Token(token),
            title,
            body,
            image_url: present(self.image_url),
            sound: present(self.sound),
            badge: self.badge,
            click_action: present(self.click_action),
            deep_link: present(self.deep_link),
            web_link: present(self.web_link),
            data: self.data.unwrap_or_default(),
        })
    }
}

impl SendBulkNotificationsRequest {
    pub fn into_notification(self) -> Result<NotificationRequest, NotificationError> {
        let tokens = match self.tokens {
            Some(tokens) if !tokens.is_empty() => tokens,
            _ => {
                return Err(NotificationError::Validation(
                    "Missing or invalid tokens array".to_string(),
                ));
            }
        };
        if tokens.len() > MAX_MULTICAST_TOKENS {
            return Err(too_many_tokens(tokens.len(), MAX_MULTICAST_TOKENS));
        }

        let (title, body) = match (present(self.title), present(self.body)) {
            (Some(title), Some(body)) => (title, body),
            (title, body) => {
                return Err(missing(&[
                    ("title", title.is_none()),
                    ("body", body.is_none()),
                ]));
            }
        };

        Ok(NotificationRequest {
            target: Target::Tokens(tokens),
            title,
            body,
            image_url: present(self.image_url),
            sound: present(self.sound),
            badge: None,
            click_action: None,
            deep_link: None,
            web_link: None,
            data: self.data.unwrap_or_default(),
        })
    }
}

impl SendTopicNotificationRequest {
    pub fn into_notification(self) -> Result<NotificationRequest, NotificationError> {
        let (topic, title, body) = match (present(self.topic), present(self.title), present(self.body))
        {
            (Some(topic), Some(title), Some(body)) => (topic, title, body),
            (topic, title, body) => {
                return Err(missing(&[
                    ("topic", topic.is_none()),
                    ("title", title.is_none()),
                    ("body", body.is_none()),
                ]));
            }
        };
        let topic = valid_topic(&topic)?;

        Ok(NotificationRequest {
            target: Target::Topic(topic),
            title,
            body,
            image_url: present(self.image_url),
            sound: present(self.sound),
            badge: None,
            click_action: None,
            deep_link: present(self.deep_link),
            web_link: present(self.web_link),
            data: self.data.unwrap_or_default(),
        })
    }
}

impl SubscribeToTopicRequest {
    /// Validated token list and bare topic name
    pub fn into_parts(self) -> Result<(Vec<String>, String), NotificationError> {
        let tokens = self
            .tokens
            .map(TokenList::into_vec)
            .filter(|tokens| !tokens.is_empty());
        let (tokens, topic) = match (tokens, present(self.topic)) {
            (Some(tokens), Some(topic)) => (tokens, topic),
            (tokens, topic) => {
                return Err(missing(&[
                    ("tokens", tokens.is_none()),
                    ("topic", topic.is_none()),
                ]));
            }
        };
        if tokens.len() > MAX_TOPIC_MANAGEMENT_TOKENS {
            return Err(too_many_tokens(tokens.len(), MAX_TOPIC_MANAGEMENT_TOKENS));
        }

        Ok((tokens, valid_topic(&topic)?))
    }
}

/// Treats empty strings like absent values
pub fn present(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn missing(fields: &[(&str, bool)]) -> NotificationError {
    let names = fields
        .iter()
        .filter(|(_, is_missing)| *is_missing)
        .map(|(name, _)| *name)
        .collect::<Vec<_>>();
    NotificationError::missing_fields(&names)
}

fn too_many_tokens(count: usize, limit: usize) -> NotificationError {
    NotificationError::Validation(format!(
        "Too many tokens: {} provided, at most {} allowed per request",
        count, limit
    ))
}

fn valid_topic(topic: &str) -> Result<String, NotificationError> {
    topic_name(topic).map(str::to_string).ok_or_else(|| {
        NotificationError::Validation(format!(
            "Invalid topic name \"{}\": must match [a-zA-Z0-9-_.~%]+",
            topic
        ))
    })
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationResponse {
    pub success: bool,
    pub message_id: String,
    pub sent_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkNotificationsResponse {
    pub success: bool,
    pub total_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub responses: Vec<SendOutcome>,
}

impl BulkNotificationsResponse {
    pub fn new(total_count: usize, outcome: MulticastOutcome) -> Self {
        Self {
            success: true,
            total_count,
            success_count: outcome.success_count,
            failure_count: outcome.failure_count,
            responses: outcome.responses,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopicNotificationResponse {
    pub success: bool,
    pub message_id: String,
    pub topic: String,
    pub sent_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTokenResponse {
    pub valid: bool,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeToTopicResponse {
    pub success: bool,
    pub topic: String,
    pub success_count: usize,
    pub failure_count: usize,
    pub subscribed_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfoResponse {
    pub success: bool,
    pub project_id: String,
    pub service_account: String,
    pub messaging_permissions: String,
    pub timestamp: String,
}
