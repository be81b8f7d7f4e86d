pub mod dummy;
pub mod fcm;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use super::normalize::NormalizedMessage;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// The provider answered and rejected the request
    #[error("{message}")]
    Provider { code: String, message: String },

    #[error("Failed to reach provider: {0}")]
    Transport(String),

    #[error("Failed to authenticate with provider: {0}")]
    Authentication(String),

    #[error("Failed to initialize notification provider: {0}")]
    InitializationFailed(String),
}

impl GatewayError {
    /// Provider-style error code, e.g. `messaging/registration-token-not-registered`
    pub fn code(&self) -> &str {
        match self {
            GatewayError::Provider { code, .. } => code,
            GatewayError::Transport(_) => "app/network-error",
            GatewayError::Authentication(_) => "app/invalid-credential",
            GatewayError::InitializationFailed(_) => "app/invalid-credential",
        }
    }
}

/// Result of a single delivery within a multicast
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn delivered(message_id: String) -> Self {
        Self {
            success: true,
            message_id: Some(message_id),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MulticastOutcome {
    pub success_count: usize,
    pub failure_count: usize,
    /// One entry per input token, in input order
    pub responses: Vec<SendOutcome>,
}

impl MulticastOutcome {
    pub fn from_responses(responses: Vec<SendOutcome>) -> Self {
        let success_count = responses.iter().filter(|outcome| outcome.success).count();
        Self {
            success_count,
            failure_count: responses.len() - success_count,
            responses,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicManagementOutcome {
    pub success_count: usize,
    pub failure_count: usize,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Project the provider client is bound to
    fn project_id(&self) -> String;

    /// Service account the provider client authenticates as
    fn client_email(&self) -> String;

    /// Sends an addressed message and returns the provider's message id
    async fn send(&self, message: &NormalizedMessage) -> Result<String, GatewayError>;

    /// Sends `message` to every token independently. Individual failures are
    /// reported in the outcome, not as an error.
    async fn send_multicast(
        &self,
        message: &NormalizedMessage,
        tokens: &[String],
    ) -> Result<MulticastOutcome, GatewayError>;

    async fn subscribe_to_topic(
        &self,
        tokens: &[String],
        topic: &str,
    ) -> Result<TopicManagementOutcome, GatewayError>;
}
