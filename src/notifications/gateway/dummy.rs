use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use super::{
    GatewayError, MulticastOutcome, NotificationGateway, SendOutcome, TopicManagementOutcome,
};
use crate::{
    common::time::token_preview,
    notifications::normalize::{MessageTarget, NormalizedMessage},
};

/// Logs messages instead of delivering them. Useful without provider credentials.
pub struct DummyNotificationGateway {
    project_id: String,
}

impl DummyNotificationGateway {
    pub fn new() -> Self {
        Self {
            project_id: "dummy-project".to_string(),
        }
    }

    fn message_id(&self) -> String {
        format!("projects/{}/messages/{}", self.project_id, Uuid::new_v4())
    }
}

impl Default for DummyNotificationGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationGateway for DummyNotificationGateway {
    fn project_id(&self) -> String {
        self.project_id.clone()
    }

    fn client_email(&self) -> String {
        format!("dummy@{}.iam.gserviceaccount.com", self.project_id)
    }

    async fn send(&self, message: &NormalizedMessage) -> Result<String, GatewayError> {
        match &message.target {
            Some(MessageTarget::Token(token)) => {
                info!("Notification to {}", token_preview(token))
            }
            Some(MessageTarget::Topic(topic)) => info!("Notification to topic {}", topic),
            None => {
                return Err(GatewayError::Provider {
                    code: "messaging/invalid-argument".to_string(),
                    message: "Message must have a token or topic".to_string(),
                });
            }
        }
        Ok(self.message_id())
    }

    async fn send_multicast(
        &self,
        message: &NormalizedMessage,
        tokens: &[String],
    ) -> Result<MulticastOutcome, GatewayError> {
        let mut responses = Vec::with_capacity(tokens.len());
        for token in tokens {
            let outcome = match self.send(&message.addressed_to(token)).await {
                Ok(message_id) => SendOutcome::delivered(message_id),
                Err(err) => SendOutcome::failed(err.to_string()),
            };
            responses.push(outcome);
        }
        Ok(MulticastOutcome::from_responses(responses))
    }

    async fn subscribe_to_topic(
        &self,
        tokens: &[String],
        topic: &str,
    ) -> Result<TopicManagementOutcome, GatewayError> {
        info!("Subscribing {} tokens to topic {}", tokens.len(), topic);
        Ok(TopicManagementOutcome {
            success_count: tokens.len(),
            failure_count: 0,
        })
    }
}
