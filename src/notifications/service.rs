use tracing::{info, instrument, warn};

use super::{
    entities::{
        BulkNotificationsResponse, ProviderInfoResponse, SendBulkNotificationsRequest,
        SendNotificationRequest, SendNotificationResponse, SendTopicNotificationRequest,
        SubscribeToTopicRequest, SubscribeToTopicResponse, Target, TopicNotificationResponse,
        ValidateTokenRequest, ValidateTokenResponse, present,
    },
    error::{NotificationError, Operation},
    gateway::NotificationGateway,
    normalize::{normalize, validation_probe},
    provider::ProviderHandle,
};
use crate::common::time::{now_iso8601, now_millis, token_preview};

pub struct NotificationService<G: NotificationGateway + ?Sized> {
    provider: ProviderHandle<G>,
}

impl<G: NotificationGateway + ?Sized> NotificationService<G> {
    pub fn new(provider: ProviderHandle<G>) -> Self {
        Self { provider }
    }

    pub fn is_provider_ready(&self) -> bool {
        self.provider.is_ready()
    }

    /// Fails with `NotInitialized` before any request input is looked at
    pub fn ensure_provider_ready(&self) -> Result<(), NotificationError> {
        self.provider.ready().map(|_| ())
    }

    pub fn provider_info(&self) -> Result<ProviderInfoResponse, NotificationError> {
        let gateway = self.provider.ready()?;

        Ok(ProviderInfoResponse {
            success: true,
            project_id: gateway.project_id(),
            service_account: gateway.client_email(),
            messaging_permissions: "Available".to_string(),
            timestamp: now_iso8601(),
        })
    }

    #[instrument(skip_all)]
    pub async fn send_single(
        &self,
        request: SendNotificationRequest,
    ) -> Result<SendNotificationResponse, NotificationError> {
        let gateway = self.provider.ready()?;
        let notification = request.into_notification()?;
        if let Target::Token(token) = &notification.target {
            info!(token = %token_preview(token), "Sending notification");
        }

        let message = normalize(&notification, now_millis());
        let message_id = gateway
            .send(&message)
            .await
            .map_err(NotificationError::delivery(Operation::SendNotification))?;
        info!(message_id = %message_id, "Notification sent");

        Ok(SendNotificationResponse {
            success: true,
            message_id,
            sent_at: now_iso8601(),
        })
    }

    #[instrument(skip_all)]
    pub async fn send_bulk(
        &self,
        request: SendBulkNotificationsRequest,
    ) -> Result<BulkNotificationsResponse, NotificationError> {
        let gateway = self.provider.ready()?;
        let notification = request.into_notification()?;
        let Target::Tokens(tokens) = &notification.target else {
            return Err(NotificationError::Validation(
                "Missing or invalid tokens array".to_string(),
            ));
        };

        let message = normalize(&notification, now_millis());
        let outcome = gateway
            .send_multicast(&message, tokens)
            .await
            .map_err(NotificationError::delivery(Operation::SendBulkNotifications))?;
        info!(
            "Bulk notifications sent: {}/{}",
            outcome.success_count,
            tokens.len()
        );

        Ok(BulkNotificationsResponse::new(tokens.len(), outcome))
    }

    #[instrument(skip_all)]
    pub async fn send_topic(
        &self,
        request: SendTopicNotificationRequest,
    ) -> Result<TopicNotificationResponse, NotificationError> {
        let gateway = self.provider.ready()?;
        let notification = request.into_notification()?;
        let Target::Topic(topic) = &notification.target else {
            return Err(NotificationError::missing_fields(&["topic"]));
        };

        let message = normalize(&notification, now_millis());
        let message_id = gateway
            .send(&message)
            .await
            .map_err(NotificationError::delivery(Operation::SendTopicNotification))?;
        info!(topic = %topic, message_id = %message_id, "Topic notification sent");

        Ok(TopicNotificationResponse {
            success: true,
            message_id,
            topic: topic.clone(),
            sent_at: now_iso8601(),
        })
    }

    /// Checks a token by sending it a data-only probe message.
    ///
    /// The provider has no side-effect free validation call, so a valid token
    /// receives a real (empty) data message. Provider failures are reported as
    /// `valid: false`, never as an error.
    #[instrument(skip_all)]
    pub async fn validate_token(
        &self,
        request: ValidateTokenRequest,
    ) -> Result<ValidateTokenResponse, NotificationError> {
        let gateway = self.provider.ready()?;
        let Some(token) = present(request.token) else {
            return Err(NotificationError::Validation("Token is required".to_string()));
        };

        let (valid, error) = match gateway.send(&validation_probe(&token)).await {
            Ok(_) => (true, None),
            Err(err) => {
                warn!(token = %token_preview(&token), "Token validation failed: {}", err);
                (false, Some(err.to_string()))
            }
        };

        Ok(ValidateTokenResponse {
            valid,
            token,
            error,
            checked_at: now_iso8601(),
        })
    }

    #[instrument(skip_all)]
    pub async fn subscribe_to_topic(
        &self,
        request: SubscribeToTopicRequest,
    ) -> Result<SubscribeToTopicResponse, NotificationError> {
        let gateway = self.provider.ready()?;
        let (tokens, topic) = request.into_parts()?;

        let outcome = gateway
            .subscribe_to_topic(&tokens, &topic)
            .await
            .map_err(NotificationError::delivery(Operation::SubscribeToTopic))?;
        info!(
            "Subscribed {} tokens to topic: {}",
            outcome.success_count, topic
        );

        Ok(SubscribeToTopicResponse {
            success: true,
            topic,
            success_count: outcome.success_count,
            failure_count: outcome.failure_count,
            subscribed_at: now_iso8601(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{
        entities::TokenList,
        gateway::{
            GatewayError, MockNotificationGateway, MulticastOutcome, SendOutcome,
            TopicManagementOutcome,
        },
        normalize::MessageTarget,
    };
    use chrono::DateTime;
    use serde_json::json;
    use std::sync::Arc;

    fn service(gateway: MockNotificationGateway) -> NotificationService<MockNotificationGateway> {
        NotificationService::new(ProviderHandle::Ready(Arc::new(gateway)))
    }

    fn unavailable_service() -> NotificationService<MockNotificationGateway> {
        NotificationService::new(ProviderHandle::Unavailable {
            reason: "service account not found".to_string(),
        })
    }

    fn single_request() -> SendNotificationRequest {
        SendNotificationRequest {
            token: Some("abc".to_string()),
            title: Some("Hi".to_string()),
            body: Some("There".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_send_single_success() {
        let mut gateway = MockNotificationGateway::new();
        gateway
            .expect_send()
            .once()
            .withf(|message| {
                message.target == Some(MessageTarget::Token("abc".to_string()))
                    && message.data.contains_key("timestamp")
            })
            .returning(|_| Ok("msg-1".to_string()));

        let response = service(gateway).send_single(single_request()).await.unwrap();

        assert!(response.success);
        assert_eq!(response.message_id, "msg-1");
        assert!(DateTime::parse_from_rfc3339(&response.sent_at).is_ok());
    }

    #[tokio::test]
    async fn test_send_single_missing_body_makes_no_provider_call() {
        let mut gateway = MockNotificationGateway::new();
        gateway.expect_send().never();

        let request = SendNotificationRequest {
            body: None,
            ..single_request()
        };
        let result = service(gateway).send_single(request).await;

        assert_eq!(
            result.unwrap_err(),
            NotificationError::Validation("Missing required fields: body".to_string())
        );
    }

    #[tokio::test]
    async fn test_send_single_stringifies_custom_data() {
        let mut gateway = MockNotificationGateway::new();
        gateway
            .expect_send()
            .once()
            .withf(|message| {
                message.data.get("count").map(String::as_str) == Some("3")
                    && message.data.get("flag").map(String::as_str) == Some("true")
            })
            .returning(|_| Ok("msg-1".to_string()));

        let request = SendNotificationRequest {
            data: json!({"count": 3, "flag": true}).as_object().cloned(),
            ..single_request()
        };

        assert!(service(gateway).send_single(request).await.is_ok());
    }

    #[tokio::test]
    async fn test_send_single_provider_failure_is_not_retried() {
        let mut gateway = MockNotificationGateway::new();
        gateway.expect_send().once().returning(|_| {
            Err(GatewayError::Provider {
                code: "messaging/registration-token-not-registered".to_string(),
                message: "Requested entity was not found.".to_string(),
            })
        });

        let result = service(gateway).send_single(single_request()).await;

        assert_eq!(
            result.unwrap_err(),
            NotificationError::Delivery {
                operation: Operation::SendNotification,
                code: "messaging/registration-token-not-registered".to_string(),
                message: "Requested entity was not found.".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_send_bulk_partial_failure() {
        let mut gateway = MockNotificationGateway::new();
        gateway
            .expect_send_multicast()
            .once()
            .withf(|message, tokens| {
                message.target.is_none() && tokens == ["t1".to_string(), "t2".to_string()]
            })
            .returning(|_, _| {
                Ok(MulticastOutcome::from_responses(vec![
                    SendOutcome::delivered("msg-1".to_string()),
                    SendOutcome::failed("Requested entity was not found."),
                ]))
            });

        let request = SendBulkNotificationsRequest {
            tokens: Some(vec!["t1".to_string(), "t2".to_string()]),
            title: Some("Hi".to_string()),
            body: Some("There".to_string()),
            ..Default::default()
        };
        let response = service(gateway).send_bulk(request).await.unwrap();

        assert!(response.success);
        assert_eq!(response.total_count, 2);
        assert_eq!(response.success_count, 1);
        assert_eq!(response.failure_count, 1);
        assert_eq!(response.responses[0].message_id.as_deref(), Some("msg-1"));
        assert!(!response.responses[1].success);
    }

    #[tokio::test]
    async fn test_send_bulk_empty_tokens() {
        let mut gateway = MockNotificationGateway::new();
        gateway.expect_send_multicast().never();

        let request = SendBulkNotificationsRequest {
            tokens: Some(vec![]),
            title: Some("Hi".to_string()),
            body: Some("There".to_string()),
            ..Default::default()
        };
        let result = service(gateway).send_bulk(request).await;

        assert!(matches!(result, Err(NotificationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_send_bulk_too_many_tokens_makes_no_provider_call() {
        let mut gateway = MockNotificationGateway::new();
        gateway.expect_send_multicast().never();

        let request = SendBulkNotificationsRequest {
            tokens: Some(vec!["t".to_string(); 5000]),
            title: Some("Hi".to_string()),
            body: Some("There".to_string()),
            ..Default::default()
        };
        let result = service(gateway).send_bulk(request).await;

        assert!(matches!(result, Err(NotificationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_send_topic_success() {
        let mut gateway = MockNotificationGateway::new();
        gateway
            .expect_send()
            .once()
            .withf(|message| message.target == Some(MessageTarget::Topic("news".to_string())))
            .returning(|_| Ok("projects/demo/messages/1".to_string()));

        let request = SendTopicNotificationRequest {
            topic: Some("news".to_string()),
            title: Some("Hi".to_string()),
            body: Some("There".to_string()),
            ..Default::default()
        };
        let response = service(gateway).send_topic(request).await.unwrap();

        assert_eq!(response.topic, "news");
        assert_eq!(response.message_id, "projects/demo/messages/1");
    }

    #[tokio::test]
    async fn test_send_topic_strips_topics_prefix() {
        let mut gateway = MockNotificationGateway::new();
        gateway
            .expect_send()
            .once()
            .withf(|message| message.target == Some(MessageTarget::Topic("news".to_string())))
            .returning(|_| Ok("projects/demo/messages/2".to_string()));

        let request = SendTopicNotificationRequest {
            topic: Some("/topics/news".to_string()),
            title: Some("Hi".to_string()),
            body: Some("There".to_string()),
            ..Default::default()
        };
        let response = service(gateway).send_topic(request).await.unwrap();

        assert_eq!(response.topic, "news");
    }

    #[tokio::test]
    async fn test_send_topic_invalid_name_makes_no_provider_call() {
        let mut gateway = MockNotificationGateway::new();
        gateway.expect_send().never();

        let request = SendTopicNotificationRequest {
            topic: Some("bad topic!".to_string()),
            title: Some("Hi".to_string()),
            body: Some("There".to_string()),
            ..Default::default()
        };
        let result = service(gateway).send_topic(request).await;

        assert!(matches!(result, Err(NotificationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_send_topic_missing_title_makes_no_provider_call() {
        let mut gateway = MockNotificationGateway::new();
        gateway.expect_send().never();

        let request = SendTopicNotificationRequest {
            topic: Some("news".to_string()),
            body: Some("There".to_string()),
            ..Default::default()
        };
        let result = service(gateway).send_topic(request).await;

        assert!(matches!(result, Err(NotificationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_validate_token_valid() {
        let mut gateway = MockNotificationGateway::new();
        gateway
            .expect_send()
            .once()
            .withf(|message| message.notification.is_none())
            .returning(|_| Ok("msg-1".to_string()));

        let response = service(gateway)
            .validate_token(ValidateTokenRequest {
                token: Some("abc".to_string()),
            })
            .await
            .unwrap();

        assert!(response.valid);
        assert_eq!(response.token, "abc");
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_validate_token_provider_failure_reports_invalid() {
        let mut gateway = MockNotificationGateway::new();
        gateway.expect_send().once().returning(|_| {
            Err(GatewayError::Provider {
                code: "messaging/invalid-argument".to_string(),
                message: "The registration token is not a valid FCM registration token"
                    .to_string(),
            })
        });

        let response = service(gateway)
            .validate_token(ValidateTokenRequest {
                token: Some("garbage".to_string()),
            })
            .await
            .unwrap();

        assert!(!response.valid);
        assert_eq!(
            response.error.as_deref(),
            Some("The registration token is not a valid FCM registration token")
        );
        assert!(DateTime::parse_from_rfc3339(&response.checked_at).is_ok());
    }

    #[tokio::test]
    async fn test_subscribe_single_token_is_wrapped() {
        let mut gateway = MockNotificationGateway::new();
        gateway
            .expect_subscribe_to_topic()
            .times(2)
            .withf(|tokens, topic| tokens == ["abc".to_string()] && topic == "news")
            .returning(|_, _| {
                Ok(TopicManagementOutcome {
                    success_count: 1,
                    failure_count: 0,
                })
            });

        let service = service(gateway);
        let request = SubscribeToTopicRequest {
            tokens: Some(TokenList::One("abc".to_string())),
            topic: Some("news".to_string()),
        };

        let first = service.subscribe_to_topic(request.clone()).await.unwrap();
        let second = service.subscribe_to_topic(request).await.unwrap();

        assert_eq!(first.success_count, 1);
        assert_eq!(first.success_count, second.success_count);
        assert_eq!(first.topic, "news");
    }

    #[tokio::test]
    async fn test_subscribe_missing_topic() {
        let mut gateway = MockNotificationGateway::new();
        gateway.expect_subscribe_to_topic().never();

        let request = SubscribeToTopicRequest {
            tokens: Some(TokenList::Many(vec!["abc".to_string()])),
            topic: None,
        };
        let result = service(gateway).subscribe_to_topic(request).await;

        assert_eq!(
            result.unwrap_err(),
            NotificationError::missing_fields(&["topic"])
        );
    }

    #[tokio::test]
    async fn test_subscribe_failure_is_reported_as_subscription() {
        let mut gateway = MockNotificationGateway::new();
        gateway
            .expect_subscribe_to_topic()
            .once()
            .returning(|_, _| Err(GatewayError::Transport("connection reset".to_string())));

        let request = SubscribeToTopicRequest {
            tokens: Some(TokenList::One("abc".to_string())),
            topic: Some("news".to_string()),
        };
        let result = service(gateway).subscribe_to_topic(request).await;

        assert!(matches!(
            result,
            Err(NotificationError::Delivery {
                operation: Operation::SubscribeToTopic,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_subscribe_too_many_tokens_makes_no_provider_call() {
        let mut gateway = MockNotificationGateway::new();
        gateway.expect_subscribe_to_topic().never();

        let request = SubscribeToTopicRequest {
            tokens: Some(TokenList::Many(vec!["t".to_string(); 1001])),
            topic: Some("news".to_string()),
        };
        let result = service(gateway).subscribe_to_topic(request).await;

        assert!(matches!(result, Err(NotificationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_every_operation_requires_initialized_provider() {
        let service = unavailable_service();
        let not_initialized =
            NotificationError::NotInitialized("service account not found".to_string());

        assert!(!service.is_provider_ready());
        assert_eq!(
            service.send_single(single_request()).await.unwrap_err(),
            not_initialized
        );
        assert_eq!(
            service
                .send_bulk(SendBulkNotificationsRequest::default())
                .await
                .unwrap_err(),
            not_initialized
        );
        assert_eq!(
            service
                .send_topic(SendTopicNotificationRequest::default())
                .await
                .unwrap_err(),
            not_initialized
        );
        assert_eq!(
            service
                .validate_token(ValidateTokenRequest::default())
                .await
                .unwrap_err(),
            not_initialized
        );
        assert_eq!(
            service
                .subscribe_to_topic(SubscribeToTopicRequest::default())
                .await
                .unwrap_err(),
            not_initialized
        );
        assert_eq!(service.provider_info().unwrap_err(), not_initialized);
        assert_eq!(service.ensure_provider_ready().unwrap_err(), not_initialized);
    }

    #[test]
    fn test_provider_info_reports_project() {
        let mut gateway = MockNotificationGateway::new();
        gateway
            .expect_project_id()
            .returning(|| "demo-project".to_string());
        gateway
            .expect_client_email()
            .returning(|| "firebase-adminsdk@demo-project.iam.gserviceaccount.com".to_string());

        let info = service(gateway).provider_info().unwrap();

        assert!(info.success);
        assert_eq!(info.project_id, "demo-project");
        assert_eq!(
            info.service_account,
            "firebase-adminsdk@demo-project.iam.gserviceaccount.com"
        );
        assert_eq!(info.messaging_permissions, "Available");
    }
}
