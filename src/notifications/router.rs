use axum::{Json, extract::State};
use std::sync::Arc;
use utoipa_axum::{router::OpenApiRouter, routes};

use super::{
    entities::{
        BulkNotificationsResponse, ProviderInfoResponse, SendBulkNotificationsRequest,
        SendNotificationRequest, SendNotificationResponse, SendTopicNotificationRequest,
        SubscribeToTopicRequest, SubscribeToTopicResponse, TopicNotificationResponse,
        ValidateTokenRequest, ValidateTokenResponse,
    },
    error::{ErrorResponse, NotificationError},
};
use crate::{
    common::extract::{Payload, PayloadRejection},
    context::AppContext,
};

const NOTIFICATIONS_TAG: &str = "notifications";

pub fn router() -> OpenApiRouter<Arc<AppContext>> {
    OpenApiRouter::new()
        .routes(routes!(send_notification))
        .routes(routes!(send_bulk_notifications))
        .routes(routes!(send_topic_notification))
        .routes(routes!(validate_token))
        .routes(routes!(subscribe_to_topic))
        .routes(routes!(provider_info))
}

#[utoipa::path(
    post,
    path = "/send-notification",
    request_body = SendNotificationRequest,
    responses(
        (status = 200, description = "Notification sent", body = SendNotificationResponse),
        (status = 400, description = "Missing required fields", body = ErrorResponse),
        (status = 500, description = "Provider unavailable or delivery failed", body = ErrorResponse)
    ),
    tag = NOTIFICATIONS_TAG
)]
async fn send_notification(
    State(context): State<Arc<AppContext>>,
    payload: Result<Payload<SendNotificationRequest>, PayloadRejection>,
) -> Result<Json<SendNotificationResponse>, NotificationError> {
    context.notification_service.ensure_provider_ready()?;
    let Payload(req) = payload?;
    context.notification_service.send_single(req).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/send-bulk-notifications",
    request_body = SendBulkNotificationsRequest,
    responses(
        (status = 200, description = "Multicast finished, per-token outcomes included", body = BulkNotificationsResponse),
        (status = 400, description = "Missing tokens or required fields", body = ErrorResponse),
        (status = 500, description = "Provider unavailable or delivery failed", body = ErrorResponse)
    ),
    tag = NOTIFICATIONS_TAG
)]
async fn send_bulk_notifications(
    State(context): State<Arc<AppContext>>,
    payload: Result<Payload<SendBulkNotificationsRequest>, PayloadRejection>,
) -> Result<Json<BulkNotificationsResponse>, NotificationError> {
    context.notification_service.ensure_provider_ready()?;
    let Payload(req) = payload?;
    context.notification_service.send_bulk(req).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/send-topic-notification",
    request_body = SendTopicNotificationRequest,
    responses(
        (status = 200, description = "Topic notification sent", body = TopicNotificationResponse),
        (status = 400, description = "Missing required fields", body = ErrorResponse),
        (status = 500, description = "Provider unavailable or delivery failed", body = ErrorResponse)
    ),
    tag = NOTIFICATIONS_TAG
)]
async fn send_topic_notification(
    State(context): State<Arc<AppContext>>,
    payload: Result<Payload<SendTopicNotificationRequest>, PayloadRejection>,
) -> Result<Json<TopicNotificationResponse>, NotificationError> {
    context.notification_service.ensure_provider_ready()?;
    let Payload(req) = payload?;
    context.notification_service.send_topic(req).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/validate-token",
    request_body = ValidateTokenRequest,
    responses(
        (status = 200, description = "Token checked by sending a data-only probe", body = ValidateTokenResponse),
        (status = 400, description = "Token missing", body = ErrorResponse),
        (status = 500, description = "Provider unavailable", body = ErrorResponse)
    ),
    tag = NOTIFICATIONS_TAG
)]
async fn validate_token(
    State(context): State<Arc<AppContext>>,
    payload: Result<Payload<ValidateTokenRequest>, PayloadRejection>,
) -> Result<Json<ValidateTokenResponse>, NotificationError> {
    context.notification_service.ensure_provider_ready()?;
    let Payload(req) = payload?;
    context.notification_service.validate_token(req).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/subscribe-to-topic",
    request_body = SubscribeToTopicRequest,
    responses(
        (status = 200, description = "Tokens subscribed", body = SubscribeToTopicResponse),
        (status = 400, description = "Missing tokens or topic", body = ErrorResponse),
        (status = 500, description = "Provider unavailable or subscription failed", body = ErrorResponse)
    ),
    tag = NOTIFICATIONS_TAG
)]
async fn subscribe_to_topic(
    State(context): State<Arc<AppContext>>,
    payload: Result<Payload<SubscribeToTopicRequest>, PayloadRejection>,
) -> Result<Json<SubscribeToTopicResponse>, NotificationError> {
    context.notification_service.ensure_provider_ready()?;
    let Payload(req) = payload?;
    context
        .notification_service
        .subscribe_to_topic(req)
        .await
        .map(Json)
}

#[utoipa::path(
    get,
    path = "/firebase-info",
    responses(
        (status = 200, description = "Provider project details", body = ProviderInfoResponse),
        (status = 500, description = "Provider unavailable", body = ErrorResponse)
    ),
    tag = NOTIFICATIONS_TAG
)]
async fn provider_info(
    State(context): State<Arc<AppContext>>,
) -> Result<Json<ProviderInfoResponse>, NotificationError> {
    context.notification_service.provider_info().map(Json)
}
