use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use super::gateway::GatewayError;
use crate::common::extract::PayloadRejection;

/// Provider-backed operation a delivery failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SendNotification,
    SendBulkNotifications,
    SendTopicNotification,
    SubscribeToTopic,
}

impl Operation {
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::SendNotification => "Failed to send notification",
            Operation::SendBulkNotifications => "Failed to send bulk notifications",
            Operation::SendTopicNotification => "Failed to send topic notification",
            Operation::SubscribeToTopic => "Failed to subscribe to topic",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum NotificationError {
    #[error("{0}")]
    Validation(String),

    #[error("Notification provider not initialized: {0}")]
    NotInitialized(String),

    #[error("{} ({code}): {message}", .operation.failure_message())]
    Delivery {
        operation: Operation,
        code: String,
        message: String,
    },
}

impl NotificationError {
    /// Validation error naming every missing field
    pub fn missing_fields(fields: &[&str]) -> Self {
        NotificationError::Validation(format!("Missing required fields: {}", fields.join(", ")))
    }

    /// Wraps a gateway failure of `operation`, keeping the provider code and message
    pub fn delivery(operation: Operation) -> impl FnOnce(GatewayError) -> Self {
        move |err| NotificationError::Delivery {
            operation,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<PayloadRejection> for NotificationError {
    fn from(rejection: PayloadRejection) -> Self {
        NotificationError::Validation(rejection.message)
    }
}

/// Uniform error body returned by every endpoint
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl IntoResponse for NotificationError {
    fn into_response(self) -> Response {
        error!("{}", self);
        let (status, body) = match self {
            NotificationError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: message,
                    details: None,
                    error_code: None,
                },
            ),
            NotificationError::NotInitialized(reason) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Notification provider not initialized".to_string(),
                    details: Some(reason),
                    error_code: None,
                },
            ),
            NotificationError::Delivery {
                operation,
                code,
                message,
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: operation.failure_message().to_string(),
                    details: Some(message),
                    error_code: Some(code),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}
