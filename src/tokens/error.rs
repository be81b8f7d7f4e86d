use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use super::database::TokenDatabaseError;
use crate::{common::extract::PayloadRejection, notifications::error::ErrorResponse};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("{0}")]
    Validation(String),

    #[error("Failed to register token: {0}")]
    Storage(String),
}

impl From<TokenDatabaseError> for TokenError {
    fn from(err: TokenDatabaseError) -> Self {
        TokenError::Storage(err.to_string())
    }
}

impl From<PayloadRejection> for TokenError {
    fn from(rejection: PayloadRejection) -> Self {
        TokenError::Validation(rejection.message)
    }
}

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        error!("{}", self);
        let (status, body) = match self {
            TokenError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: message,
                    details: None,
                    error_code: None,
                },
            ),
            TokenError::Storage(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Failed to register token".to_string(),
                    details: Some(details),
                    error_code: None,
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}
