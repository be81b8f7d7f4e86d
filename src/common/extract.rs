use axum::{
    Form, Json,
    extract::{FromRequest, Request},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

use crate::notifications::error::ErrorResponse;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Request body accepted either as JSON or as an urlencoded form.
///
/// Form bodies are picked by their content type, anything else is read as JSON.
#[derive(Debug)]
pub struct Payload<T>(pub T);

/// The body could not be read into the expected request type
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadRejection {
    pub message: String,
}

impl IntoResponse for PayloadRejection {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message,
            details: None,
            error_code: None,
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = PayloadRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|content_type| content_type.starts_with(FORM_CONTENT_TYPE));

        if is_form {
            let Form(value) =
                Form::<T>::from_request(req, state)
                    .await
                    .map_err(|e| PayloadRejection {
                        message: format!("Malformed request body: {}", e.body_text()),
                    })?;
            Ok(Payload(value))
        } else {
            let Json(value) =
                Json::<T>::from_request(req, state)
                    .await
                    .map_err(|e| PayloadRejection {
                        message: format!("Malformed request body: {}", e.body_text()),
                    })?;
            Ok(Payload(value))
        }
    }
}
