use axum::{Json, extract::State};
use std::sync::Arc;
use utoipa_axum::{router::OpenApiRouter, routes};

use super::{
    entities::{RegisterTokenRequest, RegisterTokenResponse},
    error::TokenError,
};
use crate::{
    common::extract::{Payload, PayloadRejection},
    context::AppContext,
    notifications::error::ErrorResponse,
};

const TOKENS_TAG: &str = "tokens";

pub fn router() -> OpenApiRouter<Arc<AppContext>> {
    OpenApiRouter::new().routes(routes!(register_token))
}

#[utoipa::path(
    post,
    path = "/register-token",
    request_body = RegisterTokenRequest,
    responses(
        (status = 200, description = "Token registration acknowledged", body = RegisterTokenResponse),
        (status = 400, description = "Token missing", body = ErrorResponse),
        (status = 500, description = "Token store failed", body = ErrorResponse)
    ),
    tag = TOKENS_TAG
)]
async fn register_token(
    State(context): State<Arc<AppContext>>,
    payload: Result<Payload<RegisterTokenRequest>, PayloadRejection>,
) -> Result<Json<RegisterTokenResponse>, TokenError> {
    let Payload(req) = payload?;
    context.token_service.register_token(req).await.map(Json)
}
