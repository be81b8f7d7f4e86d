use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{common::time::now_iso8601, context::AppContext};

const HEALTH_TAG: &str = "health";

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub provider_ready: bool,
    pub timestamp: String,
}

pub fn router() -> OpenApiRouter<Arc<AppContext>> {
    OpenApiRouter::new().routes(routes!(health))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    ),
    tag = HEALTH_TAG
)]
async fn health(State(context): State<Arc<AppContext>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        provider_ready: context.notification_service.is_provider_ready(),
        timestamp: now_iso8601(),
    })
}
