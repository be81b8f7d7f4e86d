use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTokenRequest {
    pub token: Option<String>,
    pub platform: Option<String>,
    pub user_id: Option<String>,
    pub app_name: Option<String>,
    pub timestamp: Option<String>,
}

/// Device token as reported by a client app
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRegistration {
    pub token: String,
    pub platform: Option<String>,
    pub user_id: Option<String>,
    pub app_name: Option<String>,
    /// Client-reported registration time, kept as sent
    pub timestamp: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTokenResponse {
    pub success: bool,
    pub message: String,
    pub token_length: usize,
    pub registered_at: String,
}
