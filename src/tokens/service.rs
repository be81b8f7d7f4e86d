use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    database::TokenDatabase,
    entities::{RegisterTokenRequest, RegisterTokenResponse, TokenRegistration},
    error::TokenError,
};
use crate::{
    common::time::{now_iso8601, token_preview},
    notifications::entities::present,
};

pub struct TokenService<D: TokenDatabase + ?Sized> {
    db: Arc<D>,
}

impl<D: TokenDatabase + ?Sized> TokenService<D> {
    pub fn new(db: Arc<D>) -> Self {
        Self { db }
    }

    /// Acknowledges a device token reported by a client app.
    ///
    /// Does not need the notification provider.
    #[instrument(skip_all)]
    pub async fn register_token(
        &self,
        request: RegisterTokenRequest,
    ) -> Result<RegisterTokenResponse, TokenError> {
        let Some(token) = present(request.token) else {
            return Err(TokenError::Validation("Token is required".to_string()));
        };

        let registration = TokenRegistration {
            token,
            platform: present(request.platform),
            user_id: present(request.user_id),
            app_name: present(request.app_name),
            timestamp: present(request.timestamp),
        };

        info!(
            token = %token_preview(&registration.token),
            platform = registration.platform.as_deref().unwrap_or("unknown"),
            user_id = registration.user_id.as_deref().unwrap_or("unknown"),
            app = registration.app_name.as_deref().unwrap_or("unknown"),
            reported_at = registration.timestamp.as_deref().unwrap_or("unknown"),
            "New device token registered"
        );

        self.db.store_registration(&registration).await?;

        Ok(RegisterTokenResponse {
            success: true,
            message: "Token registered successfully".to_string(),
            token_length: registration.token.len(),
            registered_at: now_iso8601(),
        })
    }
}
