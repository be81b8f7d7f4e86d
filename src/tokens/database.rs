use async_trait::async_trait;
use thiserror::Error;

use super::entities::TokenRegistration;

#[derive(Error, Debug)]
pub enum TokenDatabaseError {
    #[error("Database operation failed: {0}")]
    OperationFailed(String),
}

/// Storage backend for registered device tokens
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenDatabase: Send + Sync {
    async fn store_registration(
        &self,
        registration: &TokenRegistration,
    ) -> Result<(), TokenDatabaseError>;
}
