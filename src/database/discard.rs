use async_trait::async_trait;
use tracing::debug;

use crate::{
    common::time::token_preview,
    tokens::{
        database::{TokenDatabase, TokenDatabaseError},
        entities::TokenRegistration,
    },
};

/// Token store that keeps nothing. Swap in a real backend to persist registrations.
pub struct DiscardingTokenDatabase;

#[async_trait]
impl TokenDatabase for DiscardingTokenDatabase {
    async fn store_registration(
        &self,
        registration: &TokenRegistration,
    ) -> Result<(), TokenDatabaseError> {
        debug!(
            "Discarding registration for token {}",
            token_preview(&registration.token)
        );
        Ok(())
    }
}
