use std::sync::Arc;

use crate::{
    database::discard::DiscardingTokenDatabase,
    initialization::initialize_provider,
    notifications::{
        gateway::NotificationGateway, provider::ProviderHandle, service::NotificationService,
    },
    settings::Settings,
    tokens::{database::TokenDatabase, service::TokenService},
};

pub struct AppContext {
    pub notification_service: NotificationService<dyn NotificationGateway>,
    pub token_service: TokenService<dyn TokenDatabase>,
}

impl AppContext {
    pub fn new(
        provider: ProviderHandle<dyn NotificationGateway>,
        token_db: Arc<dyn TokenDatabase>,
    ) -> Self {
        Self {
            notification_service: NotificationService::new(provider),
            token_service: TokenService::new(token_db),
        }
    }

    /// Creates the application context, including the provider client
    pub fn from_settings(settings: &Settings) -> Self {
        let provider = initialize_provider(&settings.provider);
        Self::new(provider, Arc::new(DiscardingTokenDatabase))
    }
}
