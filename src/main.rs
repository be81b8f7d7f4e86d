mod common;
mod context;
mod database;
mod health;
mod initialization;
mod notifications;
mod settings;
mod tokens;
mod webserver;

use context::AppContext;
use settings::Settings;
use std::error::Error;
use tokio::spawn;
use tracing::{debug, error, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load()?;
    let context = AppContext::from_settings(&settings);

    if !context.notification_service.is_provider_ready() {
        warn!("Notification provider not initialized, only token registration is available");
    }

    let webserver_task_handle = spawn(async move {
        debug!("starting webserver");
        if let Err(e) = webserver::start(&settings.webserver, context).await {
            error!("Error occurred while running webserver: {:?}", e);
        }
    });

    webserver_task_handle.await?;

    Ok(())
}
