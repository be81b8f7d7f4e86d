use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    notifications::{
        gateway::{
            GatewayError, NotificationGateway,
            dummy::DummyNotificationGateway,
            fcm::{FcmNotificationGateway, ServiceAccountKey},
        },
        provider::ProviderHandle,
    },
    settings::ProviderSettings,
};

/// Creates the provider client once at startup.
///
/// Failures do not abort the process: the handle is marked unavailable and
/// provider-backed requests report the reason.
pub fn initialize_provider(settings: &ProviderSettings) -> ProviderHandle<dyn NotificationGateway> {
    match create_gateway(settings) {
        Ok(gateway) => {
            info!(
                "Notification provider initialized for project {}",
                gateway.project_id()
            );
            ProviderHandle::Ready(gateway)
        }
        Err(err) => {
            error!("Failed to initialize notification provider: {}", err);
            ProviderHandle::Unavailable {
                reason: err.to_string(),
            }
        }
    }
}

fn create_gateway(
    settings: &ProviderSettings,
) -> Result<Arc<dyn NotificationGateway>, GatewayError> {
    match settings {
        ProviderSettings::Fcm {
            service_account_json,
            service_account_path,
            fcm_endpoint,
            iid_endpoint,
        } => {
            let credentials = match service_account_json.as_deref() {
                Some(json) if !json.trim().is_empty() => ServiceAccountKey::from_json(json)?,
                _ => ServiceAccountKey::from_file(service_account_path)?,
            };
            let gateway = FcmNotificationGateway::new(credentials, fcm_endpoint, iid_endpoint)?;
            Ok(Arc::new(gateway))
        }
        ProviderSettings::Dummy => {
            warn!("Using dummy notification provider, messages are logged and not delivered");
            Ok(Arc::new(DummyNotificationGateway::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DEFAULT_FCM_ENDPOINT, DEFAULT_IID_ENDPOINT};
    use serde_json::json;

    fn fcm_settings(service_account_json: Option<String>) -> ProviderSettings {
        ProviderSettings::Fcm {
            service_account_json,
            service_account_path: "/nonexistent/service-account-key.json".to_string(),
            fcm_endpoint: DEFAULT_FCM_ENDPOINT.to_string(),
            iid_endpoint: DEFAULT_IID_ENDPOINT.to_string(),
        }
    }

    #[test]
    fn test_dummy_provider_is_ready() {
        let handle = initialize_provider(&ProviderSettings::Dummy);

        assert!(handle.is_ready());
        assert_eq!(handle.ready().unwrap().project_id(), "dummy-project");
    }

    #[test]
    fn test_missing_service_account_file_leaves_provider_unavailable() {
        let handle = initialize_provider(&fcm_settings(None));

        match handle {
            ProviderHandle::Unavailable { reason } => {
                assert!(reason.contains("/nonexistent/service-account-key.json"))
            }
            ProviderHandle::Ready(_) => panic!("provider should be unavailable"),
        }
    }

    #[test]
    fn test_inline_service_account_takes_precedence() {
        let inline = json!({
            "project_id": "demo-project",
            "private_key": "not a pem",
            "client_email": "firebase-adminsdk@demo-project.iam.gserviceaccount.com"
        })
        .to_string();

        let handle = initialize_provider(&fcm_settings(Some(inline)));

        match handle {
            ProviderHandle::Unavailable { reason } => {
                assert!(reason.contains("Failed to parse private key"))
            }
            ProviderHandle::Ready(_) => panic!("provider should be unavailable"),
        }
    }
}
