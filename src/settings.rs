use config::{
    Config, ConfigBuilder, ConfigError, Environment, File, Source, builder::DefaultState,
};
use serde::Deserialize;

const ENV_PREFIX: &str = "PUSH_GATEWAY";

/// Unprefixed variables of earlier deployments and the keys they set.
/// They override every other source.
const LEGACY_ENV_KEYS: [(&str, &str); 3] = [
    ("FIREBASE_SERVICE_ACCOUNT_JSON", "provider.service_account_json"),
    ("FIREBASE_SERVICE_ACCOUNT_PATH", "provider.service_account"),
    ("PORT", "webserver.port"),
];

pub const DEFAULT_SERVICE_ACCOUNT_PATH: &str = "firebase-setup/service-account-key.json";
pub const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com";
pub const DEFAULT_IID_ENDPOINT: &str = "https://iid.googleapis.com";

#[derive(Debug, Clone, Deserialize)]
pub struct WebserverSettings {
    pub host: String,
    pub port: u16,
    /// Directory served as a fallback for the browser test page
    pub public_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
pub enum ProviderSettings {
    Fcm {
        /// Service account key as inline JSON, preferred over the path
        service_account_json: Option<String>,
        #[serde(rename = "service_account")]
        service_account_path: String,
        fcm_endpoint: String,
        iid_endpoint: String,
    },
    Dummy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub webserver: WebserverSettings,
    pub provider: ProviderSettings,
}

impl Settings {
    pub fn load() -> Result<Settings, ConfigError> {
        Self::build(File::with_name("settings").required(false), |var| {
            std::env::var(var).ok()
        })
    }

    #[cfg(test)]
    pub fn load_from_path(
        path: impl AsRef<std::path::Path>,
        legacy_env: impl Fn(&str) -> Option<String>,
    ) -> Result<Settings, ConfigError> {
        Self::build(File::from(path.as_ref()), legacy_env)
    }

    fn build<S>(
        file: S,
        legacy_env: impl Fn(&str) -> Option<String>,
    ) -> Result<Settings, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        let mut builder = Self::with_defaults()?.add_source(file).add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );
        for (var, key) in LEGACY_ENV_KEYS {
            let value = legacy_env(var).filter(|value| !value.is_empty());
            builder = builder.set_override_option(key, value)?;
        }

        builder.build()?.try_deserialize()
    }

    fn with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("webserver.host", "0.0.0.0")?
            .set_default("webserver.port", 3002)?
            .set_default("webserver.public_dir", "public")?
            .set_default("provider.type", "fcm")?
            .set_default("provider.service_account", DEFAULT_SERVICE_ACCOUNT_PATH)?
            .set_default("provider.fcm_endpoint", DEFAULT_FCM_ENDPOINT)?
            .set_default("provider.iid_endpoint", DEFAULT_IID_ENDPOINT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_settings(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}.toml", name, uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let path = write_settings("defaults", "");
        let settings = Settings::load_from_path(&path, |_| None).unwrap();

        assert_eq!(settings.webserver.host, "0.0.0.0");
        assert_eq!(settings.webserver.port, 3002);
        assert_eq!(settings.webserver.public_dir.as_deref(), Some("public"));
        match settings.provider {
            ProviderSettings::Fcm {
                service_account_json,
                service_account_path,
                fcm_endpoint,
                iid_endpoint,
            } => {
                assert!(service_account_json.is_none());
                assert_eq!(service_account_path, DEFAULT_SERVICE_ACCOUNT_PATH);
                assert_eq!(fcm_endpoint, DEFAULT_FCM_ENDPOINT);
                assert_eq!(iid_endpoint, DEFAULT_IID_ENDPOINT);
            }
            ProviderSettings::Dummy => panic!("expected fcm provider"),
        }
    }

    #[test]
    fn test_dummy_provider_from_file() {
        let path = write_settings(
            "dummy",
            r#"
            [webserver]
            port = 8080

            [provider]
            type = "dummy"
            "#,
        );
        let settings = Settings::load_from_path(&path, |_| None).unwrap();

        assert_eq!(settings.webserver.port, 8080);
        assert!(matches!(settings.provider, ProviderSettings::Dummy));
    }

    #[test]
    fn test_legacy_environment_variables() {
        let path = write_settings(
            "legacy",
            r#"
            [webserver]
            port = 8080
            "#,
        );
        let settings = Settings::load_from_path(&path, |var| match var {
            "FIREBASE_SERVICE_ACCOUNT_JSON" => Some(r#"{"project_id": "demo"}"#.to_string()),
            "FIREBASE_SERVICE_ACCOUNT_PATH" => Some("/etc/firebase/key.json".to_string()),
            "PORT" => Some("4000".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(settings.webserver.port, 4000);
        match settings.provider {
            ProviderSettings::Fcm {
                service_account_json,
                service_account_path,
                ..
            } => {
                assert_eq!(
                    service_account_json.as_deref(),
                    Some(r#"{"project_id": "demo"}"#)
                );
                assert_eq!(service_account_path, "/etc/firebase/key.json");
            }
            ProviderSettings::Dummy => panic!("expected fcm provider"),
        }
    }

    #[test]
    fn test_empty_legacy_variable_is_ignored() {
        let path = write_settings("empty-legacy", "");
        let settings = Settings::load_from_path(&path, |var| {
            (var == "PORT").then(String::new)
        })
        .unwrap();

        assert_eq!(settings.webserver.port, 3002);
    }
}
