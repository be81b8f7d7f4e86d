use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures::{StreamExt, stream};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use parking_lot::Mutex;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, instrument};

use super::{
    GatewayError, MulticastOutcome, NotificationGateway, SendOutcome, TopicManagementOutcome,
};
use crate::notifications::normalize::{NormalizedMessage, TOPIC_PREFIX, topic_name};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const OAUTH_SCOPES: &str = "https://www.googleapis.com/auth/firebase.messaging https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
/// Deliveries of one multicast in flight at the same time
const MULTICAST_CONCURRENCY: usize = 50;

/// Google service account key, as downloaded from the Firebase console
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, GatewayError> {
        serde_json::from_str(json).map_err(|err| {
            GatewayError::InitializationFailed(format!("Invalid service account JSON: {}", err))
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GatewayError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|err| {
            GatewayError::InitializationFailed(format!(
                "Failed to read service account file {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        Self::from_json(&contents)
    }
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: i64,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    message: &'a NormalizedMessage,
}

#[derive(Deserialize)]
struct SendResponse {
    name: String,
}

#[derive(Serialize)]
struct BatchAddRequest<'a> {
    to: String,
    registration_tokens: &'a [String],
}

#[derive(Deserialize)]
struct BatchAddResponse {
    #[serde(default)]
    results: Vec<BatchAddResult>,
}

#[derive(Deserialize)]
struct BatchAddResult {
    error: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
    status: Option<String>,
    #[serde(default)]
    details: Vec<Value>,
}

/// Firebase Cloud Messaging gateway speaking the HTTP v1 API
pub struct FcmNotificationGateway {
    credentials: ServiceAccountKey,
    encoding_key: EncodingKey,
    fcm_endpoint: String,
    iid_endpoint: String,
    http_client: reqwest::Client,
    token_cache: Mutex<Option<CachedToken>>,
    /// Held while a new access token is fetched
    refresh_lock: AsyncMutex<()>,
}

impl FcmNotificationGateway {
    pub fn new(
        credentials: ServiceAccountKey,
        fcm_endpoint: &str,
        iid_endpoint: &str,
    ) -> Result<Self, GatewayError> {
        let encoding_key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
            .map_err(|err| {
                GatewayError::InitializationFailed(format!("Failed to parse private key: {}", err))
            })?;

        Ok(FcmNotificationGateway {
            credentials,
            encoding_key,
            fcm_endpoint: fcm_endpoint.trim_end_matches('/').to_string(),
            iid_endpoint: iid_endpoint.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
            token_cache: Mutex::new(None),
            refresh_lock: AsyncMutex::new(()),
        })
    }

    /// OAuth2 access token for the service account, refreshed shortly before expiry.
    ///
    /// Concurrent callers that find the cache cold wait for a single fetch.
    async fn access_token(&self) -> Result<String, GatewayError> {
        if let Some(access_token) = self.cached_token() {
            return Ok(access_token);
        }

        let _refresh = self.refresh_lock.lock().await;
        if let Some(access_token) = self.cached_token() {
            return Ok(access_token);
        }

        let token = self.fetch_access_token().await?;
        *self.token_cache.lock() = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Utc::now().timestamp() + token.expires_in,
        });

        Ok(token.access_token)
    }

    fn cached_token(&self) -> Option<String> {
        let now = Utc::now().timestamp();
        self.token_cache
            .lock()
            .as_ref()
            .filter(|cached| cached.expires_at > now + TOKEN_REFRESH_MARGIN_SECS)
            .map(|cached| cached.access_token.clone())
    }

    async fn fetch_access_token(&self) -> Result<GoogleTokenResponse, GatewayError> {
        debug!("Requesting OAuth2 access token from {}", self.credentials.token_uri);
        let issued_at = Utc::now();
        let claims = JwtClaims {
            iss: &self.credentials.client_email,
            scope: OAUTH_SCOPES,
            aud: &self.credentials.token_uri,
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::hours(1)).timestamp(),
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.credentials.private_key_id.clone();

        let assertion = encode(&header, &claims, &self.encoding_key)
            .map_err(|err| GatewayError::Authentication(format!("Failed to sign JWT: {}", err)))?;

        let response = self
            .http_client
            .post(&self.credentials.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Authentication(format!(
                "Token request failed with status {}: {}",
                status, body
            )));
        }

        response.json().await.map_err(|err| {
            GatewayError::Authentication(format!("Failed to parse token response: {}", err))
        })
    }

    async fn send_with_token(
        &self,
        access_token: &str,
        message: &NormalizedMessage,
    ) -> Result<String, GatewayError> {
        let url = format!(
            "{}/v1/projects/{}/messages:send",
            self.fcm_endpoint, self.credentials.project_id
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .json(&SendRequest { message })
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_error(status, &body));
        }

        let sent: SendResponse = response
            .json()
            .await
            .map_err(|err| GatewayError::Transport(format!("Failed to parse FCM response: {}", err)))?;
        Ok(sent.name)
    }
}

#[async_trait]
impl NotificationGateway for FcmNotificationGateway {
    fn project_id(&self) -> String {
        self.credentials.project_id.clone()
    }

    fn client_email(&self) -> String {
        self.credentials.client_email.clone()
    }

    #[instrument(skip_all)]
    async fn send(&self, message: &NormalizedMessage) -> Result<String, GatewayError> {
        let access_token = self.access_token().await?;
        let message_id = self.send_with_token(&access_token, message).await?;
        debug!("FCM response: {}", message_id);
        Ok(message_id)
    }

    #[instrument(skip_all, fields(tokens = tokens.len()))]
    async fn send_multicast(
        &self,
        message: &NormalizedMessage,
        tokens: &[String],
    ) -> Result<MulticastOutcome, GatewayError> {
        let access_token = self.access_token().await?;

        let requests: Vec<_> = tokens
            .iter()
            .map(|token| {
                let addressed = message.addressed_to(token);
                let access_token = access_token.as_str();
                async move {
                    match self.send_with_token(access_token, &addressed).await {
                        Ok(message_id) => SendOutcome::delivered(message_id),
                        Err(err) => SendOutcome::failed(err.to_string()),
                    }
                }
            })
            .collect();

        let responses = stream::iter(requests)
            .buffered(MULTICAST_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        Ok(MulticastOutcome::from_responses(responses))
    }

    #[instrument(skip(self, tokens), fields(tokens = tokens.len()))]
    async fn subscribe_to_topic(
        &self,
        tokens: &[String],
        topic: &str,
    ) -> Result<TopicManagementOutcome, GatewayError> {
        let topic = topic_path(topic)?;
        let access_token = self.access_token().await?;

        let response = self
            .http_client
            .post(format!("{}/iid/v1:batchAdd", self.iid_endpoint))
            .bearer_auth(&access_token)
            .header("access_token_auth", "true")
            .json(&BatchAddRequest {
                to: topic,
                registration_tokens: tokens,
            })
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_error(status, &body));
        }

        let batch: BatchAddResponse = response.json().await.map_err(|err| {
            GatewayError::Transport(format!("Failed to parse topic management response: {}", err))
        })?;
        let failure_count = batch
            .results
            .iter()
            .filter(|result| result.error.is_some())
            .count();

        Ok(TopicManagementOutcome {
            success_count: batch.results.len() - failure_count,
            failure_count,
        })
    }
}

/// Adds the `/topics/` prefix and rejects names the provider would refuse
fn topic_path(topic: &str) -> Result<String, GatewayError> {
    let name = topic_name(topic).ok_or_else(|| GatewayError::Provider {
        code: "messaging/invalid-argument".to_string(),
        message: format!("Topic provided to topic management has an invalid format: {}", topic),
    })?;
    Ok(format!("{}{}", TOPIC_PREFIX, name))
}

/// Maps an FCM error response onto a `messaging/*` code, keeping the provider message
fn provider_error(status: StatusCode, body: &str) -> GatewayError {
    let parsed = serde_json::from_str::<ApiErrorBody>(body).ok().map(|body| body.error);

    let fcm_code = parsed.as_ref().and_then(|error| {
        error.details.iter().find_map(|detail| {
            let is_fcm_error = detail
                .get("@type")
                .and_then(Value::as_str)
                .is_some_and(|kind| kind.ends_with("google.firebase.fcm.v1.FcmError"));
            if is_fcm_error {
                detail.get("errorCode").and_then(Value::as_str)
            } else {
                None
            }
        })
    });
    let code = fcm_code
        .or_else(|| parsed.as_ref().and_then(|error| error.status.as_deref()))
        .map(messaging_code)
        .unwrap_or("messaging/unknown-error");

    let message = parsed
        .and_then(|error| error.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            if body.is_empty() {
                format!("Unexpected response from FCM: {}", status)
            } else {
                body.to_string()
            }
        });

    GatewayError::Provider {
        code: code.to_string(),
        message,
    }
}

fn messaging_code(code: &str) -> &'static str {
    match code {
        "INVALID_ARGUMENT" => "messaging/invalid-argument",
        "UNREGISTERED" | "NOT_FOUND" => "messaging/registration-token-not-registered",
        "SENDER_ID_MISMATCH" => "messaging/mismatched-credential",
        "QUOTA_EXCEEDED" | "RESOURCE_EXHAUSTED" => "messaging/message-rate-exceeded",
        "THIRD_PARTY_AUTH_ERROR" | "APNS_AUTH_ERROR" => "messaging/third-party-auth-error",
        "UNAVAILABLE" => "messaging/server-unavailable",
        "INTERNAL" => "messaging/internal-error",
        "PERMISSION_DENIED" => "messaging/insufficient-permission",
        "UNAUTHENTICATED" => "messaging/authentication-error",
        _ => "messaging/unknown-error",
    }
}
