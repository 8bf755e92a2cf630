use super::{ProviderError, ProviderResponse, PushMessage, PushProvider, TokenSource};
use crate::config::FcmConfig;
use crate::models::{token_preview, PushPriority};
use crate::services::metrics::record_provider_call;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

const PROVIDER_NAME: &str = "fcm";

pub struct FcmProvider {
    config: FcmConfig,
    client: Client,
    token_source: Arc<dyn TokenSource>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FcmRequest {
    message: FcmMessage,
}

#[derive(Debug, Serialize)]
struct FcmMessage {
    token: String,
    notification: FcmNotification,
    android: FcmAndroidConfig,
    apns: FcmApnsConfig,
}

#[derive(Debug, Serialize)]
struct FcmNotification {
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct FcmAndroidConfig {
    priority: String,
}

#[derive(Debug, Serialize)]
struct FcmApnsConfig {
    headers: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct FcmResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FcmErrorEnvelope {
    error: FcmError,
}

#[derive(Debug, Deserialize)]
struct FcmError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<FcmErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct FcmErrorDetail {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

impl From<&PushMessage> for FcmRequest {
    fn from(push: &PushMessage) -> Self {
        let apns_priority = match push.priority {
            PushPriority::High => "10",
            PushPriority::Normal => "5",
        };
        let mut headers = HashMap::new();
        headers.insert("apns-priority".to_string(), apns_priority.to_string());

        FcmRequest {
            message: FcmMessage {
                token: push.device_token.clone(),
                notification: FcmNotification {
                    title: push.title.clone(),
                    body: push.body.clone(),
                },
                android: FcmAndroidConfig {
                    priority: push.priority.to_string(),
                },
                apns: FcmApnsConfig { headers },
            },
        }
    }
}

/// Map a non-2xx FCM response to a provider error.
///
/// The FCM-specific `errorCode` in `details` wins over the generic RPC
/// status; the HTTP status is the last resort.
pub(crate) fn classify_error(status: StatusCode, body: &str) -> ProviderError {
    let Ok(envelope) = serde_json::from_str::<FcmErrorEnvelope>(body) else {
        return ProviderError::SendFailed(format!(
            "FCM API returned error status {}: {}",
            status, body
        ));
    };

    let error = envelope.error;
    let code = error
        .details
        .iter()
        .find_map(|d| d.error_code.as_deref())
        .unwrap_or(error.status.as_str());
    let message = if error.message.is_empty() {
        format!("FCM API returned error status {}", status)
    } else {
        error.message.clone()
    };

    match code {
        "UNREGISTERED" | "INVALID_ARGUMENT" | "NOT_FOUND" => {
            ProviderError::InvalidRecipient(message)
        }
        "QUOTA_EXCEEDED" | "RESOURCE_EXHAUSTED" => ProviderError::RateLimited(message),
        "SENDER_ID_MISMATCH" | "THIRD_PARTY_AUTH_ERROR" | "UNAUTHENTICATED"
        | "PERMISSION_DENIED" => ProviderError::Authentication(message),
        _ => match status {
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::Authentication(message)
            }
            _ => ProviderError::SendFailed(message),
        },
    }
}

impl FcmProvider {
    pub fn new(config: FcmConfig, client: Client, token_source: Arc<dyn TokenSource>) -> Self {
        Self {
            config,
            client,
            token_source,
        }
    }

    fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.project_id
        )
    }

    async fn post_message(&self, push: &PushMessage) -> Result<ProviderResponse, ProviderError> {
        let access_token = self.token_source.access_token().await?;
        let request = FcmRequest::from(push);

        let response = self
            .client
            .post(self.send_url())
            .bearer_auth(access_token.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport("FCM request", &e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }

        let fcm_response: FcmResponse = response.json().await.map_err(|e| {
            ProviderError::SendFailed(format!("Failed to parse FCM response: {}", e))
        })?;

        Ok(ProviderResponse::new(fcm_response.name))
    }
}

#[async_trait]
impl PushProvider for FcmProvider {
    async fn send(&self, push: &PushMessage) -> Result<ProviderResponse, ProviderError> {
        if !self.config.enabled {
            return Err(ProviderError::NotEnabled(
                "FCM push provider is not enabled".to_string(),
            ));
        }

        if self.config.project_id.is_empty() {
            return Err(ProviderError::Configuration(
                "FCM project_id is not configured".to_string(),
            ));
        }

        let started = Instant::now();
        let result = self.post_message(push).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(response) => {
                record_provider_call(PROVIDER_NAME, "success", elapsed);
                tracing::info!(
                    device_token = %token_preview(&push.device_token),
                    provider_id = %response.provider_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Push notification sent via FCM"
                );
            }
            Err(e) => {
                record_provider_call(PROVIDER_NAME, e.kind(), elapsed);
                tracing::warn!(
                    device_token = %token_preview(&push.device_token),
                    error_kind = e.kind(),
                    error = %e,
                    "FCM rejected push notification"
                );
            }
        }

        result
    }

    /// Ready once an access token can be obtained. Tokens are cached, so
    /// repeated readiness checks do not hit the OAuth2 endpoint.
    async fn health_check(&self) -> Result<(), ProviderError> {
        if !self.config.enabled {
            return Ok(());
        }

        if self.config.project_id.is_empty() {
            return Err(ProviderError::Configuration(
                "FCM project_id is not configured".to_string(),
            ));
        }

        self.token_source.access_token().await.map(|_| ())
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
