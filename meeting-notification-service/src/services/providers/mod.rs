pub mod fcm;
pub mod mock;
pub mod token;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::{NotificationRequest, PushPriority};

pub use fcm::FcmProvider;
pub use mock::MockPushProvider;
pub use token::{ServiceAccountKey, ServiceAccountTokenSource, StaticTokenSource, TokenSource};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider not enabled: {0}")]
    NotEnabled(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Send error: {0}")]
    SendFailed(String),
}

impl ProviderError {
    /// The provider's own description, without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            ProviderError::NotEnabled(msg)
            | ProviderError::Configuration(msg)
            | ProviderError::Authentication(msg)
            | ProviderError::Connection(msg)
            | ProviderError::Timeout(msg)
            | ProviderError::InvalidRecipient(msg)
            | ProviderError::RateLimited(msg)
            | ProviderError::SendFailed(msg) => msg,
        }
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotEnabled(_) => "not_enabled",
            ProviderError::Configuration(_) => "configuration",
            ProviderError::Authentication(_) => "authentication",
            ProviderError::Connection(_) => "connection",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::InvalidRecipient(_) => "invalid_recipient",
            ProviderError::RateLimited(_) => "rate_limited",
            ProviderError::SendFailed(_) => "send_failed",
        }
    }

    /// Classify a transport-level failure from the HTTP client.
    pub fn from_transport(context: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(format!("{} timed out: {}", context, err))
        } else {
            ProviderError::Connection(format!("{} failed: {}", context, err))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderResponse {
    /// Opaque delivery identifier assigned by the provider.
    pub provider_id: String,
}

impl ProviderResponse {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub device_token: String,
    pub title: String,
    pub body: String,
    pub priority: PushPriority,
}

impl PushMessage {
    pub fn high_priority(request: NotificationRequest) -> Self {
        Self {
            device_token: request.device_token,
            title: request.title,
            body: request.body,
            priority: PushPriority::High,
        }
    }
}

#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn send(&self, push: &PushMessage) -> Result<ProviderResponse, ProviderError>;
    async fn health_check(&self) -> Result<(), ProviderError>;
    fn is_enabled(&self) -> bool;
    fn name(&self) -> &'static str;
}

/// The one HTTP client shared by the provider and its token source.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .build()
        .map_err(|e| ProviderError::Configuration(format!("Failed to build HTTP client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_strips_kind_prefix() {
        let err = ProviderError::InvalidRecipient("invalid token".to_string());
        assert_eq!(err.message(), "invalid token");
        assert_eq!(err.to_string(), "Invalid recipient: invalid token");
        assert_eq!(err.kind(), "invalid_recipient");
    }

    #[test]
    fn push_message_is_always_high_priority() {
        let message =
            PushMessage::high_priority(NotificationRequest::new("abc123", "Meeting started", "Join now"));
        assert_eq!(message.priority, PushPriority::High);
        assert_eq!(message.device_token, "abc123");
    }
}
