use super::{ProviderError, ProviderResponse, PushMessage, PushProvider};
use crate::models::token_preview;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Mock push provider for local runs and tests.
///
/// Accepts every message unless built with [`MockPushProvider::rejecting`],
/// and keeps a copy of what it was asked to send.
pub struct MockPushProvider {
    enabled: bool,
    rejection: Option<ProviderError>,
    send_count: AtomicU64,
    sent: Mutex<Vec<PushMessage>>,
}

impl MockPushProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            rejection: None,
            send_count: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// A provider that fails every send with `error`.
    pub fn rejecting(error: ProviderError) -> Self {
        Self {
            rejection: Some(error),
            ..Self::new(true)
        }
    }

    /// Number of send attempts that reached the provider.
    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn sent_messages(&self) -> Vec<PushMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PushProvider for MockPushProvider {
    async fn send(&self, push: &PushMessage) -> Result<ProviderResponse, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotEnabled(
                "Mock push provider is not enabled".to_string(),
            ));
        }

        let n = self.send_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(push.clone());
        }

        if let Some(error) = &self.rejection {
            tracing::info!(
                device_token = %token_preview(&push.device_token),
                error = %error,
                "[MOCK] Push notification rejected"
            );
            return Err(error.clone());
        }

        tracing::info!(
            device_token = %token_preview(&push.device_token),
            priority = %push.priority,
            title = %push.title,
            "[MOCK] Push notification would be sent"
        );

        Ok(ProviderResponse::new(format!("mock-push-{}", n)))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
