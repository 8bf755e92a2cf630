//! Sends one meeting notification per call and always answers with a
//! [`NotificationResult`]. Provider faults never escape `dispatch`.

use std::sync::Arc;

use validator::{Validate, ValidationErrors};

use crate::models::{token_preview, NotificationRequest, NotificationResult};
use crate::services::metrics::record_dispatch;
use crate::services::providers::{PushMessage, PushProvider};

#[derive(Clone)]
pub struct NotificationDispatcher {
    provider: Arc<dyn PushProvider>,
}

impl NotificationDispatcher {
    pub fn new(provider: Arc<dyn PushProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn PushProvider> {
        &self.provider
    }

    #[tracing::instrument(
        skip_all,
        fields(
            provider = self.provider.name(),
            device_token = %token_preview(&request.device_token)
        )
    )]
    pub async fn dispatch(&self, request: NotificationRequest) -> NotificationResult {
        if let Err(errors) = request.validate() {
            let message = describe(&errors);
            tracing::warn!(error = %message, "Rejected meeting notification request");
            record_dispatch("invalid");
            return NotificationResult::failed(message);
        }

        let message = PushMessage::high_priority(request);

        match self.provider.send(&message).await {
            Ok(response) => {
                tracing::info!(
                    provider_id = %response.provider_id,
                    "Meeting notification sent"
                );
                record_dispatch("sent");
                NotificationResult::sent(response.provider_id)
            }
            Err(e) => {
                tracing::error!(
                    error_kind = e.kind(),
                    error = %e,
                    "Failed to send meeting notification"
                );
                record_dispatch("failed");
                NotificationResult::failed(e.message())
            }
        }
    }
}

fn describe(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .map(|e| {
            e.message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| e.code.to_string())
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PushPriority;
    use crate::services::providers::{MockPushProvider, ProviderError, ProviderResponse};
    use async_trait::async_trait;

    /// Answers with an id derived from the device token.
    struct EchoProvider;

    #[async_trait]
    impl PushProvider for EchoProvider {
        async fn send(&self, push: &PushMessage) -> Result<ProviderResponse, ProviderError> {
            tokio::task::yield_now().await;
            Ok(ProviderResponse::new(format!("msg-{}", push.device_token)))
        }

        async fn health_check(&self) -> Result<(), ProviderError> {
            Ok(())
        }

        fn is_enabled(&self) -> bool {
            true
        }

        fn name(&self) -> &'static str {
            "echo"
        }
    }

    #[tokio::test]
    async fn successful_send_reports_provider_id() {
        let provider = Arc::new(MockPushProvider::new(true));
        let dispatcher = NotificationDispatcher::new(provider.clone());

        let result = dispatcher
            .dispatch(NotificationRequest::new("abc123", "Meeting started", "Join now"))
            .await;

        assert_eq!(result, NotificationResult::sent("mock-push-1"));
        assert_eq!(provider.send_count(), 1);
    }

    #[tokio::test]
    async fn outbound_message_is_high_priority() {
        let provider = Arc::new(MockPushProvider::new(true));
        let dispatcher = NotificationDispatcher::new(provider.clone());

        dispatcher
            .dispatch(NotificationRequest::new("abc123", "Meeting started", "Join now"))
            .await;

        let sent = provider.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].priority, PushPriority::High);
        assert_eq!(sent[0].title, "Meeting started");
        assert_eq!(sent[0].body, "Join now");
    }

    #[tokio::test]
    async fn provider_error_becomes_failed_result() {
        let provider = Arc::new(MockPushProvider::rejecting(
            ProviderError::InvalidRecipient("invalid token".to_string()),
        ));
        let dispatcher = NotificationDispatcher::new(provider);

        let result = dispatcher
            .dispatch(NotificationRequest::new("invalid-token", "x", "y"))
            .await;

        assert_eq!(result, NotificationResult::failed("invalid token"));
    }

    #[tokio::test]
    async fn every_provider_error_kind_is_caught() {
        let errors = [
            ProviderError::NotEnabled("disabled".into()),
            ProviderError::Configuration("no project".into()),
            ProviderError::Authentication("bad credentials".into()),
            ProviderError::Connection("connection refused".into()),
            ProviderError::Timeout("timed out".into()),
            ProviderError::RateLimited("quota exceeded".into()),
            ProviderError::SendFailed("internal".into()),
        ];

        for error in errors {
            let expected = error.message().to_string();
            let dispatcher =
                NotificationDispatcher::new(Arc::new(MockPushProvider::rejecting(error)));

            let result = dispatcher
                .dispatch(NotificationRequest::new("abc123", "t", "b"))
                .await;

            assert!(!result.success);
            assert_eq!(result.error_message.as_deref(), Some(expected.as_str()));
            assert!(result.provider_response.is_none());
        }
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_provider() {
        let provider = Arc::new(MockPushProvider::new(true));
        let dispatcher = NotificationDispatcher::new(provider.clone());

        let result = dispatcher
            .dispatch(NotificationRequest::new("", "Meeting started", ""))
            .await;

        assert!(!result.success);
        assert_eq!(
            result.error_message.as_deref(),
            Some("body is required; token is required")
        );
        assert_eq!(provider.send_count(), 0);
    }

    #[tokio::test]
    async fn concurrent_dispatches_keep_their_own_results() {
        let dispatcher = NotificationDispatcher::new(Arc::new(EchoProvider));

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    let token = format!("device-{}", i);
                    let result = dispatcher
                        .dispatch(NotificationRequest::new(token.clone(), "Meeting", "Join"))
                        .await;
                    (token, result)
                })
            })
            .collect();

        for handle in handles {
            let (token, result) = handle.await.unwrap();
            assert_eq!(result, NotificationResult::sent(format!("msg-{}", token)));
        }
    }
}
