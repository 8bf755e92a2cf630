//! Application startup and lifecycle management.
//!
//! The push provider and its HTTP client are built once here and shared
//! read-only by every request.

use crate::config::{FcmConfig, NotificationConfig};
use crate::handlers::{
    health_check, invalid_method, metrics_endpoint, readiness_check, send_meeting_notification,
};
use crate::services::{
    build_http_client, FcmProvider, MockPushProvider, NotificationDispatcher, PushProvider,
    ServiceAccountKey, ServiceAccountTokenSource, StaticTokenSource, TokenSource,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: NotificationConfig,
    pub dispatcher: NotificationDispatcher,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/sendMeetingNotification",
            post(send_meeting_notification).fallback(invalid_method),
        )
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_endpoint))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Choose the push provider for this process.
///
/// FCM needs either a service account key file or a pre-issued access token.
/// With FCM disabled, the mock provider answers every call successfully.
pub fn build_push_provider(fcm: &FcmConfig) -> Result<Arc<dyn PushProvider>, AppError> {
    if !fcm.enabled {
        tracing::info!("FCM provider disabled, using mock push provider");
        return Ok(Arc::new(MockPushProvider::new(true)));
    }

    let config_error = |e: crate::services::ProviderError| {
        tracing::error!("Failed to initialize FCM provider: {}", e);
        AppError::ConfigError(anyhow::anyhow!(e))
    };

    let client = build_http_client(fcm.request_timeout).map_err(config_error)?;
    let mut fcm = fcm.clone();

    let token_source: Arc<dyn TokenSource> = match (&fcm.credentials_path, &fcm.access_token) {
        (Some(path), _) => {
            let key = ServiceAccountKey::from_file(path).map_err(config_error)?;
            let source =
                ServiceAccountTokenSource::new(key, client.clone()).map_err(config_error)?;
            if fcm.project_id.is_empty() {
                if let Some(project_id) = source.project_id() {
                    fcm.project_id = project_id.to_string();
                }
            }
            Arc::new(source)
        }
        (None, Some(token)) => Arc::new(StaticTokenSource::new(token.clone())),
        (None, None) => {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "FCM is enabled but neither GOOGLE_APPLICATION_CREDENTIALS nor FCM_ACCESS_TOKEN is set"
            )));
        }
    };

    if fcm.project_id.is_empty() {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "FCM is enabled but no project id is configured"
        )));
    }

    tracing::info!(
        project_id = %fcm.project_id,
        timeout_secs = fcm.request_timeout.as_secs(),
        "FCM push provider initialized"
    );
    Ok(Arc::new(FcmProvider::new(fcm, client, token_source)))
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: NotificationConfig) -> Result<Self, AppError> {
        let provider = build_push_provider(&config.fcm)?;
        Self::with_provider(config, provider).await
    }

    /// Build the application around an already constructed provider.
    pub async fn with_provider(
        config: NotificationConfig,
        provider: Arc<dyn PushProvider>,
    ) -> Result<Self, AppError> {
        let state = AppState {
            config: config.clone(),
            dispatcher: NotificationDispatcher::new(provider),
        };

        // Port 0 picks a random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Meeting notification service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until the process is killed.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Run the application until `signal` resolves, letting in-flight
    /// requests finish.
    pub async fn run_with_shutdown<F>(self, signal: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = build_router(self.state);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                e
            })
    }
}
