#![allow(dead_code)]

use meeting_notification_service::config::{FcmConfig, NotificationConfig};
use meeting_notification_service::services::PushProvider;
use meeting_notification_service::startup::Application;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;

pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/test_service_account_key.pem");

pub fn test_config() -> NotificationConfig {
    NotificationConfig {
        common: CoreConfig {
            port: 0,
            ..CoreConfig::default()
        },
        fcm: FcmConfig::default(),
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
}

impl TestApp {
    pub async fn spawn(provider: Arc<dyn PushProvider>) -> Self {
        let app = Application::with_provider(test_config(), provider)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp { address, port }
    }

    pub async fn call(&self, body: serde_json::Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/sendMeetingNotification", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}
