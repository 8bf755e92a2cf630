use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

pub const DEFAULT_FCM_API_BASE_URL: &str = "https://fcm.googleapis.com";
pub const DEFAULT_FCM_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub fcm: FcmConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FcmConfig {
    pub enabled: bool,
    /// Falls back to the `project_id` of the service account key when empty.
    pub project_id: String,
    /// Path to a service account key JSON file.
    pub credentials_path: Option<String>,
    /// Pre-issued OAuth2 access token, used when no key file is configured.
    pub access_token: Option<Secret<String>>,
    pub api_base_url: String,
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            project_id: String::new(),
            credentials_path: None,
            access_token: None,
            api_base_url: DEFAULT_FCM_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_FCM_REQUEST_TIMEOUT_SECS),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

impl NotificationConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";
        let fcm_enabled = parse_flag(env::var("FCM_ENABLED").ok().as_deref());

        let request_timeout_secs = match env::var("FCM_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!(
                    "FCM_REQUEST_TIMEOUT_SECS must be a whole number of seconds: {}",
                    e
                ))
            })?,
            Err(_) => DEFAULT_FCM_REQUEST_TIMEOUT_SECS,
        };

        Ok(NotificationConfig {
            common: common_config,
            fcm: FcmConfig {
                enabled: fcm_enabled,
                project_id: get_env("FCM_PROJECT_ID", Some(""), is_prod && fcm_enabled)?,
                credentials_path: env::var("GOOGLE_APPLICATION_CREDENTIALS")
                    .ok()
                    .filter(|p| !p.is_empty()),
                access_token: env::var("FCM_ACCESS_TOKEN")
                    .ok()
                    .filter(|t| !t.is_empty())
                    .map(Secret::new),
                api_base_url: env::var("FCM_API_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_FCM_API_BASE_URL.to_string()),
                request_timeout: Duration::from_secs(request_timeout_secs),
            },
        })
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    value
        .map(|v| v.trim().eq_ignore_ascii_case("true") || v.trim() == "1")
        .unwrap_or(false)
}

fn get_env(key: &str, default: Option<&str>, required: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if required {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
