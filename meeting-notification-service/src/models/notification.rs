use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Delivery priority hint forwarded to the push provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PushPriority {
    High,
    Normal,
}

impl std::fmt::Display for PushPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushPriority::High => write!(f, "high"),
            PushPriority::Normal => write!(f, "normal"),
        }
    }
}

/// Payload of a `sendMeetingNotification` call.
///
/// Missing, `null` and non-string fields deserialize as empty strings so
/// that they are reported through validation as a failed result instead of
/// a protocol error.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NotificationRequest {
    #[serde(rename = "token", default, deserialize_with = "string_or_empty")]
    #[validate(length(min = 1, message = "token is required"))]
    pub device_token: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    #[validate(length(min = 1, message = "body is required"))]
    pub body: String,
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(value) => Ok(value),
        _ => Ok(String::new()),
    }
}

impl NotificationRequest {
    pub fn new(
        device_token: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            device_token: device_token.into(),
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Outcome of a dispatch. Serialized as
/// `{"success": bool, "response"?: string, "error"?: string}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationResult {
    pub success: bool,
    #[serde(rename = "response", skip_serializing_if = "Option::is_none")]
    pub provider_response: Option<String>,
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl NotificationResult {
    pub fn sent(provider_response: impl Into<String>) -> Self {
        Self {
            success: true,
            provider_response: Some(provider_response.into()),
            error_message: None,
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            provider_response: None,
            error_message: Some(error_message.into()),
        }
    }
}

/// Shortened device token for log lines.
pub fn token_preview(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{}***", prefix)
}
