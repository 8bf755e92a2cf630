//! `sendMeetingNotification` over the callable-function wire protocol.
//!
//! Requests arrive as `{"data": {...}}` and successful calls answer
//! `{"result": {...}}`. A body that cannot be read as that envelope is a
//! protocol error, answered with `{"error": {"status", "message"}}`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use service_core::middleware::RequestId;
use tracing::Instrument;

use crate::models::{NotificationRequest, NotificationResult};
use crate::startup::AppState;

#[derive(Debug, Deserialize)]
pub struct CallableRequest<T> {
    pub data: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CallableResponse<T> {
    pub result: T,
}

#[derive(Debug)]
pub struct CallableError {
    http_status: StatusCode,
    status: &'static str,
    message: String,
}

impl CallableError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self {
            http_status: StatusCode::BAD_REQUEST,
            status: "INVALID_ARGUMENT",
            message: message.into(),
        }
    }
}

impl From<JsonRejection> for CallableError {
    fn from(rejection: JsonRejection) -> Self {
        CallableError::invalid_argument(format!("Bad request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for CallableError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorBody {
            status: &'static str,
            message: String,
        }

        #[derive(Serialize)]
        struct ErrorEnvelope {
            error: ErrorBody,
        }

        (
            self.http_status,
            Json(ErrorEnvelope {
                error: ErrorBody {
                    status: self.status,
                    message: self.message,
                },
            }),
        )
            .into_response()
    }
}

pub async fn send_meeting_notification(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    payload: Result<Json<CallableRequest<NotificationRequest>>, JsonRejection>,
) -> Result<Json<CallableResponse<NotificationResult>>, CallableError> {
    let request_id = request_id
        .map(|Extension(RequestId(id))| id)
        .unwrap_or_default();
    let span = tracing::info_span!("send_meeting_notification", request_id = %request_id);

    let Json(call) = payload.map_err(|rejection| {
        span.in_scope(|| {
            tracing::warn!(error = %rejection.body_text(), "Malformed callable request");
        });
        CallableError::from(rejection)
    })?;

    let result = state.dispatcher.dispatch(call.data).instrument(span).await;

    Ok(Json(CallableResponse { result }))
}

/// Callable functions only accept POST.
pub async fn invalid_method(method: Method) -> CallableError {
    tracing::warn!(%method, "Callable request with invalid method");
    CallableError::invalid_argument(format!("Request has invalid method. {}", method))
}
