//! HTTP handlers for meeting-notification-service.

pub mod callable;
pub mod health;

pub use callable::{
    invalid_method, send_meeting_notification, CallableError, CallableRequest,
    CallableResponse,
};
pub use health::{health_check, metrics_endpoint, readiness_check};
