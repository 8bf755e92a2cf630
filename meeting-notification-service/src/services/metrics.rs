//! Metrics collection for meeting-notification-service.
//!
//! The binary installs a Prometheus recorder once at startup; until then the
//! `metrics` macros are no-ops, which keeps tests free of global state.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder.
pub fn init_metrics() -> Result<(), BuildError> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    // A concurrent initializer may have won; its handle is equivalent.
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Record the outcome of one dispatch: `sent`, `invalid` or `failed`.
pub fn record_dispatch(outcome: &'static str) {
    counter!("meeting_notifications_total", "outcome" => outcome).increment(1);
}

/// Record a provider API call and its latency.
pub fn record_provider_call(provider: &'static str, status: &'static str, elapsed: Duration) {
    counter!(
        "notification_provider_calls_total",
        "provider" => provider,
        "status" => status
    )
    .increment(1);
    histogram!(
        "notification_provider_call_duration_seconds",
        "provider" => provider
    )
    .record(elapsed.as_secs_f64());
}
