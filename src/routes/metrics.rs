//! Prometheus metrics endpoint
//!
//! Exposes relay metrics in Prometheus format for monitoring.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    // Force initialization of the lazy static
    let _ = &*PROMETHEUS_HANDLE;

    register_metrics();
}

/// Register all custom metrics
fn register_metrics() {
    metrics::describe_counter!(
        "relay_requests_total",
        "Total number of proxied requests by provider and outcome"
    );
    metrics::describe_histogram!(
        "relay_request_duration_seconds",
        "Time until the upstream response head was relayed"
    );
    metrics::describe_counter!(
        "relay_auth_decisions_total",
        "Credential resolution outcomes"
    );
    metrics::describe_counter!(
        "relay_upstream_errors_total",
        "Upstream connection, timeout and stream failures"
    );
}

/// Prometheus metrics endpoint handler
///
/// Returns metrics in Prometheus text format for scraping.
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a proxied request
pub fn record_request(provider: &str, status: &str, duration_secs: f64) {
    metrics::counter!("relay_requests_total", "provider" => provider.to_string(), "status" => status.to_string())
        .increment(1);
    metrics::histogram!("relay_request_duration_seconds", "provider" => provider.to_string())
        .record(duration_secs);
}

/// Record a credential resolution outcome
pub fn record_auth_decision(provider: &str, decision: &str) {
    metrics::counter!(
        "relay_auth_decisions_total",
        "provider" => provider.to_string(),
        "decision" => decision.to_string()
    )
    .increment(1);
}

/// Record an upstream failure
pub fn record_upstream_error(provider: &str, kind: &str) {
    metrics::counter!(
        "relay_upstream_errors_total",
        "provider" => provider.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}
