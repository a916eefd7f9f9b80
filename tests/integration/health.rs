//! Health endpoint integration tests
//!
//! Tests for the health check endpoints:
//! - GET /health - Status, version, uptime and server-keyed providers
//! - GET /health/live - Liveness probe

use serde_json::Value;

use crate::common::RelayTestHarness;

#[tokio::test]
async fn test_health_endpoint() {
    let harness = RelayTestHarness::with_config(|config| config.google.api_key = None).await;

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime_seconds"].is_u64());
    assert!(body["timestamp"].is_string());
    assert_eq!(
        body["server_providers"],
        serde_json::json!(["openai", "anthropic"])
    );
}

#[tokio::test]
async fn test_liveness_endpoint() {
    let harness = RelayTestHarness::new().await;

    let response = harness.server.get("/health/live").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}
