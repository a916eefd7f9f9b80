//! Common test utilities for llm-relay
//!
//! Every harness points all three native providers at a single wiremock
//! server so tests can assert on exactly what reached the upstream.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use wiremock::MockServer;

use llm_relay::{
    config::{Config, ProviderSettings},
    custom_provider::CustomProviderConfig,
    routes, AppState, UrlRewriter,
};

/// Test configuration constants
pub mod constants {
    /// Access code configured on the relay
    pub const TEST_ACCESS_CODE: &str = "test-access-code";
    /// Server-held provider keys
    pub const SERVER_OPENAI_KEY: &str = "sk-server-openai";
    pub const SERVER_GOOGLE_KEY: &str = "server-google-key";
    pub const SERVER_ANTHROPIC_KEY: &str = "sk-server-anthropic";
    /// Key carried inside custom provider configs
    pub const CUSTOM_API_KEY: &str = "sk-custom";
}

/// `Authorization` value that unlocks the server keys
pub fn access_code_auth() -> String {
    format!("Bearer nk-{}", constants::TEST_ACCESS_CODE)
}

/// Provider settings whose every URL is the mock upstream
fn mock_settings(uri: &str, api_key: &str) -> ProviderSettings {
    ProviderSettings {
        api_key: Some(api_key.to_string()),
        base_url: None,
        default_base_url: uri.to_string(),
    }
}

/// Relay configuration pointing at a mock upstream
pub fn test_config(upstream_uri: &str) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        access_code: Some(constants::TEST_ACCESS_CODE.to_string()),
        openai: mock_settings(upstream_uri, constants::SERVER_OPENAI_KEY),
        google: mock_settings(upstream_uri, constants::SERVER_GOOGLE_KEY),
        anthropic: mock_settings(upstream_uri, constants::SERVER_ANTHROPIC_KEY),
        upstream_timeout: Duration::from_secs(10),
        json_logs: false,
    }
}

/// Encoded `x-custom-provider-config` blob
pub fn custom_config_blob(provider_type: &str, endpoint: Option<&str>, enabled: bool) -> String {
    CustomProviderConfig {
        id: "custom_test".to_string(),
        provider_type: provider_type.to_string(),
        endpoint: endpoint.map(str::to_string),
        api_key: constants::CUSTOM_API_KEY.to_string(),
        enabled,
    }
    .encode()
    .expect("Failed to encode custom provider config")
}

/// Relay server wired to a mock upstream
///
/// # Example
///
/// ```ignore
/// let harness = RelayTestHarness::new().await;
///
/// Mock::given(method("POST"))
///     .and(path("/v1/chat/completions"))
///     .respond_with(ResponseTemplate::new(200))
///     .mount(&harness.upstream)
///     .await;
///
/// let response = harness.server
///     .post("/api/openai/v1/chat/completions")
///     .add_header(header::AUTHORIZATION, "Bearer sk-client".parse().unwrap())
///     .await;
/// ```
pub struct RelayTestHarness {
    pub server: TestServer,
    pub upstream: MockServer,
}

impl RelayTestHarness {
    /// Create a harness with the default test configuration
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a harness after adjusting the test configuration
    pub async fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        let upstream = MockServer::start().await;

        let mut config = test_config(&upstream.uri());
        customize(&mut config);

        let state = Arc::new(AppState::new(config).expect("Failed to create app state"));
        let server = TestServer::new(routes::create_router(state))
            .expect("Failed to create test server");

        Self { server, upstream }
    }

    /// Create a harness whose outbound URLs pass through `rewriter`
    pub async fn with_url_rewriter(rewriter: Arc<dyn UrlRewriter>) -> Self {
        let upstream = MockServer::start().await;

        let config = test_config(&upstream.uri());
        let state = Arc::new(
            AppState::with_url_rewriter(config, rewriter).expect("Failed to create app state"),
        );
        let server = TestServer::new(routes::create_router(state))
            .expect("Failed to create test server");

        Self { server, upstream }
    }

    /// Requests the mock upstream has seen so far
    pub async fn upstream_requests(&self) -> Vec<wiremock::Request> {
        self.upstream
            .received_requests()
            .await
            .expect("Request recording is enabled by default")
    }
}
