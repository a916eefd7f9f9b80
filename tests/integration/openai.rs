//! OpenAI route tests
//!
//! Credential resolution and response relaying are shared by every provider;
//! they are exercised here through the OpenAI route.

use std::sync::Arc;

use axum::http::{header, Method, StatusCode};
use serde_json::{json, Value};
use wiremock::matchers::{any, header as header_eq, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{access_code_auth, constants, RelayTestHarness};

#[tokio::test]
async fn test_access_code_uses_server_key() {
    let harness = RelayTestHarness::new().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header_eq(
            "authorization",
            format!("Bearer {}", constants::SERVER_OPENAI_KEY).as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "chatcmpl-1"})))
        .expect(1)
        .mount(&harness.upstream)
        .await;

    let response = harness
        .server
        .post("/api/openai/v1/chat/completions")
        .add_header(header::AUTHORIZATION, access_code_auth().parse().unwrap())
        .json(&json!({"model": "gpt-4o", "messages": []}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["id"], "chatcmpl-1");
}

#[tokio::test]
async fn test_client_key_passes_through() {
    let harness = RelayTestHarness::new().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header_eq("authorization", "Bearer sk-client"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&harness.upstream)
        .await;

    let response = harness
        .server
        .post("/api/openai/v1/chat/completions")
        .add_header(header::AUTHORIZATION, "Bearer sk-client".parse().unwrap())
        .await;

    response.assert_status_ok();

    let requests = harness.upstream_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].headers.get("cache-control").unwrap(),
        "no-store"
    );
    assert_eq!(
        requests[0].headers.get("content-type").unwrap(),
        "application/json"
    );
}

#[tokio::test]
async fn test_wrong_access_code_is_unauthorized() {
    let harness = RelayTestHarness::new().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&harness.upstream)
        .await;

    let response = harness
        .server
        .post("/api/openai/v1/chat/completions")
        .add_header(header::AUTHORIZATION, "Bearer nk-wrong".parse().unwrap())
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["message"], "Empty api key");
}

#[tokio::test]
async fn test_query_string_is_not_forwarded() {
    let harness = RelayTestHarness::new().await;

    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&harness.upstream)
        .await;

    let response = harness
        .server
        .get("/api/openai/v1/models?limit=5")
        .add_header(header::AUTHORIZATION, "Bearer sk-client".parse().unwrap())
        .await;

    response.assert_status_ok();
    let requests = harness.upstream_requests().await;
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn test_response_headers_are_sanitized() {
    let harness = RelayTestHarness::new().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("openai-organization", "org-secret")
                .insert_header("www-authenticate", "Bearer")
                .insert_header("x-request-id", "req_123")
                .set_body_string("{}"),
        )
        .mount(&harness.upstream)
        .await;

    let response = harness
        .server
        .post("/api/openai/v1/chat/completions")
        .add_header(header::AUTHORIZATION, "Bearer sk-client".parse().unwrap())
        .await;

    response.assert_status_ok();
    let headers = response.headers();
    assert!(headers.get("openai-organization").is_none());
    assert!(headers.get("www-authenticate").is_none());
    assert_eq!(headers.get("x-request-id").unwrap(), "req_123");
    assert_eq!(headers.get("x-accel-buffering").unwrap(), "no");
}

#[tokio::test]
async fn test_event_stream_is_relayed() {
    let harness = RelayTestHarness::new().await;
    let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n\n";

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse),
        )
        .mount(&harness.upstream)
        .await;

    let response = harness
        .server
        .post("/api/openai/v1/chat/completions")
        .add_header(header::AUTHORIZATION, "Bearer sk-client".parse().unwrap())
        .json(&json!({"model": "gpt-4o", "stream": true}))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    assert_eq!(response.text(), sse);
}

#[tokio::test]
async fn test_upstream_error_status_passes_through() {
    let harness = RelayTestHarness::new().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({"error": {"message": "Rate limit reached"}})),
        )
        .mount(&harness.upstream)
        .await;

    let response = harness
        .server
        .post("/api/openai/v1/chat/completions")
        .add_header(header::AUTHORIZATION, "Bearer sk-client".parse().unwrap())
        .await;

    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json();
    assert_eq!(body["error"]["message"], "Rate limit reached");
}

#[tokio::test]
async fn test_redirect_is_relayed_not_followed() {
    let harness = RelayTestHarness::new().await;

    Mock::given(method("GET"))
        .and(path("/v1/files"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "https://elsewhere.example.com/"),
        )
        .expect(1)
        .mount(&harness.upstream)
        .await;

    let response = harness
        .server
        .get("/api/openai/v1/files")
        .add_header(header::AUTHORIZATION, "Bearer sk-client".parse().unwrap())
        .await;

    assert_eq!(response.status_code(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get("location").unwrap(),
        "https://elsewhere.example.com/"
    );
}

#[tokio::test]
async fn test_options_short_circuits() {
    let harness = RelayTestHarness::new().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&harness.upstream)
        .await;

    let response = harness
        .server
        .method(Method::OPTIONS, "/api/openai/v1/chat/completions")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!({"body": "OK"}));
}

#[tokio::test]
async fn test_unknown_provider_is_not_found() {
    let harness = RelayTestHarness::new().await;

    let response = harness
        .server
        .post("/api/mistral/v1/chat/completions")
        .add_header(header::AUTHORIZATION, "Bearer sk-client".parse().unwrap())
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_url_rewriter_applies_to_upstream_url() {
    let harness = RelayTestHarness::with_url_rewriter(Arc::new(|url: String| {
        url.replace("/v1/", "/gateway/openai/v1/")
    }))
    .await;

    Mock::given(method("POST"))
        .and(path("/gateway/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&harness.upstream)
        .await;

    let response = harness
        .server
        .post("/api/openai/v1/chat/completions")
        .add_header(header::AUTHORIZATION, "Bearer sk-client".parse().unwrap())
        .await;

    response.assert_status_ok();
}
