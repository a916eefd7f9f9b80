//! HTTP routes for llm-relay
//!
//! This module defines all HTTP endpoints exposed by the relay.

pub mod custom;
pub mod health;
pub mod metrics;
pub mod provider;

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::{AppError, AppResult},
    proxy::ProviderKind,
    AppState,
};

pub use provider::ProxyRequest;

/// Route parameters of `/api/:provider/*path`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteParams {
    /// `openai`, `google`, `anthropic` or `custom_<id>`
    pub provider: String,
    /// Remaining path segments
    pub path: Vec<String>,
}

impl RouteParams {
    /// Split a raw URL path into provider and segments
    ///
    /// Segments are taken from the raw path so percent-encoding reaches the
    /// upstream untouched.
    pub fn from_uri_path(uri_path: &str) -> Option<Self> {
        let mut segments = uri_path.split('/').filter(|s| !s.is_empty());
        if segments.next()? != "api" {
            return None;
        }
        let provider = segments.next()?.to_string();

        Some(Self {
            provider,
            path: segments.map(str::to_string).collect(),
        })
    }
}

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let proxy_routes = Router::new().route("/api/:provider/*path", any(proxy_handler));

    // Public routes (health checks, metrics)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .route("/metrics", get(metrics::prometheus_metrics));

    Router::new()
        .merge(public_routes)
        .merge(proxy_routes)
        // Global middleware (applied to all routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Entry point for every provider request
///
/// Native providers go straight to the provider handler; `custom_<id>`
/// routes go through the custom provider router first.
pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> AppResult<Response> {
    if request.method() == Method::OPTIONS {
        return Ok((StatusCode::OK, Json(json!({ "body": "OK" }))).into_response());
    }

    let params = RouteParams::from_uri_path(request.uri().path())
        .ok_or_else(|| AppError::NotFound("Unknown route".to_string()))?;

    if let Some(kind) = ProviderKind::native_from_segment(&params.provider) {
        let request = ProxyRequest::new(request, Some(params.path));
        return provider::handle(&state, kind, request).await;
    }

    if params.provider.starts_with("custom_") {
        let request = ProxyRequest::new(request, Some(params.path.clone()));
        return custom::route(&state, request, params).await;
    }

    Err(AppError::NotFound(format!("Unknown provider: {}", params.provider)))
}
