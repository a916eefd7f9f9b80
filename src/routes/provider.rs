//! Provider request handler
//!
//! Runs one request through the pipeline: allow-list check, credential
//! resolution, path and target computation, then the upstream call.

use std::time::Instant;

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, Method, Uri},
    response::Response,
};
use tracing::Instrument;

use crate::{
    auth::{AuthDecision, CredentialResolver},
    custom_provider::CustomProviderSettings,
    error::{AppError, AppResult},
    proxy::{compute_path, target::upstream_query, ProviderKind, RequestContext, UpstreamTarget},
    routes::metrics::record_request,
    AppState,
};

/// Chat paths the native Anthropic route accepts
pub const ANTHROPIC_ALLOWED_PATHS: &[&str] = &["v1/messages", "v1/complete"];

/// An inbound request on its way upstream
#[derive(Debug)]
pub struct ProxyRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Single-use body stream
    pub body: Body,
    /// Upstream path segments, when routing supplied them
    pub segments: Option<Vec<String>>,
}

impl ProxyRequest {
    pub fn new(request: Request, segments: Option<Vec<String>>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            segments,
        }
    }
}

/// Check the native Anthropic allow-list
pub fn check_allowed_path(kind: ProviderKind, path: &str) -> AppResult<()> {
    if kind != ProviderKind::Anthropic {
        return Ok(());
    }

    let subpath = path.trim_start_matches('/');
    if ANTHROPIC_ALLOWED_PATHS.contains(&subpath) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "you are not allowed to request {}",
            subpath
        )))
    }
}

/// Handle a request for one provider
pub async fn handle(state: &AppState, kind: ProviderKind, request: ProxyRequest) -> AppResult<Response> {
    let start_time = Instant::now();

    let path = compute_path(request.uri.path(), request.segments.as_deref(), kind);
    let ctx = RequestContext::new(kind, &path);
    ctx.log_request_start(request.method.as_str());

    // Allow-list runs before any credential is looked at
    if let Err(e) = check_allowed_path(kind, &path) {
        ctx.log_rejected(&e.to_string());
        record_request(kind.as_str(), "forbidden", start_time.elapsed().as_secs_f64());
        return Err(e);
    }

    let decision = CredentialResolver::new(&state.config).resolve(&request.headers, kind);
    if let AuthDecision::Rejected(reason) = &decision {
        ctx.log_rejected(reason);
        record_request(kind.as_str(), "unauthorized", start_time.elapsed().as_secs_f64());
        return Err(AppError::Unauthorized(reason.clone()));
    }
    let ctx = ctx.with_auth_mode(decision.label());

    let overrides = CustomProviderSettings::from_headers(&request.headers);
    let query = upstream_query(kind, request.uri.query());
    let target = UpstreamTarget::resolve(&state.config, kind, &decision, &overrides, path, query)?;

    let span = ctx.create_span();
    let result = state
        .forwarder
        .forward(&ctx, request.method, &request.headers, request.body, &target)
        .instrument(span)
        .await;

    let duration = start_time.elapsed().as_secs_f64();
    match &result {
        Ok(response) => record_request(kind.as_str(), response.status().as_str(), duration),
        Err(e) => {
            ctx.log_error(&e.to_string());
            record_request(kind.as_str(), "error", duration);
        }
    }

    result
}
