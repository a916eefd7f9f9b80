//! Header utilities for AI provider proxying
//!
//! Builds the outbound header set for upstream calls and sanitizes upstream
//! response headers before they reach the client. Client headers are never
//! copied wholesale to the upstream request.

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

use super::ProviderKind;
use crate::error::{AppError, AppResult};

pub const X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");
pub const X_GOOG_API_KEY: HeaderName = HeaderName::from_static("x-goog-api-key");

pub const X_CUSTOM_PROVIDER_CONFIG: HeaderName = HeaderName::from_static("x-custom-provider-config");
pub const X_CUSTOM_PROVIDER_ENDPOINT: HeaderName =
    HeaderName::from_static("x-custom-provider-endpoint");
pub const X_CUSTOM_PROVIDER_API_KEY: HeaderName =
    HeaderName::from_static("x-custom-provider-api-key");
pub const X_CUSTOM_PROVIDER_ID: HeaderName = HeaderName::from_static("x-custom-provider-id");
pub const X_CUSTOM_PROVIDER_TYPE: HeaderName = HeaderName::from_static("x-custom-provider-type");

pub const ANTHROPIC_VERSION: HeaderName = HeaderName::from_static("anthropic-version");
pub const ANTHROPIC_DIRECT_BROWSER_ACCESS: HeaderName =
    HeaderName::from_static("anthropic-dangerous-direct-browser-access");
pub const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";

pub const OPENAI_ORGANIZATION: HeaderName = HeaderName::from_static("openai-organization");
pub const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Hop-by-hop headers that must never be forwarded
const HOP_BY_HOP_HEADERS: &[HeaderName] = &[
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Read a header as a trimmed, non-empty string
pub fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Build the header set for an upstream request
///
/// Only the content headers, the provider auth header and, for
/// Anthropic-shaped providers, the protocol headers are sent.
pub fn build_upstream_headers(
    kind: ProviderKind,
    auth_header_name: &HeaderName,
    auth_value: &str,
    incoming: &HeaderMap,
) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();

    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    let auth = HeaderValue::from_str(auth_value)
        .map_err(|_| AppError::BadRequest("API key contains invalid characters".to_string()))?;
    headers.insert(auth_header_name.clone(), auth);

    if kind.native() == ProviderKind::Anthropic {
        let version = incoming
            .get(&ANTHROPIC_VERSION)
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_ANTHROPIC_VERSION));
        headers.insert(ANTHROPIC_VERSION, version);
        headers.insert(ANTHROPIC_DIRECT_BROWSER_ACCESS, HeaderValue::from_static("true"));
    }

    Ok(headers)
}

/// Check if a header is a hop-by-hop header that should not be forwarded
pub fn is_hop_by_hop_header(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(name)
}

/// Sanitize upstream response headers for the client
///
/// Drops hop-by-hop headers and `www-authenticate` (so browsers never show a
/// credential prompt), drops the organization and content-encoding headers on
/// OpenAI-shaped responses, and disables proxy buffering of streamed chunks.
pub fn sanitize_response_headers(kind: ProviderKind, upstream: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(upstream.len() + 1);

    for (name, value) in upstream {
        if !is_hop_by_hop_header(name) {
            filtered.append(name.clone(), value.clone());
        }
    }

    filtered.remove(header::WWW_AUTHENTICATE);
    if kind.native() == ProviderKind::OpenAI {
        filtered.remove(OPENAI_ORGANIZATION);
        filtered.remove(header::CONTENT_ENCODING);
    }
    filtered.insert(X_ACCEL_BUFFERING, HeaderValue::from_static("no"));

    filtered
}
