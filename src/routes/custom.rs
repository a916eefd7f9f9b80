//! Custom provider routing
//!
//! `/api/custom_<id>/<type>/...` requests carry their provider config in a
//! header blob. The router validates it, reshapes the request into the
//! matching native provider shape and hands it to the provider handler with
//! the custom `ProviderKind`.

use axum::{
    http::{
        uri::{PathAndQuery, Uri},
        HeaderMap, HeaderValue,
    },
    response::Response,
};
use tracing::{info, warn};

use super::{provider, ProxyRequest, RouteParams};
use crate::{
    custom_provider::CustomProviderConfig,
    error::{AppError, AppResult},
    proxy::{
        headers::{
            X_CUSTOM_PROVIDER_API_KEY, X_CUSTOM_PROVIDER_ENDPOINT, X_CUSTOM_PROVIDER_ID,
            X_CUSTOM_PROVIDER_TYPE,
        },
        ProviderKind,
    },
    AppState,
};

fn not_configured() -> AppError {
    AppError::NotFound("Custom provider not found or not configured".to_string())
}

/// Route a custom provider request
pub async fn route(state: &AppState, request: ProxyRequest, params: RouteParams) -> AppResult<Response> {
    info!(provider = %params.provider, path = ?params.path, "Custom provider route");

    let config = match CustomProviderConfig::from_headers(&request.headers) {
        Ok(Some(config)) => config,
        Ok(None) => return Err(not_configured()),
        Err(e) => {
            warn!(provider = %params.provider, error = %e, "Failed to decode custom provider config");
            return Err(not_configured());
        }
    };

    if !config.enabled {
        return Err(AppError::Forbidden("Custom provider is disabled".to_string()));
    }

    let kind = config.kind().ok_or_else(|| {
        AppError::BadRequest(format!(
            "Unsupported custom provider type: {}",
            config.provider_type
        ))
    })?;

    let request = derive_request(request, &params, &config, kind)?;
    provider::handle(state, kind, request).await
}

/// Build the request the provider handler sees
fn derive_request(
    mut request: ProxyRequest,
    params: &RouteParams,
    config: &CustomProviderConfig,
    kind: ProviderKind,
) -> AppResult<ProxyRequest> {
    inject_config_headers(&mut request.headers, &params.provider, config)?;
    request.uri = rewrite_uri(&request.uri, kind, &config.provider_type)?;
    request.segments = Some(strip_type_marker(&params.path, &config.provider_type));
    Ok(request)
}

/// Expose the decoded config as discrete headers
fn inject_config_headers(
    headers: &mut HeaderMap,
    provider_id: &str,
    config: &CustomProviderConfig,
) -> AppResult<()> {
    let value = |v: &str| {
        HeaderValue::from_str(v).map_err(|_| {
            AppError::BadRequest("Custom provider config contains invalid characters".to_string())
        })
    };

    headers.insert(X_CUSTOM_PROVIDER_ID, value(provider_id)?);
    headers.insert(X_CUSTOM_PROVIDER_TYPE, value(&config.provider_type)?);
    headers.insert(X_CUSTOM_PROVIDER_API_KEY, value(&config.api_key)?);
    match config.endpoint() {
        Some(endpoint) => {
            headers.insert(X_CUSTOM_PROVIDER_ENDPOINT, value(endpoint)?);
        }
        None => {
            headers.remove(X_CUSTOM_PROVIDER_ENDPOINT);
        }
    }
    Ok(())
}

/// Rewrite `/api/custom_<id>/<type>/rest` to `/api/<family>/rest`
pub fn rewrite_custom_path(path: &str, kind: ProviderKind, provider_type: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 3 || segments[0] != "api" {
        return path.to_string();
    }

    let mut rest = &segments[2..];
    if rest.first() == Some(&provider_type) {
        rest = &rest[1..];
    }

    format!("/api/{}/{}", kind.family(), rest.join("/"))
}

fn rewrite_uri(uri: &Uri, kind: ProviderKind, provider_type: &str) -> AppResult<Uri> {
    let path = rewrite_custom_path(uri.path(), kind, provider_type);
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path,
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .map_err(|e| AppError::BadRequest(format!("Invalid request path: {}", e)))?,
    );
    Uri::from_parts(parts).map_err(|e| AppError::BadRequest(format!("Invalid request path: {}", e)))
}

/// Drop a leading segment that only names the provider type
pub fn strip_type_marker(segments: &[String], provider_type: &str) -> Vec<String> {
    match segments.split_first() {
        Some((first, rest)) if first == provider_type => rest.to_vec(),
        _ => segments.to_vec(),
    }
}
