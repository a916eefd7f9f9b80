//! Upstream target resolution
//!
//! Combines the auth decision, server configuration and any custom provider
//! overrides into the absolute URL and auth header of the upstream call.

use anyhow::anyhow;
use axum::http::HeaderName;
use tracing::error;
use url::Url;

use super::ProviderKind;
use crate::{
    auth::AuthDecision,
    config::Config,
    custom_provider::CustomProviderSettings,
    error::{AppError, AppResult},
};

/// Where and how a request is sent upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    /// Absolute base URL without trailing slash
    pub base_url: String,
    /// Path with a single leading slash
    pub path: String,
    /// Query string without `?`
    pub query: Option<String>,
    pub auth_header_name: HeaderName,
    pub auth_value: String,
}

impl UpstreamTarget {
    /// Resolve the target for a request.
    ///
    /// Server credentials go to the server-configured base URL and ignore
    /// client endpoint overrides. Client credentials go to the custom
    /// endpoint when one is given, else to the provider's public base URL.
    pub fn resolve(
        config: &Config,
        kind: ProviderKind,
        decision: &AuthDecision,
        overrides: &CustomProviderSettings,
        path: String,
        query: Option<String>,
    ) -> AppResult<Self> {
        let settings = config.provider(kind);

        let (credential, base_url) = match decision {
            AuthDecision::UseServerConfig => {
                let key = config.server_api_key(kind).ok_or_else(|| {
                    AppError::Unauthorized("Server api key is not configured".to_string())
                })?;
                let base = settings
                    .base_url
                    .as_deref()
                    .unwrap_or(&settings.default_base_url);
                // A bad server URL is an operator error, not the client's
                let base = normalize_base_url(base).map_err(|e| {
                    error!(provider = %kind, error = %e, "Server base URL is misconfigured");
                    AppError::Internal(anyhow!("server base URL for {} is invalid: {}", kind, base))
                })?;
                (key.to_string(), base)
            }
            AuthDecision::UseClientConfig(token) => {
                let base = overrides
                    .endpoint
                    .as_deref()
                    .unwrap_or(&settings.default_base_url);
                (token.clone(), normalize_base_url(base)?)
            }
            AuthDecision::Rejected(reason) => return Err(AppError::Unauthorized(reason.clone())),
        };

        Ok(Self {
            base_url,
            path: format!("/{}", path.trim_start_matches('/')),
            query: query.filter(|q| !q.is_empty()),
            auth_header_name: kind.auth_header_name(),
            auth_value: kind.auth_value(&credential),
        })
    }

    /// Full upstream URL
    pub fn url(&self) -> String {
        match &self.query {
            Some(query) => format!("{}{}?{}", self.base_url, self.path, query),
            None => format!("{}{}", self.base_url, self.path),
        }
    }
}

/// Default the scheme to https, drop trailing slashes and validate
pub fn normalize_base_url(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    let normalized = with_scheme.trim_end_matches('/').to_string();

    match Url::parse(&normalized) {
        Ok(url) if url.has_host() => Ok(normalized),
        _ => Err(AppError::BadRequest(format!(
            "Invalid upstream endpoint: {}",
            raw
        ))),
    }
}

/// Query parameters preserved on the upstream URL
///
/// Only Google's `alt=sse` (streamed generateContent) survives; every other
/// inbound query parameter is dropped.
pub fn upstream_query(kind: ProviderKind, inbound_query: Option<&str>) -> Option<String> {
    if kind.native() != ProviderKind::GoogleGemini {
        return None;
    }
    let query = inbound_query?;
    url::form_urlencoded::parse(query.as_bytes())
        .any(|(k, v)| k == "alt" && v == "sse")
        .then(|| "alt=sse".to_string())
}
