//! Credential resolution
//!
//! Decides, per request, whether the relay uses its own provider key (client
//! presented a valid access code) or forwards the key the client supplied.

use axum::http::{header, HeaderMap};
use tracing::{debug, info};

use crate::{
    config::Config,
    proxy::{
        headers::{header_str, X_API_KEY, X_CUSTOM_PROVIDER_API_KEY, X_GOOG_API_KEY},
        ProviderKind,
    },
    routes::metrics::record_auth_decision,
};

/// Prefix that marks an Authorization token as an access code
pub const ACCESS_CODE_PREFIX: &str = "nk-";

/// Outcome of credential resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// Use the server-held key for the target provider
    UseServerConfig,
    /// Forward the client's own credential
    UseClientConfig(String),
    /// No usable credential
    Rejected(String),
}

impl AuthDecision {
    /// Label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            AuthDecision::UseServerConfig => "server",
            AuthDecision::UseClientConfig(_) => "client",
            AuthDecision::Rejected(_) => "rejected",
        }
    }
}

/// Authorization header split into access code or raw API key
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedAuthorization {
    pub access_code: String,
    pub api_key: String,
}

/// Extract the token from a Bearer-style Authorization header value
pub fn extract_bearer_token(auth_header: &str) -> &str {
    let trimmed = auth_header.trim();
    trimmed.strip_prefix("Bearer ").unwrap_or(trimmed).trim()
}

/// Classify the Authorization header by the access code prefix
pub fn parse_authorization(auth_header: &str) -> ParsedAuthorization {
    let token = extract_bearer_token(auth_header);

    match token.strip_prefix(ACCESS_CODE_PREFIX) {
        Some(code) => ParsedAuthorization {
            access_code: code.to_string(),
            api_key: String::new(),
        },
        None => ParsedAuthorization {
            access_code: String::new(),
            api_key: token.to_string(),
        },
    }
}

/// Best-effort client IP for logging
pub fn client_ip(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
}

/// Resolves credentials against the injected server configuration
pub struct CredentialResolver<'a> {
    config: &'a Config,
}

impl<'a> CredentialResolver<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Decide which credential the upstream call will carry
    pub fn resolve(&self, headers: &HeaderMap, kind: ProviderKind) -> AuthDecision {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let parsed = parse_authorization(authorization);

        debug!(
            provider = %kind,
            client_ip = ?client_ip(headers),
            "Resolving credentials"
        );

        let server_ready =
            self.has_valid_access_code(&parsed) && self.config.server_api_key(kind).is_some();

        let decision = if server_ready {
            info!(provider = %kind, "Using server api key");
            AuthDecision::UseServerConfig
        } else {
            match client_token(headers, &parsed, kind) {
                Some(token) => {
                    info!(provider = %kind, "Using client api key");
                    AuthDecision::UseClientConfig(token.to_string())
                }
                None => AuthDecision::Rejected("Empty api key".to_string()),
            }
        };

        record_auth_decision(kind.as_str(), decision.label());
        decision
    }

    fn has_valid_access_code(&self, parsed: &ParsedAuthorization) -> bool {
        match self.config.access_code.as_deref() {
            Some(code) if !code.is_empty() => parsed.access_code == code,
            _ => false,
        }
    }
}

/// Client-presented token in provider-specific precedence order
fn client_token<'h>(
    headers: &'h HeaderMap,
    parsed: &'h ParsedAuthorization,
    kind: ProviderKind,
) -> Option<&'h str> {
    let api_key = Some(parsed.api_key.as_str()).filter(|k| !k.is_empty());
    let custom = header_str(headers, &X_CUSTOM_PROVIDER_API_KEY);

    match kind.native() {
        ProviderKind::GoogleGemini => header_str(headers, &X_GOOG_API_KEY).or(api_key).or(custom),
        ProviderKind::Anthropic => header_str(headers, &X_API_KEY).or(api_key).or(custom),
        _ => api_key.or(custom),
    }
}
