//! Provider kinds
//!
//! Every request is handled on behalf of exactly one `ProviderKind`. The kind
//! decides which credential header is consulted first, which path prefix is
//! stripped, which auth header goes upstream and how the response is
//! sanitized.

use std::fmt;

use axum::http::HeaderName;

use super::headers::{X_API_KEY, X_GOOG_API_KEY};

/// Target provider of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAI,
    GoogleGemini,
    Anthropic,
    CustomOpenAI,
    CustomGoogle,
    CustomAnthropic,
}

impl ProviderKind {
    /// Native provider this kind is shaped like
    pub fn native(self) -> ProviderKind {
        match self {
            ProviderKind::OpenAI | ProviderKind::CustomOpenAI => ProviderKind::OpenAI,
            ProviderKind::GoogleGemini | ProviderKind::CustomGoogle => ProviderKind::GoogleGemini,
            ProviderKind::Anthropic | ProviderKind::CustomAnthropic => ProviderKind::Anthropic,
        }
    }

    pub fn is_custom(self) -> bool {
        matches!(
            self,
            ProviderKind::CustomOpenAI | ProviderKind::CustomGoogle | ProviderKind::CustomAnthropic
        )
    }

    /// Family name, as used in route segments and custom provider `type`
    pub fn family(self) -> &'static str {
        match self.native() {
            ProviderKind::GoogleGemini => "google",
            ProviderKind::Anthropic => "anthropic",
            _ => "openai",
        }
    }

    /// Custom kind for a custom provider `type` value
    pub fn custom_from_type(provider_type: &str) -> Option<ProviderKind> {
        match provider_type {
            "openai" => Some(ProviderKind::CustomOpenAI),
            "google" => Some(ProviderKind::CustomGoogle),
            "anthropic" => Some(ProviderKind::CustomAnthropic),
            _ => None,
        }
    }

    /// Native kind for a route segment such as `/api/openai/...`
    pub fn native_from_segment(segment: &str) -> Option<ProviderKind> {
        match segment {
            "openai" => Some(ProviderKind::OpenAI),
            "google" => Some(ProviderKind::GoogleGemini),
            "anthropic" => Some(ProviderKind::Anthropic),
            _ => None,
        }
    }

    /// Inbound route prefix, e.g. `/api/anthropic/`
    pub fn route_prefix(self) -> &'static str {
        match self.native() {
            ProviderKind::GoogleGemini => "/api/google/",
            ProviderKind::Anthropic => "/api/anthropic/",
            _ => "/api/openai/",
        }
    }

    /// Marker that locates the upstream path inside a custom-provider URL
    pub fn path_marker(self) -> &'static str {
        match self.native() {
            ProviderKind::GoogleGemini => "/google/",
            ProviderKind::Anthropic => "/anthropic/",
            _ => "/openai/",
        }
    }

    /// Header carrying the credential on the upstream request
    pub fn auth_header_name(self) -> HeaderName {
        match self.native() {
            ProviderKind::GoogleGemini => X_GOOG_API_KEY,
            ProviderKind::Anthropic => X_API_KEY,
            _ => axum::http::header::AUTHORIZATION,
        }
    }

    /// Format a credential for the upstream auth header
    pub fn auth_value(self, credential: &str) -> String {
        match self.native() {
            ProviderKind::OpenAI => format!("Bearer {}", credential),
            _ => credential.to_string(),
        }
    }

    /// Stable name for logs and metrics
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::GoogleGemini => "google",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::CustomOpenAI => "custom_openai",
            ProviderKind::CustomGoogle => "custom_google",
            ProviderKind::CustomAnthropic => "custom_anthropic",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
