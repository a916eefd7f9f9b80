//! Custom provider configuration
//!
//! A custom provider (user-configured endpoint, key and provider type) travels
//! with each request as a base64-encoded JSON blob in the
//! `x-custom-provider-config` header. Nothing is cached between requests.

use axum::http::HeaderMap;
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::proxy::{
    headers::{header_str, X_CUSTOM_PROVIDER_CONFIG, X_CUSTOM_PROVIDER_ENDPOINT},
    ProviderKind,
};

/// Standard alphabet, padding optional
const BLOB_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Why a config blob could not be decoded
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("config header is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("config header is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("config header is not a valid provider config: {0}")]
    Json(#[from] serde_json::Error),
}

/// A user-configured provider instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomProviderConfig {
    #[serde(default)]
    pub id: String,
    /// Provider shape: `openai`, `google` or `anthropic`
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub api_key: String,
    #[serde(default)]
    pub enabled: bool,
}

impl CustomProviderConfig {
    /// Decode a header value: base64 of a UTF-8 JSON object
    pub fn decode(value: &str) -> Result<Self, DecodeError> {
        let bytes = BLOB_ENGINE.decode(value.trim())?;
        let json = String::from_utf8(bytes)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Encode into the header representation
    pub fn encode(&self) -> Result<String, DecodeError> {
        let json = serde_json::to_vec(self)?;
        Ok(BLOB_ENGINE.encode(json))
    }

    /// Read the config from request headers
    ///
    /// A missing header is `Ok(None)`; a present but malformed header is an
    /// error.
    pub fn from_headers(headers: &HeaderMap) -> Result<Option<Self>, DecodeError> {
        match header_str(headers, &X_CUSTOM_PROVIDER_CONFIG) {
            Some(value) => Self::decode(value).map(Some),
            None => Ok(None),
        }
    }

    /// Custom provider kind for the configured `type`
    pub fn kind(&self) -> Option<ProviderKind> {
        ProviderKind::custom_from_type(&self.provider_type)
    }

    /// Endpoint, ignoring blank values
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

/// Endpoint override in effect for one request
///
/// A discrete `x-custom-provider-endpoint` header wins; otherwise the config
/// blob supplies it. The key is read by the credential resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomProviderSettings {
    pub endpoint: Option<String>,
}

impl CustomProviderSettings {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut settings = Self {
            endpoint: header_str(headers, &X_CUSTOM_PROVIDER_ENDPOINT).map(str::to_string),
        };

        if settings.endpoint.is_none() {
            match CustomProviderConfig::from_headers(headers) {
                Ok(Some(config)) => settings.endpoint = config.endpoint().map(str::to_string),
                Ok(None) => {}
                Err(e) => debug!(error = %e, "Ignoring undecodable custom provider config"),
            }
        }

        settings
    }
}
