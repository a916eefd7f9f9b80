//! Configuration management for llm-relay
//!
//! Configuration is loaded from environment variables once at startup and is
//! read-only for the lifetime of the process.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use crate::proxy::ProviderKind;

/// Default upstream base URLs
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Hard deadline for a single upstream call, streaming included
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10 * 60;

/// Server-side settings for one native provider
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    /// Server-held API key, used only with a valid access code
    pub api_key: Option<String>,
    /// Server-side base URL override (applies to server-credential requests)
    pub base_url: Option<String>,
    /// Public base URL used for client-credential requests
    pub default_base_url: String,
}

impl ProviderSettings {
    fn from_env(key_var: &str, url_var: &str, default_base_url: &str) -> Self {
        Self {
            api_key: non_empty_var(key_var),
            base_url: non_empty_var(url_var),
            default_base_url: default_base_url.to_string(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Shared secret that unlocks the server-held provider keys
    pub access_code: Option<String>,

    pub openai: ProviderSettings,
    pub google: ProviderSettings,
    pub anthropic: ProviderSettings,

    /// Hard timeout applied to every upstream call
    pub upstream_timeout: Duration,

    /// Emit logs as JSON lines
    pub json_logs: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let timeout_secs: u64 = env::var("UPSTREAM_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| DEFAULT_UPSTREAM_TIMEOUT_SECS.to_string())
            .parse()
            .context("Invalid UPSTREAM_TIMEOUT_SECONDS")?;

        Ok(Self {
            host: env::var("RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("RELAY_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid RELAY_PORT")?,

            access_code: non_empty_var("ACCESS_CODE"),

            openai: ProviderSettings::from_env("OPENAI_API_KEY", "OPENAI_BASE_URL", OPENAI_BASE_URL),
            google: ProviderSettings::from_env("GOOGLE_API_KEY", "GOOGLE_BASE_URL", GOOGLE_BASE_URL),
            anthropic: ProviderSettings::from_env(
                "ANTHROPIC_API_KEY",
                "ANTHROPIC_BASE_URL",
                ANTHROPIC_BASE_URL,
            ),

            upstream_timeout: Duration::from_secs(timeout_secs),

            json_logs: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }

    /// Settings of the native provider a kind belongs to
    pub fn provider(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind.native() {
            ProviderKind::GoogleGemini => &self.google,
            ProviderKind::Anthropic => &self.anthropic,
            _ => &self.openai,
        }
    }

    /// Server-held API key for a provider.
    ///
    /// Custom providers never resolve a server key: server credentials are
    /// only sent to the provider they were configured for.
    pub fn server_api_key(&self, kind: ProviderKind) -> Option<&str> {
        if kind.is_custom() {
            return None;
        }
        self.provider(kind).api_key.as_deref()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            access_code: None,
            openai: ProviderSettings {
                default_base_url: OPENAI_BASE_URL.to_string(),
                ..Default::default()
            },
            google: ProviderSettings {
                default_base_url: GOOGLE_BASE_URL.to_string(),
                ..Default::default()
            },
            anthropic: ProviderSettings {
                default_base_url: ANTHROPIC_BASE_URL.to_string(),
                ..Default::default()
            },
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            json_logs: false,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
