//! llm-relay - Multi-provider AI API gateway
//!
//! This library provides the core of the relay: credential resolution,
//! custom provider decoding, path rewriting and streaming forwarding to
//! OpenAI-, Google- and Anthropic-shaped upstreams.

pub mod auth;
pub mod config;
pub mod custom_provider;
pub mod error;
pub mod proxy;
pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

pub use crate::auth::{AuthDecision, CredentialResolver};
pub use crate::config::Config;
pub use crate::custom_provider::{CustomProviderConfig, CustomProviderSettings};
pub use crate::proxy::{ProviderKind, UpstreamForwarder, UrlRewriter};

/// Application state shared across all request handlers
///
/// Everything here is read-only after startup.
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    /// Upstream client shared by all providers
    pub forwarder: UpstreamForwarder,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Result<Self> {
        Self::with_url_rewriter(config, Arc::new(proxy::Passthrough))
    }

    /// Create a state whose outbound URLs pass through `rewriter`
    pub fn with_url_rewriter(config: Config, rewriter: Arc<dyn UrlRewriter>) -> Result<Self> {
        // Initialize HTTP client with connection pooling
        let http_client = UpstreamForwarder::build_client()?;
        let forwarder = UpstreamForwarder::new(http_client, config.upstream_timeout, rewriter);

        Ok(Self {
            config,
            start_time: Instant::now(),
            forwarder,
        })
    }
}
