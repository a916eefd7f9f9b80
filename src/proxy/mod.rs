//! Proxy module
//!
//! Handles target resolution and request forwarding to upstream providers.

pub mod forwarder;
pub mod headers;
pub mod logging;
pub mod path;
pub mod provider;
pub mod rewrite;
pub mod target;

pub use forwarder::UpstreamForwarder;
pub use logging::RequestContext;
pub use path::compute_path;
pub use provider::ProviderKind;
pub use rewrite::{Passthrough, UrlRewriter};
pub use target::UpstreamTarget;
