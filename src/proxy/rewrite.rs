//! Outbound URL rewriting
//!
//! Deployments may route upstream traffic through an edge gateway that
//! expects a different URL shape. The relay treats that as a pure
//! `rewrite(url) -> url` step applied right before the call.

/// Rewrites the final upstream URL
pub trait UrlRewriter: Send + Sync {
    fn rewrite(&self, url: String) -> String;
}

/// Leaves URLs untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl UrlRewriter for Passthrough {
    fn rewrite(&self, url: String) -> String {
        url
    }
}

impl<F> UrlRewriter for F
where
    F: Fn(String) -> String + Send + Sync,
{
    fn rewrite(&self, url: String) -> String {
        self(url)
    }
}
