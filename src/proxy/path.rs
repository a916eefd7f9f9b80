//! Upstream path computation

use super::ProviderKind;

const CUSTOM_ROUTE_PREFIX: &str = "/api/custom_";

/// Compute the upstream path for a request.
///
/// Route segments win when present. Otherwise the provider prefix is
/// stripped from the inbound URL path; a custom-provider URL
/// (`/api/custom_<id>/<family>/...`) is cut after the family marker.
/// The result always starts with exactly one `/`.
pub fn compute_path(uri_path: &str, route_segments: Option<&[String]>, kind: ProviderKind) -> String {
    let raw = match route_segments {
        Some(segments) => segments.join("/"),
        None => {
            let stripped = uri_path.strip_prefix(kind.route_prefix()).unwrap_or(uri_path);
            if stripped.starts_with(CUSTOM_ROUTE_PREFIX) {
                let marker = kind.path_marker();
                match stripped.find(marker) {
                    Some(idx) => stripped[idx + marker.len()..].to_string(),
                    None => stripped.to_string(),
                }
            } else {
                stripped.to_string()
            }
        }
    };

    format!("/{}", raw.trim_start_matches('/'))
}
