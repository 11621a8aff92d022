//! Authenticated access to the backend REST API.

mod client;

pub use client::{ApiClient, Body};

/// Join a base URL and a path with exactly one `/` between them.
pub fn join_url(base: &str, path: &str) -> String {
    if base.is_empty() {
        return path.to_string();
    }
    if path.is_empty() {
        return base.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Turn a stored avatar path into something fetchable. Windows-style
/// separators from the upload directory are normalized first.
pub fn resolve_asset_url(base: &str, raw: &str) -> Option<String> {
    let normalized = raw.trim().replace('\\', "/");
    if normalized.is_empty() {
        return None;
    }
    if normalized.starts_with("http://") || normalized.starts_with("https://") || normalized.starts_with("blob:") {
        return Some(normalized);
    }
    Some(join_url(base, &normalized))
}
