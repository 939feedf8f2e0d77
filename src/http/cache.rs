//! HTTP cache validation module
//!
//! Provides `ETag` generation and conditional request handling for both
//! `If-None-Match` and `If-Modified-Since`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Generate `ETag` using fast hashing
///
/// # Returns
/// Quoted `ETag` string, e.g., `"abc123def"`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    let v = hasher.finish();
    format!("\"{v:x}\"")
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports a single `ETag`, a comma-separated list, weak validators
/// (`W/"..."`) and the `*` wildcard.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').map(str::trim).any(|e| {
            e == "*" || e.strip_prefix("W/").unwrap_or(e) == etag
        })
    })
}

/// Format a timestamp as an HTTP date (`Last-Modified`)
pub fn format_http_date(time: SystemTime) -> String {
    httpdate::fmt_http_date(time)
}

/// Whether an `If-Modified-Since` value means the client copy is current
///
/// HTTP dates have one-second resolution, so the file time is truncated
/// before comparing. Unparsable dates never match.
pub fn not_modified_since(if_modified_since: Option<&str>, modified: SystemTime) -> bool {
    let Some(since) = if_modified_since.and_then(|v| httpdate::parse_http_date(v).ok()) else {
        return false;
    };
    truncate_to_secs(modified) <= since
}

fn truncate_to_secs(time: SystemTime) -> SystemTime {
    time.duration_since(UNIX_EPOCH)
        .map_or(time, |d| UNIX_EPOCH + Duration::from_secs(d.as_secs()))
}

/// `Cache-Control` value for every successful response
///
/// Files under development change often: the browser may keep them but must
/// revalidate against `ETag`/`Last-Modified` each time.
pub const CACHE_CONTROL: &str = "no-cache";
