//! HTTP cache control module
//!
//! `ETag` generation and `If-None-Match` handling for static files.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Quoted `ETag` for a file body, e.g. `"abc123def"`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    let v = hasher.finish();
    format!("\"{v:x}\"")
}

/// True when `If-None-Match` (single, comma list, or `*`) covers `etag`.
/// Weak validators (`W/"..."`) compare equal to their strong form.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    let strip_weak = |tag: &str| tag.trim().trim_start_matches("W/").to_owned();
    let etag = strip_weak(etag);
    if_none_match.is_some_and(|header| {
        header
            .split(',')
            .map(strip_weak)
            .any(|candidate| candidate == "*" || candidate == etag)
    })
}
