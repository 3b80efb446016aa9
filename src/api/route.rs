//! API path classification
//!
//! Splits paths under the API prefix into resource parts and maps the
//! part count onto a collection or document target.

/// What an API path addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// `/api/<collection>`
    Collection(&'a str),
    /// `/api/<collection>/<id>`
    Document { collection: &'a str, id: &'a str },
    /// No parts, or more than two
    Invalid,
}

/// Check whether a path lies under the API namespace
pub fn is_api_request(path: &str, prefix: &str) -> bool {
    path.starts_with(prefix)
}

/// Segments after the API prefix, skipping empty and blank ones.
/// Non-API paths have no resource parts.
pub fn resource_parts<'a>(path: &'a str, prefix: &str) -> Vec<&'a str> {
    path.strip_prefix(prefix).map_or_else(Vec::new, |rest| {
        rest.split('/')
            .filter(|segment| !segment.trim_matches(' ').is_empty())
            .collect()
    })
}

/// Resolve a path into its target
pub fn resolve<'a>(path: &'a str, prefix: &str) -> Target<'a> {
    let parts = resource_parts(path, prefix);
    match *parts.as_slice() {
        [collection] => Target::Collection(collection),
        [collection, id] => Target::Document { collection, id },
        _ => Target::Invalid,
    }
}
