//! HTTP protocol layer module
//!
//! Plain (non-JSON) responses and helpers shared by the static file fallback
//! and the request router.

pub mod cache;
pub mod mime;
pub mod response;

pub use response::{build_304_response, build_404_response, build_413_response};
