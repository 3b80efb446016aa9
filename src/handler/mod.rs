//! Request handler module
//!
//! Splits incoming requests between the REST namespace and the static file fallback.

pub mod router;
pub mod static_files;

pub use router::handle_request;
