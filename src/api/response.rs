// API response module
// JSON payloads keyed by numeric status for errors, plus conversion to hyper responses

use crate::logger;
use crate::store::StoreError;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde_json::{Map, Value};

const INVALID_CONTENT_MESSAGE: &str =
    "Review your Content-Type header. I only speak application/json bro.";

/// Status plus JSON body of an API answer
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub const fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub const fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub const fn created(body: Value) -> Self {
        Self::new(StatusCode::CREATED, body)
    }

    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT, Value::Object(Map::new()))
    }

    /// Error body of the form `{"<status>": "<message>"}`
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        let mut body = Map::new();
        body.insert(status.as_u16().to_string(), Value::String(message.into()));
        Self::new(status, Value::Object(body))
    }

    pub fn invalid_content_type() -> Self {
        Self::error(StatusCode::BAD_REQUEST, INVALID_CONTENT_MESSAGE)
    }

    pub fn no_access(path: &std::path::Path) -> Self {
        Self::error(
            StatusCode::FORBIDDEN,
            format!("Server process owner has no access to {}", path.display()),
        )
    }

    pub fn collection_not_found(collection: &str) -> Self {
        Self::error(
            StatusCode::NOT_FOUND,
            format!("Resource {collection} not found"),
        )
    }

    pub fn document_not_found(collection: &str, id: &str) -> Self {
        Self::error(
            StatusCode::NOT_FOUND,
            format!("Resource {collection}/{id} not found"),
        )
    }

    pub fn method_not_allowed() -> Self {
        Self::error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    }

    pub fn invalid_uri(prefix: &str) -> Self {
        Self::error(
            StatusCode::NOT_ACCEPTABLE,
            format!("Invalid API URI format. Expected format: {prefix}<resource> or {prefix}<resource>/"),
        )
    }

    pub fn internal_error() -> Self {
        Self::error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    /// Map a store failure; `id` selects the collection or document 404 message
    pub fn from_store_error(err: &StoreError, collection: &str, id: Option<&str>) -> Self {
        match err {
            StoreError::NotFound => match id {
                Some(id) => Self::document_not_found(collection, id),
                None => Self::collection_not_found(collection),
            },
            StoreError::PermissionDenied(path) => {
                logger::log_warning(&format!("Permission denied: {}", path.display()));
                Self::no_access(path)
            }
            StoreError::Json { .. } | StoreError::Io { .. } => {
                logger::log_error(&format!("Store failure: {err}"));
                Self::internal_error()
            }
        }
    }

    /// Build the hyper response; 204 carries no body on the wire
    pub fn into_http(self, server_name: &str) -> Response<Full<Bytes>> {
        let body = if self.status == StatusCode::NO_CONTENT {
            Bytes::new()
        } else {
            match serde_json::to_vec(&self.body) {
                Ok(json) => Bytes::from(json),
                Err(e) => {
                    logger::log_error(&format!("Failed to serialize response: {e}"));
                    return Self::internal_error().into_http(server_name);
                }
            }
        };

        Response::builder()
            .status(self.status)
            .header("Content-Type", "application/json")
            .header("Server", server_name)
            .body(Full::new(body))
            .unwrap_or_else(|e| {
                logger::log_error(&format!("Failed to build response: {e}"));
                Response::new(Full::new(Bytes::from("Error")))
            })
    }
}
