//! Document store module
//!
//! Maps `(collection, id)` pairs onto persisted JSON documents.
//! The API layer only talks to the [`DocumentStore`] trait, so the
//! filesystem backend ([`FileStore`]) can be swapped without touching routing.

mod fs;

pub use fs::FileStore;

use serde_json::{Map, Value};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A stored document: always a JSON object
pub type Document = Map<String, Value>;

/// Typed outcome of a failed store operation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("resource not found")]
    NotFound,

    #[error("no access to {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("invalid JSON document {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Classify an I/O error raised while touching `path`
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Storage interface used by the API dispatcher.
///
/// Ids are taken as the raw path segment; implementations decide what an
/// unknown or malformed id means (normally [`StoreError::NotFound`]).
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    /// All documents of a collection, in backend order
    async fn list(&self, collection: &str) -> Result<Vec<Value>>;

    /// A single document
    async fn get(&self, collection: &str, id: &str) -> Result<Value>;

    /// Store every item under a freshly assigned id, creating the collection if needed.
    /// Returns the items as stored, in input order.
    async fn create(&self, collection: &str, items: Vec<Document>) -> Result<Vec<Document>>;

    /// Overwrite an existing document; the id field is forced to `id`
    async fn replace(&self, collection: &str, id: &str, item: Document) -> Result<Document>;

    /// Remove an existing document
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

/// Parse a document file name into its numeric id
pub fn parse_id(name: &str) -> Option<u64> {
    name.parse::<u64>().ok().filter(|id| *id > 0)
}
