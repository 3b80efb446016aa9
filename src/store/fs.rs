//! Filesystem document store
//!
//! Layout: `<root>/<collection>/<id>`, each file holding one compact JSON document.

use super::{parse_id, Document, DocumentStore, Result, StoreError};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs;
use tokio::sync::OwnedMutexGuard;

pub struct FileStore {
    root: PathBuf,
    id_field: String,
    /// Per-collection write locks, present only while held or awaited
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

/// A held collection lock. Dropping it removes the table entry when no
/// other request holds or awaits the same lock.
struct CollectionGuard<'a> {
    store: &'a FileStore,
    collection: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for CollectionGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut table = self.store.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if table
            .get(&self.collection)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(&self.collection);
        }
    }
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, id_field: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            id_field: id_field.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_path(&self, collection: &str) -> Option<PathBuf> {
        is_plain_segment(collection).then(|| self.root.join(collection))
    }

    fn document_path(&self, collection: &str, id: &str) -> Option<PathBuf> {
        if !is_plain_segment(id) {
            return None;
        }
        self.collection_path(collection).map(|dir| dir.join(id))
    }

    /// Serialize writers of one collection across the read-max-id / write sequence
    async fn lock_collection(&self, collection: &str) -> CollectionGuard<'_> {
        let lock = {
            let mut table = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(table.entry(collection.to_owned()).or_default())
        };
        CollectionGuard {
            store: self,
            collection: collection.to_owned(),
            guard: Some(lock.lock_owned().await),
        }
    }

    async fn max_id(dir: &Path) -> Result<u64> {
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| StoreError::from_io(dir, e))?;
        let mut max_id = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::from_io(dir, e))?
        {
            if let Some(id) = entry.file_name().to_str().and_then(parse_id) {
                max_id = max_id.max(id);
            }
        }
        Ok(max_id)
    }

    async fn ensure_exists(path: &Path) -> Result<()> {
        fs::metadata(path)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::from_io(path, e))
    }
}

impl DocumentStore for FileStore {
    async fn list(&self, collection: &str) -> Result<Vec<Value>> {
        let dir = self.collection_path(collection).ok_or(StoreError::NotFound)?;
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| StoreError::from_io(&dir, e))?;

        let mut items = Vec::new();
        let mut denied: Option<PathBuf> = None;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::from_io(&dir, e))?
        {
            if !entry.file_name().to_str().is_some_and(is_document_name) {
                continue;
            }
            let path = entry.path();
            match read_document(&path).await {
                Ok(item) => items.push(item),
                // Removed between listing and reading
                Err(StoreError::NotFound) => {}
                Err(StoreError::PermissionDenied(p)) => {
                    denied.get_or_insert(p);
                }
                Err(e) => return Err(e),
            }
        }

        match denied {
            Some(path) => Err(StoreError::PermissionDenied(path)),
            None => Ok(items),
        }
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Value> {
        let path = self
            .document_path(collection, id)
            .ok_or(StoreError::NotFound)?;
        read_document(&path).await
    }

    async fn create(&self, collection: &str, items: Vec<Document>) -> Result<Vec<Document>> {
        let dir = self.collection_path(collection).ok_or(StoreError::NotFound)?;
        let _guard = self.lock_collection(collection).await;

        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::from_io(&dir, e))?;

        let mut next_id = Self::max_id(&dir).await?;
        let mut created = Vec::with_capacity(items.len());
        for mut item in items {
            next_id += 1;
            item.insert(self.id_field.clone(), Value::from(next_id));
            write_document(&dir.join(next_id.to_string()), &item).await?;
            created.push(item);
        }
        Ok(created)
    }

    async fn replace(&self, collection: &str, id: &str, mut item: Document) -> Result<Document> {
        let path = self
            .document_path(collection, id)
            .ok_or(StoreError::NotFound)?;
        let _guard = self.lock_collection(collection).await;

        Self::ensure_exists(&path).await?;
        item.insert(self.id_field.clone(), Value::String(id.to_owned()));
        write_document(&path, &item).await?;
        Ok(item)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let path = self
            .document_path(collection, id)
            .ok_or(StoreError::NotFound)?;
        let _guard = self.lock_collection(collection).await;

        Self::ensure_exists(&path).await?;
        fs::remove_file(&path)
            .await
            .map_err(|e| StoreError::from_io(&path, e))
    }
}

/// Listed entries are any integer file name; ids handed out stay positive
fn is_document_name(name: &str) -> bool {
    name.parse::<i64>().is_ok()
}

/// A segment that names exactly one entry below its parent directory
fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}

async fn read_document(path: &Path) -> Result<Value> {
    let raw = fs::read(path)
        .await
        .map_err(|e| StoreError::from_io(path, e))?;
    serde_json::from_slice(&raw).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

async fn write_document(path: &Path, item: &Document) -> Result<()> {
    let raw = serde_json::to_vec(item).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, raw)
        .await
        .map_err(|e| StoreError::from_io(path, e))
}
