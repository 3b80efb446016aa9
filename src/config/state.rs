// Application state module
// Shared, read-only configuration plus the document store

use super::types::Config;
use crate::store::FileStore;

/// Application state
pub struct AppState {
    pub config: Config,
    pub store: FileStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = FileStore::new(&config.storage.data_dir, config.api.id_field.clone());
        Self { config, store }
    }

    /// Cached access-log switch
    pub const fn access_log(&self) -> bool {
        self.config.logging.access_log
    }
}
