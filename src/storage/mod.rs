//! # Persistence backends
//!
//! The cache layer talks to durable storage through one narrow trait,
//! [`PersistenceBackend`]. A backend stores one *blob* per cache name: a JSON object
//! keyed by record key (usually a user id). Several keys share a blob, which is why
//! the write-back path always loads, merges and then saves.
//!
//! Implementations:
//!
//! - [`JsonFileBackend`] - one `<data_dir>/<cache>.json` file per cache, written
//!   atomically under an exclusive file lock.
//! - [`SledBackend`] - one sled key per cache inside a single embedded database.
//! - [`MemoryBackend`] - process memory only, with failure injection for tests.
//!
//! ```text
//! data/
//! ├── inventory.json   ← {"alice": {...}, "bob": {...}}
//! └── profiles.json
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{BackendKind, StorageConfig};
use crate::errors::StorageError;

mod json_file;
mod memory;
mod sled_store;

pub use json_file::JsonFileBackend;
pub use memory::MemoryBackend;
pub use sled_store::SledBackend;

/// Contents of one named cache as persisted: record key to encoded record.
pub type Blob = BTreeMap<String, serde_json::Value>;

/// Load/save contract every durable store must satisfy.
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Fetch the blob stored under `name`, or `None` if nothing was ever saved.
    async fn load_blob(&self, name: &str) -> Result<Option<Blob>, StorageError>;

    /// Replace the blob stored under `name`.
    async fn save_blob(&self, name: &str, blob: &Blob) -> Result<(), StorageError>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// Open the backend selected in the storage configuration.
pub async fn open_backend(
    config: &StorageConfig,
) -> Result<Arc<dyn PersistenceBackend>, StorageError> {
    let backend: Arc<dyn PersistenceBackend> = match config.backend {
        BackendKind::Json => Arc::new(JsonFileBackend::open(&config.data_dir).await?),
        BackendKind::Sled => Arc::new(SledBackend::open(
            std::path::Path::new(&config.data_dir).join("saloonkeep.sled"),
        )?),
    };
    log::info!("persistence backend ready: {}", backend.describe());
    Ok(backend)
}
