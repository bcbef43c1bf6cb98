use std::path::Path;

use async_trait::async_trait;

use super::{Blob, PersistenceBackend};
use crate::errors::StorageError;

const TREE_CACHES: &str = "caches";

/// Sled-backed persistence: each cache blob is one JSON value in the `caches` tree.
pub struct SledBackend {
    _db: sled::Db,
    caches: sled::Tree,
}

impl SledBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let caches = db.open_tree(TREE_CACHES)?;
        Ok(Self { _db: db, caches })
    }

    fn blob_key(name: &str) -> Vec<u8> {
        format!("blob:{}", name).into_bytes()
    }

    /// Names of every cache that has a stored blob.
    pub fn list_blobs(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        for entry in self.caches.scan_prefix(b"blob:") {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(name) = text.strip_prefix("blob:") {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

#[async_trait]
impl PersistenceBackend for SledBackend {
    async fn load_blob(&self, name: &str) -> Result<Option<Blob>, StorageError> {
        let Some(bytes) = self.caches.get(Self::blob_key(name))? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save_blob(&self, name: &str, blob: &Blob) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(blob)?;
        self.caches.insert(Self::blob_key(name), bytes)?;
        self.caches.flush_async().await?;
        Ok(())
    }

    fn describe(&self) -> String {
        "sled database".to_string()
    }
}
