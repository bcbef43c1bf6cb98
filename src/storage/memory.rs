use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Blob, PersistenceBackend};
use crate::errors::StorageError;

/// In-process backend. Nothing survives the process; used by tests and dry runs.
#[derive(Default)]
pub struct MemoryBackend {
    blobs: Mutex<HashMap<String, Blob>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    saves: AtomicU64,
    read_delay_ms: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob directly, bypassing the save counter.
    pub fn insert_blob(&self, name: &str, blob: Blob) {
        self.blobs.lock().insert(name.to_string(), blob);
    }

    /// Current stored value of one record, if any.
    pub fn record(&self, name: &str, key: &str) -> Option<serde_json::Value> {
        self.blobs.lock().get(name).and_then(|b| b.get(key).cloned())
    }

    pub fn blob(&self, name: &str) -> Option<Blob> {
        self.blobs.lock().get(name).cloned()
    }

    /// Number of successful `save_blob` calls.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::Relaxed)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Delay every load after its snapshot is taken, simulating a slow disk.
    pub fn set_read_delay(&self, delay: Duration) {
        self.read_delay_ms
            .store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    fn injected(op: &str) -> StorageError {
        StorageError::Io(std::io::Error::other(format!("injected {} failure", op)))
    }
}

#[async_trait]
impl PersistenceBackend for MemoryBackend {
    async fn load_blob(&self, name: &str) -> Result<Option<Blob>, StorageError> {
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(Self::injected("read"));
        }
        let snapshot = self.blobs.lock().get(name).cloned();
        let delay = self.read_delay_ms.load(Ordering::Relaxed);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(snapshot)
    }

    async fn save_blob(&self, name: &str, blob: &Blob) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(Self::injected("write"));
        }
        self.blobs.lock().insert(name.to_string(), blob.clone());
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
