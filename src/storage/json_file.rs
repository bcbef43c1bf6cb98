use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::{Blob, PersistenceBackend};
use crate::errors::StorageError;

/// Characters left readable in cache file names.
const FILE_NAME_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

/// Flat-file backend: one pretty-printed JSON object per cache name.
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    /// Use (and create if needed) `dir` as the storage root.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// File that holds the blob for `name`. Names are percent-encoded so a cache
    /// name can never escape the data directory.
    pub fn blob_path(&self, name: &str) -> PathBuf {
        let safe = utf8_percent_encode(name, FILE_NAME_SET).to_string();
        self.dir.join(format!("{}.json", safe))
    }
}

#[async_trait]
impl PersistenceBackend for JsonFileBackend {
    async fn load_blob(&self, name: &str) -> Result<Option<Blob>, StorageError> {
        let path = self.blob_path(name);
        tokio::task::spawn_blocking(move || read_file_locked(&path)).await?
    }

    async fn save_blob(&self, name: &str, blob: &Blob) -> Result<(), StorageError> {
        let path = self.blob_path(name);
        let content = serde_json::to_string_pretty(blob)?;
        tokio::task::spawn_blocking(move || write_file_locked(&path, &content)).await?
    }

    fn describe(&self) -> String {
        format!("json files in {}", self.dir.display())
    }
}

fn read_file_locked(path: &Path) -> Result<Option<Blob>, StorageError> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    file.lock_shared()?;
    let mut content = String::new();
    let read = file.read_to_string(&mut content);
    let _ = FileExt::unlock(&file);
    read?;

    if content.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&content)?))
}

/// Write `content` to `path` under an exclusive lock, via a temp file and rename so
/// readers never observe a half-written blob.
fn write_file_locked(path: &Path, content: &str) -> Result<(), StorageError> {
    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)?;
    lock_file.lock_exclusive()?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("cache.json");
    let mut counter = 0u32;
    let tmp_path = loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut tmp) => {
                tmp.write_all(content.as_bytes())?;
                tmp.flush()?;
                let _ = tmp.sync_all();
                break candidate;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    };

    fs::rename(&tmp_path, path)?;
    if let Ok(dir_file) = File::open(dir) {
        let _ = dir_file.sync_all();
    }
    drop(lock_file);
    Ok(())
}
