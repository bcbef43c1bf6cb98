//! Service wiring: turns a [`Config`] into a running set of economy services.
//!
//! ```rust,no_run
//! use saloonkeep::app::App;
//! use saloonkeep::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::open(Config::load("config.toml").await?).await?;
//!     app.start();
//!     app.economy.add_user_silver("alice", 25).await?;
//!     app.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::{info, warn};

use crate::cache::{CacheManager, FlushReport};
use crate::config::{Config, INVENTORY_CACHE};
use crate::economy::{Catalog, Economy, ItemStore};
use crate::lock::KeyLock;
use crate::storage::{open_backend, PersistenceBackend};

/// Explicitly constructed services shared by every caller in the process.
pub struct App {
    pub config: Config,
    pub locks: KeyLock,
    pub caches: CacheManager,
    pub store: Arc<ItemStore>,
    pub economy: Economy,
}

impl App {
    /// Open the configured backend and build all services on it.
    pub async fn open(config: Config) -> Result<Self> {
        let backend = open_backend(&config.storage)
            .await
            .map_err(|e| anyhow!("Failed to open {} storage: {}", config.storage.data_dir, e))?;
        Self::with_backend(config, backend)
    }

    /// Build all services on an already open backend.
    pub fn with_backend(config: Config, backend: Arc<dyn PersistenceBackend>) -> Result<Self> {
        config.validate()?;

        let catalog = match &config.economy.catalog_path {
            Some(path) => Catalog::load_from_json(path)
                .map_err(|e| anyhow!("Failed to load catalog {}: {}", path, e))?,
            None => Catalog::default(),
        };

        let locks = KeyLock::new(config.locks.timeout());
        let caches = CacheManager::new(backend, config.write_queue.settings());
        let store = Arc::new(ItemStore::open(&caches, locks.clone(), Arc::new(catalog), &config)?);

        for row in config.caches.iter().filter(|row| row.name != INVENTORY_CACHE) {
            // Extra caches hold free-form JSON records for callers outside the economy.
            if let Err(e) = caches.register::<serde_json::Value>(&row.name, row.cache_config()) {
                warn!("skipping cache {}: {}", row.name, e);
            }
        }

        info!(
            "services ready: {} cache(s), {} catalog item(s), lock timeout {:?}",
            caches.cache_names().len(),
            store.catalog().len(),
            locks.timeout()
        );

        let economy = Economy::new(Arc::clone(&store));
        Ok(Self {
            config,
            locks,
            caches,
            store,
            economy,
        })
    }

    /// Start the background write-back flusher.
    pub fn start(&self) {
        self.caches.start();
    }

    /// Stop the flusher and persist every dirty record.
    pub async fn shutdown(&self) -> FlushReport {
        let report = self.caches.shutdown().await;
        if self.locks.forced_releases() > 0 {
            warn!(
                "{} lock(s) were force-released during this run",
                self.locks.forced_releases()
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    #[tokio::test]
    async fn default_config_registers_all_caches() {
        let app = App::with_backend(Config::default(), Arc::new(MemoryBackend::new())).unwrap();
        assert_eq!(app.caches.cache_names(), vec!["inventory", "profiles"]);
        assert_eq!(app.store.catalog().len(), Catalog::default().len());
    }

    #[tokio::test]
    async fn missing_catalog_file_is_an_error() {
        let mut config = Config::default();
        config.economy.catalog_path = Some("/nonexistent/catalog.json".into());
        assert!(App::with_backend(config, Arc::new(MemoryBackend::new())).is_err());
    }
}
