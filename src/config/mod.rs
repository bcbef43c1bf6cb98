//! # Configuration Management Module
//!
//! Loads the TOML configuration that describes where records are persisted, how the
//! write queue paces itself, which named caches exist and how the economy is tuned.
//!
//! ## Configuration Structure
//!
//! - [`LoggingConfig`] - log level and optional log file
//! - [`StorageConfig`] - data directory and backend selection
//! - [`WriteQueueConfig`] - background flusher tick and batch size
//! - [`LockConfig`] - stuck-lock safety timeout
//! - [`CacheTableEntry`] - one named cache (`[[caches]]`)
//! - [`EconomyConfig`] - default backpack capacity, catalog seed and upgrade tiers
//!
//! ## Usage
//!
//! ```rust,no_run
//! use saloonkeep::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("data dir: {}", config.storage.data_dir);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [logging]
//! level = "info"
//! file = "saloonkeep.log"
//!
//! [storage]
//! data_dir = "./data"
//! backend = "json"        # or "sled"
//!
//! [write_queue]
//! tick_ms = 1000
//! batch_size = 10
//!
//! [locks]
//! timeout_ms = 30000
//!
//! [[caches]]
//! name = "inventory"
//! ttl_ms = 300000
//! max_size = 1000
//! sync_interval_ms = 30000
//!
//! [economy]
//! default_max_weight = 50.0
//!
//! [[economy.backpack_tiers]]
//! capacity = 75.0
//! cost = 500
//! ```

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::cache::{CacheConfig, FlushSettings};

/// Name of the cache that holds inventory records.
pub const INVENTORY_CACHE: &str = "inventory";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub write_queue: WriteQueueConfig,
    #[serde(default)]
    pub locks: LockConfig,
    #[serde(default = "default_caches")]
    pub caches: Vec<CacheTableEntry>,
    #[serde(default)]
    pub economy: EconomyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// One JSON file per cache under `data_dir`.
    #[default]
    Json,
    /// Embedded sled database under `data_dir/saloonkeep.sled`.
    Sled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    #[serde(default)]
    pub backend: BackendKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteQueueConfig {
    /// Interval between background flush ticks (ms).
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Maximum queued operations written per tick.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_batch_size() -> usize {
    10
}

impl Default for WriteQueueConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            batch_size: default_batch_size(),
        }
    }
}

impl WriteQueueConfig {
    pub fn settings(&self) -> FlushSettings {
        FlushSettings {
            tick: Duration::from_millis(self.tick_ms),
            batch_size: self.batch_size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Locks held longer than this are force-released (ms). 0 disables the watchdog.
    #[serde(default = "default_lock_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    30_000
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl LockConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// One `[[caches]]` row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheTableEntry {
    pub name: String,
    pub ttl_ms: u64,
    pub max_size: usize,
    pub sync_interval_ms: u64,
}

impl CacheTableEntry {
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_millis(self.ttl_ms),
            max_size: self.max_size,
            sync_interval: Duration::from_millis(self.sync_interval_ms),
            blob: None,
        }
    }
}

fn default_caches() -> Vec<CacheTableEntry> {
    vec![
        CacheTableEntry {
            name: INVENTORY_CACHE.to_string(),
            ttl_ms: 300_000,
            max_size: 1000,
            sync_interval_ms: 30_000,
        },
        CacheTableEntry {
            name: "profiles".to_string(),
            ttl_ms: 600_000,
            max_size: 500,
            sync_interval_ms: 60_000,
        },
    ]
}

/// One purchasable backpack size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BackpackTier {
    pub capacity: f64,
    /// Price in silver.
    pub cost: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    #[serde(default = "default_max_weight")]
    pub default_max_weight: f64,
    /// Optional JSON item catalog; the built-in table is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<String>,
    #[serde(default = "default_backpack_tiers")]
    pub backpack_tiers: Vec<BackpackTier>,
}

fn default_max_weight() -> f64 {
    50.0
}

fn default_backpack_tiers() -> Vec<BackpackTier> {
    vec![
        BackpackTier {
            capacity: 75.0,
            cost: 500,
        },
        BackpackTier {
            capacity: 100.0,
            cost: 1500,
        },
        BackpackTier {
            capacity: 150.0,
            cost: 4000,
        },
    ]
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            default_max_weight: default_max_weight(),
            catalog_path: None,
            backpack_tiers: default_backpack_tiers(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject configurations the runtime cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            bail!("storage.data_dir must not be empty");
        }
        if self.write_queue.tick_ms == 0 {
            bail!("write_queue.tick_ms must be greater than zero");
        }
        if self.write_queue.batch_size == 0 {
            bail!("write_queue.batch_size must be greater than zero");
        }

        let mut seen = HashSet::new();
        for cache in &self.caches {
            if cache.name.trim().is_empty() {
                bail!("cache names must not be empty");
            }
            if !seen.insert(cache.name.as_str()) {
                bail!("cache {} is declared more than once", cache.name);
            }
            if cache.max_size == 0 {
                bail!("cache {}: max_size must be greater than zero", cache.name);
            }
            if cache.sync_interval_ms == 0 {
                bail!("cache {}: sync_interval_ms must be greater than zero", cache.name);
            }
        }
        if !seen.contains(INVENTORY_CACHE) {
            bail!("a cache named {} is required", INVENTORY_CACHE);
        }

        let economy = &self.economy;
        if !(economy.default_max_weight.is_finite() && economy.default_max_weight > 0.0) {
            bail!("economy.default_max_weight must be a positive number");
        }
        let mut floor = economy.default_max_weight;
        for (index, tier) in economy.backpack_tiers.iter().enumerate() {
            if !tier.capacity.is_finite() || tier.capacity < floor {
                bail!(
                    "backpack tier {} capacity {} is below the previous capacity {}",
                    index,
                    tier.capacity,
                    floor
                );
            }
            floor = tier.capacity;
        }
        Ok(())
    }

    /// Settings for the `[[caches]]` row called `name`.
    pub fn cache(&self, name: &str) -> Option<&CacheTableEntry> {
        self.caches.iter().find(|c| c.name == name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("saloonkeep.log".to_string()),
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
                backend: BackendKind::Json,
            },
            write_queue: WriteQueueConfig::default(),
            locks: LockConfig::default(),
            caches: default_caches(),
            economy: EconomyConfig::default(),
        }
    }
}
