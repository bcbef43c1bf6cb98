//! Test utilities & fixtures.
//! Builds isolated store instances over an in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use saloonkeep::cache::{CacheConfig, CacheManager, FlushSettings};
use saloonkeep::config::{BackpackTier, Config, INVENTORY_CACHE};
use saloonkeep::economy::{
    Catalog, Economy, InventoryRecord, ItemDefinition, ItemStore, StoreSettings, SALOON_TOKEN,
    SILVER,
};
use saloonkeep::lock::KeyLock;
use saloonkeep::storage::MemoryBackend;

/// Weight of one saloon token in the test catalog.
#[allow(dead_code)]
pub const TOKEN_WEIGHT: f64 = 0.25;

#[allow(dead_code)]
pub struct Harness {
    pub backend: Arc<MemoryBackend>,
    pub caches: CacheManager,
    pub store: Arc<ItemStore>,
    pub economy: Economy,
}

/// Catalog with a weighted premium currency so weight arithmetic is observable.
pub fn test_catalog() -> Catalog {
    Catalog::new([
        ItemDefinition::new(SILVER, "Silver", 0.0, true),
        ItemDefinition::new(SALOON_TOKEN, "Saloon Token", TOKEN_WEIGHT, true),
        ItemDefinition::new("whiskey", "Whiskey", 1.5, true),
        ItemDefinition::new("saddle", "Saddle", 12.0, false),
    ])
}

/// Store with the given inventory cache settings and backpack size.
#[allow(dead_code)]
pub fn harness_with(cache: CacheConfig, max_weight: f64) -> Harness {
    let backend = Arc::new(MemoryBackend::new());
    let caches = CacheManager::new(backend.clone(), FlushSettings::default());
    let inventories = caches
        .register::<InventoryRecord>(INVENTORY_CACHE, cache)
        .expect("register inventory cache");
    let store = Arc::new(ItemStore::new(
        KeyLock::new(Duration::from_secs(30)),
        inventories,
        Arc::new(test_catalog()),
        StoreSettings {
            default_max_weight: max_weight,
            backpack_tiers: vec![BackpackTier {
                capacity: max_weight * 2.0,
                cost: 100,
            }],
        },
    ));
    let economy = Economy::new(store.clone());
    Harness {
        backend,
        caches,
        store,
        economy,
    }
}

#[allow(dead_code)]
pub fn harness() -> Harness {
    harness_with(CacheConfig::default(), 50.0)
}

/// Default configuration pointed at `data_dir` with quiet logging.
#[allow(dead_code)]
pub fn test_config(data_dir: &str) -> Config {
    let mut config = Config::default();
    config.storage.data_dir = data_dir.to_string();
    config.logging.level = "error".into();
    config.logging.file = None;
    config
}
