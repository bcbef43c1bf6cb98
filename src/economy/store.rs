//! Inventory store: capacity-checked item mutations over the write-back cache.
//!
//! Every mutation runs under the [`KeyLock`] of the user(s) it touches, reads the
//! record through the inventory cache, validates, mutates a copy and writes it back
//! with [`RecordCache::set`]. Nothing here waits on disk; persistence happens in the
//! background flusher. Transfers hold both users' locks (acquired in sorted order)
//! so the sender check and the recipient capacity check see one consistent state.

use std::sync::Arc;

use log::debug;

use super::catalog::{Catalog, SILVER};
use super::inventory::{
    add_units, check_capacity, remove_units, round3, total_weight, InventoryRecord,
};
use crate::cache::{CacheError, CacheManager, RecordCache};
use crate::config::{BackpackTier, Config, EconomyConfig, INVENTORY_CACHE};
use crate::errors::EconomyError;
use crate::lock::KeyLock;

/// Economy tuning the store needs at runtime.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub default_max_weight: f64,
    pub backpack_tiers: Vec<BackpackTier>,
}

impl From<&EconomyConfig> for StoreSettings {
    fn from(config: &EconomyConfig) -> Self {
        Self {
            default_max_weight: config.default_max_weight,
            backpack_tiers: config.backpack_tiers.clone(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::from(&EconomyConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AddOutcome {
    pub quantity: u64,
    pub total_weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoveOutcome {
    pub remaining: u64,
    pub total_weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferOutcome {
    pub sender_remaining: u64,
    pub sender_weight: f64,
    pub recipient_quantity: u64,
    pub recipient_weight: f64,
}

/// How a backpack upgrade is obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackpackUpgrade {
    /// Buy the tier at this index of the tier table, paid in silver.
    Tier(usize),
    /// Administrative grant of an exact capacity, free of charge.
    Capacity(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpgradeOutcome {
    pub max_weight: f64,
    pub silver_spent: u64,
}

pub struct ItemStore {
    locks: KeyLock,
    inventories: RecordCache<InventoryRecord>,
    catalog: Arc<Catalog>,
    settings: StoreSettings,
}

impl ItemStore {
    pub fn new(
        locks: KeyLock,
        inventories: RecordCache<InventoryRecord>,
        catalog: Arc<Catalog>,
        settings: StoreSettings,
    ) -> Self {
        Self {
            locks,
            inventories,
            catalog,
            settings,
        }
    }

    /// Register the inventory cache on `manager` using the configured row and build
    /// a store around it.
    pub fn open(
        manager: &CacheManager,
        locks: KeyLock,
        catalog: Arc<Catalog>,
        config: &Config,
    ) -> Result<Self, CacheError> {
        let cache_config = config
            .cache(INVENTORY_CACHE)
            .map(|row| row.cache_config())
            .unwrap_or_default();
        let inventories = manager.register::<InventoryRecord>(INVENTORY_CACHE, cache_config)?;
        Ok(Self::new(
            locks,
            inventories,
            catalog,
            StoreSettings::from(&config.economy),
        ))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn backpack_tiers(&self) -> &[BackpackTier] {
        &self.settings.backpack_tiers
    }

    pub fn inventories(&self) -> &RecordCache<InventoryRecord> {
        &self.inventories
    }

    /// Current record for `user`; new users start empty. Takes no lock.
    pub async fn get_inventory(&self, user: &str) -> InventoryRecord {
        self.inventories
            .load(user, InventoryRecord::new(self.settings.default_max_weight))
            .await
    }

    /// Record to modify and write back. Unlike [`get_inventory`](Self::get_inventory)
    /// a failed read is an error, so a stored record is never replaced by the
    /// empty default. Call with the user's lock held.
    async fn load_for_update(&self, user: &str) -> Result<InventoryRecord, EconomyError> {
        self.inventories
            .try_load(user, InventoryRecord::new(self.settings.default_max_weight))
            .await
            .map_err(|e| EconomyError::Storage(e.to_string()))
    }

    pub async fn get_item_quantity(&self, user: &str, item_id: &str) -> u64 {
        self.get_inventory(user).await.quantity(item_id)
    }

    pub async fn has_item(&self, user: &str, item_id: &str, quantity: u64) -> bool {
        self.get_item_quantity(user, item_id).await >= quantity
    }

    /// Weight the user can still pick up.
    pub async fn free_capacity(&self, user: &str) -> f64 {
        let record = self.get_inventory(user).await;
        round3((record.max_weight - total_weight(&record, &self.catalog)).max(0.0))
    }

    pub async fn add_item(
        &self,
        user: &str,
        item_id: &str,
        quantity: u64,
    ) -> Result<AddOutcome, EconomyError> {
        let _guard = self.locks.acquire(user).await;
        let mut record = self.load_for_update(user).await?;
        let (quantity_now, weight) = add_units(&mut record, &self.catalog, item_id, quantity)?;
        self.inventories.set(user, record);
        debug!("{} +{} {} -> {} (weight {})", user, quantity, item_id, quantity_now, weight);
        Ok(AddOutcome {
            quantity: quantity_now,
            total_weight: weight,
        })
    }

    pub async fn remove_item(
        &self,
        user: &str,
        item_id: &str,
        quantity: u64,
    ) -> Result<RemoveOutcome, EconomyError> {
        let _guard = self.locks.acquire(user).await;
        let mut record = self.load_for_update(user).await?;
        let (remaining, weight) = remove_units(&mut record, &self.catalog, item_id, quantity)?;
        self.inventories.set(user, record);
        debug!("{} -{} {} -> {} (weight {})", user, quantity, item_id, remaining, weight);
        Ok(RemoveOutcome {
            remaining,
            total_weight: weight,
        })
    }

    /// Move `quantity` units from `from` to `to`. Both records change or neither does.
    pub async fn transfer_item(
        &self,
        from: &str,
        to: &str,
        item_id: &str,
        quantity: u64,
    ) -> Result<TransferOutcome, EconomyError> {
        if quantity == 0 {
            return Err(EconomyError::InvalidQuantity);
        }
        if from == to {
            return Err(EconomyError::SelfTransfer(from.to_string()));
        }
        self.catalog.require(item_id)?;

        self.locks
            .with_multiple_locks([from, to], move || async move {
                let mut sender = self.load_for_update(from).await?;
                let mut recipient = self.load_for_update(to).await?;

                let (sender_remaining, sender_weight) =
                    remove_units(&mut sender, &self.catalog, item_id, quantity)?;
                let (recipient_quantity, recipient_weight) =
                    add_units(&mut recipient, &self.catalog, item_id, quantity)?;

                self.inventories.set(from, sender);
                self.inventories.set(to, recipient);
                debug!("transfer {} x{} {} -> {}", item_id, quantity, from, to);
                Ok::<_, EconomyError>(TransferOutcome {
                    sender_remaining,
                    sender_weight,
                    recipient_quantity,
                    recipient_weight,
                })
            })
            .await
    }

    /// Administrative set of an exact quantity. Raising it is capacity-checked.
    pub async fn set_item_quantity(
        &self,
        user: &str,
        item_id: &str,
        quantity: u64,
    ) -> Result<AddOutcome, EconomyError> {
        let def = self.catalog.require(item_id)?;
        let _guard = self.locks.acquire(user).await;
        let mut record = self.load_for_update(user).await?;

        let held = record.quantity(item_id);
        if quantity > held && def.weight > 0.0 {
            let current = total_weight(&record, &self.catalog);
            let new_weight = round3(current + def.weight * (quantity - held) as f64);
            check_capacity(&record, current, new_weight)?;
        }
        record.set_quantity(item_id, quantity);
        let weight = total_weight(&record, &self.catalog);
        self.inventories.set(user, record);
        debug!("{} set {} = {} (weight {})", user, item_id, quantity, weight);
        Ok(AddOutcome {
            quantity,
            total_weight: weight,
        })
    }

    /// Raise the user's carrying capacity. Capacity never decreases.
    pub async fn upgrade_backpack(
        &self,
        user: &str,
        upgrade: BackpackUpgrade,
    ) -> Result<UpgradeOutcome, EconomyError> {
        let _guard = self.locks.acquire(user).await;
        let mut record = self.load_for_update(user).await?;
        let current = record.max_weight;

        let (max_weight, cost) = match upgrade {
            BackpackUpgrade::Tier(index) => {
                let tier = self
                    .settings
                    .backpack_tiers
                    .get(index)
                    .ok_or(EconomyError::UnknownTier(index))?;
                if tier.capacity <= current {
                    return Err(EconomyError::CapacityDowngrade {
                        current,
                        requested: tier.capacity,
                    });
                }
                (tier.capacity, tier.cost)
            }
            BackpackUpgrade::Capacity(capacity) => {
                if !capacity.is_finite() || capacity < current {
                    return Err(EconomyError::CapacityDowngrade {
                        current,
                        requested: capacity,
                    });
                }
                (capacity, 0)
            }
        };

        if cost > 0 {
            let held = record.quantity(SILVER);
            if held < cost {
                return Err(EconomyError::InsufficientQuantity {
                    item_id: SILVER.to_string(),
                    held,
                    requested: cost,
                });
            }
            record.set_quantity(SILVER, held - cost);
        }
        record.max_weight = max_weight;
        self.inventories.set(user, record);
        debug!("{} backpack {} -> {} (paid {} silver)", user, current, max_weight, cost);
        Ok(UpgradeOutcome {
            max_weight,
            silver_spent: cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, FlushSettings};
    use crate::economy::catalog::ItemDefinition;
    use crate::storage::MemoryBackend;

    fn store() -> ItemStore {
        let manager = CacheManager::new(Arc::new(MemoryBackend::new()), FlushSettings::default());
        let cache = manager
            .register::<InventoryRecord>(INVENTORY_CACHE, CacheConfig::default())
            .unwrap();
        let catalog = Catalog::new([
            ItemDefinition::new(SILVER, "Silver", 0.0, true),
            ItemDefinition::new("anvil", "Anvil", 10.0, false),
        ]);
        ItemStore::new(
            KeyLock::default(),
            cache,
            Arc::new(catalog),
            StoreSettings {
                default_max_weight: 25.0,
                backpack_tiers: vec![
                    BackpackTier {
                        capacity: 40.0,
                        cost: 100,
                    },
                    BackpackTier {
                        capacity: 60.0,
                        cost: 300,
                    },
                ],
            },
        )
    }

    #[tokio::test]
    async fn new_user_starts_empty_with_default_capacity() {
        let store = store();
        let record = store.get_inventory("newcomer").await;
        assert!(record.is_empty());
        assert_eq!(record.max_weight, 25.0);
        assert_eq!(store.free_capacity("newcomer").await, 25.0);
    }

    #[tokio::test]
    async fn tier_upgrade_charges_silver() {
        let store = store();
        store.add_item("u", SILVER, 150).await.unwrap();

        let outcome = store.upgrade_backpack("u", BackpackUpgrade::Tier(0)).await.unwrap();
        assert_eq!(outcome, UpgradeOutcome { max_weight: 40.0, silver_spent: 100 });
        assert_eq!(store.get_item_quantity("u", SILVER).await, 50);

        let err = store.upgrade_backpack("u", BackpackUpgrade::Tier(1)).await.unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_QUANTITY");
        assert_eq!(store.get_inventory("u").await.max_weight, 40.0);

        let err = store.upgrade_backpack("u", BackpackUpgrade::Tier(0)).await.unwrap_err();
        assert_eq!(err.code(), "CAPACITY_DOWNGRADE");
        assert_eq!(
            store.upgrade_backpack("u", BackpackUpgrade::Tier(9)).await,
            Err(EconomyError::UnknownTier(9))
        );
    }

    #[tokio::test]
    async fn admin_capacity_never_lowers() {
        let store = store();
        assert!(store
            .upgrade_backpack("u", BackpackUpgrade::Capacity(10.0))
            .await
            .is_err());
        let outcome = store
            .upgrade_backpack("u", BackpackUpgrade::Capacity(30.0))
            .await
            .unwrap();
        assert_eq!(outcome.silver_spent, 0);
        assert_eq!(store.free_capacity("u").await, 30.0);
    }

    #[tokio::test]
    async fn set_quantity_checks_capacity_only_when_raising() {
        let store = store();
        store.set_item_quantity("u", "anvil", 2).await.unwrap();
        assert!(matches!(
            store.set_item_quantity("u", "anvil", 3).await,
            Err(EconomyError::CapacityExceeded { .. })
        ));
        let outcome = store.set_item_quantity("u", "anvil", 0).await.unwrap();
        assert_eq!(outcome.total_weight, 0.0);
        assert!(!store.has_item("u", "anvil", 1).await);
    }

    #[tokio::test]
    async fn self_transfer_rejected() {
        let store = store();
        store.add_item("a", SILVER, 5).await.unwrap();
        assert_eq!(
            store.transfer_item("a", "a", SILVER, 1).await,
            Err(EconomyError::SelfTransfer("a".into()))
        );
        assert_eq!(
            store.transfer_item("a", "b", SILVER, 0).await,
            Err(EconomyError::InvalidQuantity)
        );
    }

    #[tokio::test]
    async fn transfer_blocked_by_recipient_capacity_changes_nothing() {
        let store = store();
        store.add_item("a", "anvil", 2).await.unwrap();
        store.add_item("b", "anvil", 2).await.unwrap();

        let err = store.transfer_item("a", "b", "anvil", 1).await.unwrap_err();
        assert!(matches!(err, EconomyError::CapacityExceeded { max, .. } if max == 25.0));
        assert_eq!(store.get_item_quantity("a", "anvil").await, 2);
        assert_eq!(store.get_item_quantity("b", "anvil").await, 2);
    }
}
