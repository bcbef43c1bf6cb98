//! # Economy
//!
//! Item catalog, per-user inventories and the currency facade.
//!
//! ```text
//! Economy (gold / silver)
//!      │
//! ItemStore ── KeyLock (per user)
//!      │
//! RecordCache<InventoryRecord> ── write queue ── backend
//! ```
//!
//! Invariant: after every successful mutation a user's carried weight is at most
//! their `max_weight`; rejected mutations change nothing.

pub mod catalog;
pub mod facade;
pub mod inventory;
pub mod store;

pub use catalog::{Catalog, ItemDefinition, SALOON_TOKEN, SILVER};
pub use facade::Economy;
pub use inventory::{round3, total_weight, InventoryRecord};
pub use store::{
    AddOutcome, BackpackUpgrade, ItemStore, RemoveOutcome, StoreSettings, TransferOutcome,
    UpgradeOutcome,
};
