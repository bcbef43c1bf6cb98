//! Currency helpers over the inventory store.
//!
//! Gold is the `saloon_token` item and silver is the `silver` item; every call is a
//! plain [`ItemStore`] operation on that id. Balances returned are post-operation.
use std::sync::Arc;

use super::catalog::{SALOON_TOKEN, SILVER};
use super::store::{ItemStore, TransferOutcome};
use crate::errors::EconomyError;

#[derive(Clone)]
pub struct Economy {
    store: Arc<ItemStore>,
}

impl Economy {
    pub fn new(store: Arc<ItemStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ItemStore> {
        &self.store
    }

    pub async fn get_user_gold(&self, user: &str) -> u64 {
        self.store.get_item_quantity(user, SALOON_TOKEN).await
    }

    pub async fn set_user_gold(&self, user: &str, amount: u64) -> Result<u64, EconomyError> {
        self.set_balance(user, SALOON_TOKEN, amount).await
    }

    pub async fn add_user_gold(&self, user: &str, amount: u64) -> Result<u64, EconomyError> {
        Ok(self.store.add_item(user, SALOON_TOKEN, amount).await?.quantity)
    }

    pub async fn remove_user_gold(&self, user: &str, amount: u64) -> Result<u64, EconomyError> {
        Ok(self.store.remove_item(user, SALOON_TOKEN, amount).await?.remaining)
    }

    pub async fn transfer_gold(
        &self,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<TransferOutcome, EconomyError> {
        self.store.transfer_item(from, to, SALOON_TOKEN, amount).await
    }

    pub async fn get_user_silver(&self, user: &str) -> u64 {
        self.store.get_item_quantity(user, SILVER).await
    }

    pub async fn set_user_silver(&self, user: &str, amount: u64) -> Result<u64, EconomyError> {
        self.set_balance(user, SILVER, amount).await
    }

    pub async fn add_user_silver(&self, user: &str, amount: u64) -> Result<u64, EconomyError> {
        Ok(self.store.add_item(user, SILVER, amount).await?.quantity)
    }

    pub async fn remove_user_silver(&self, user: &str, amount: u64) -> Result<u64, EconomyError> {
        Ok(self.store.remove_item(user, SILVER, amount).await?.remaining)
    }

    pub async fn transfer_silver(
        &self,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<TransferOutcome, EconomyError> {
        self.store.transfer_item(from, to, SILVER, amount).await
    }

    async fn set_balance(
        &self,
        user: &str,
        currency: &str,
        amount: u64,
    ) -> Result<u64, EconomyError> {
        Ok(self.store.set_item_quantity(user, currency, amount).await?.quantity)
    }
}
