/// Per-user inventory record and the pure weight arithmetic around it.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::catalog::Catalog;
use crate::errors::EconomyError;

/// What one user carries. Absent items have quantity zero; zero entries are removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryRecord {
    #[serde(default)]
    pub items: BTreeMap<String, u64>,
    pub max_weight: f64,
}

impl InventoryRecord {
    pub fn new(max_weight: f64) -> Self {
        Self {
            items: BTreeMap::new(),
            max_weight,
        }
    }

    pub fn quantity(&self, item_id: &str) -> u64 {
        self.items.get(item_id).copied().unwrap_or(0)
    }

    /// Set the held quantity, deleting the entry at zero.
    pub fn set_quantity(&mut self, item_id: &str, quantity: u64) {
        if quantity == 0 {
            self.items.remove(item_id);
        } else {
            self.items.insert(item_id.to_string(), quantity);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Round to three decimals, the precision weights are stored and compared at.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Carried weight of `record`.
pub fn total_weight(record: &InventoryRecord, catalog: &Catalog) -> f64 {
    round3(
        record
            .items
            .iter()
            .map(|(id, qty)| catalog.weight_of(id) * *qty as f64)
            .sum(),
    )
}

/// Reject the change if carrying `new_weight` would exceed the backpack.
pub fn check_capacity(
    record: &InventoryRecord,
    current: f64,
    new_weight: f64,
) -> Result<(), EconomyError> {
    if new_weight > round3(record.max_weight) {
        return Err(EconomyError::CapacityExceeded {
            current,
            required: new_weight,
            max: record.max_weight,
        });
    }
    Ok(())
}

/// Add `quantity` units, enforcing capacity. Returns (new quantity, new weight).
/// The record is left untouched on error.
pub fn add_units(
    record: &mut InventoryRecord,
    catalog: &Catalog,
    item_id: &str,
    quantity: u64,
) -> Result<(u64, f64), EconomyError> {
    if quantity == 0 {
        return Err(EconomyError::InvalidQuantity);
    }
    let def = catalog.require(item_id)?;
    let held = record.quantity(item_id);
    let new_quantity = held.checked_add(quantity).ok_or(EconomyError::InvalidQuantity)?;

    let current = total_weight(record, catalog);
    let new_weight = round3(current + def.weight * quantity as f64);
    if def.weight > 0.0 {
        check_capacity(record, current, new_weight)?;
    }

    record.set_quantity(item_id, new_quantity);
    Ok((new_quantity, total_weight(record, catalog)))
}

/// Remove `quantity` units. Returns (remaining quantity, new weight).
/// The record is left untouched on error.
pub fn remove_units(
    record: &mut InventoryRecord,
    catalog: &Catalog,
    item_id: &str,
    quantity: u64,
) -> Result<(u64, f64), EconomyError> {
    if quantity == 0 {
        return Err(EconomyError::InvalidQuantity);
    }
    catalog.require(item_id)?;
    let held = record.quantity(item_id);
    if held < quantity {
        return Err(EconomyError::InsufficientQuantity {
            item_id: item_id.to_string(),
            held,
            requested: quantity,
        });
    }
    let remaining = held - quantity;
    record.set_quantity(item_id, remaining);
    Ok((remaining, total_weight(record, catalog)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::catalog::ItemDefinition;

    fn catalog() -> Catalog {
        Catalog::new([
            ItemDefinition::new("feather", "Feather", 0.001, true),
            ItemDefinition::new("brick", "Brick", 3.3, true),
            ItemDefinition::new("silver", "Silver", 0.0, true),
        ])
    }

    #[test]
    fn weight_is_rounded_to_three_decimals() {
        let mut record = InventoryRecord::new(100.0);
        record.set_quantity("brick", 3);
        assert_eq!(total_weight(&record, &catalog()), 9.9);
        assert_eq!(round3(0.1 + 0.2), 0.3);
    }

    #[test]
    fn add_respects_capacity_and_leaves_record_on_failure() {
        let catalog = catalog();
        let mut record = InventoryRecord::new(10.0);
        assert_eq!(add_units(&mut record, &catalog, "brick", 3).unwrap(), (3, 9.9));

        let err = add_units(&mut record, &catalog, "brick", 1).unwrap_err();
        assert_eq!(
            err,
            EconomyError::CapacityExceeded {
                current: 9.9,
                required: 13.2,
                max: 10.0
            }
        );
        assert_eq!(record.quantity("brick"), 3);
    }

    #[test]
    fn weightless_items_ignore_capacity() {
        let catalog = catalog();
        let mut record = InventoryRecord::new(0.5);
        assert_eq!(add_units(&mut record, &catalog, "silver", 1_000_000).unwrap().0, 1_000_000);
    }

    #[test]
    fn remove_deletes_zero_entries() {
        let catalog = catalog();
        let mut record = InventoryRecord::new(10.0);
        add_units(&mut record, &catalog, "feather", 2).unwrap();
        assert!(matches!(
            remove_units(&mut record, &catalog, "feather", 5),
            Err(EconomyError::InsufficientQuantity { held: 2, requested: 5, .. })
        ));
        assert_eq!(remove_units(&mut record, &catalog, "feather", 2).unwrap(), (0, 0.0));
        assert!(record.is_empty());
    }

    #[test]
    fn zero_and_unknown_rejected() {
        let catalog = catalog();
        let mut record = InventoryRecord::new(10.0);
        assert_eq!(
            add_units(&mut record, &catalog, "brick", 0),
            Err(EconomyError::InvalidQuantity)
        );
        assert_eq!(
            add_units(&mut record, &catalog, "ghost", 1),
            Err(EconomyError::ItemNotFound("ghost".into()))
        );
    }
}
