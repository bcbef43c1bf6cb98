//! Static item catalog: every item id the economy knows, with its weight.
//!
//! The catalog is loaded once at startup, either from the built-in table or from a
//! JSON seed file, and is read-only afterwards.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{EconomyError, StorageError};

/// Item id of the common currency.
pub const SILVER: &str = "silver";
/// Item id of the premium currency ("gold" in the currency facade).
pub const SALOON_TOKEN: &str = "saloon_token";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemDefinition {
    pub id: String,
    pub name: String,
    pub weight: f64,
    /// Display hint for front ends. Quantities are tracked the same way either way.
    #[serde(default = "default_stackable")]
    pub stackable: bool,
}

fn default_stackable() -> bool {
    true
}

impl ItemDefinition {
    pub fn new(id: &str, name: &str, weight: f64, stackable: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            weight,
            stackable,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    items: BTreeMap<String, ItemDefinition>,
}

impl Catalog {
    /// Build a catalog from definitions. Later duplicates replace earlier ones.
    pub fn new<I: IntoIterator<Item = ItemDefinition>>(items: I) -> Self {
        Self {
            items: items.into_iter().map(|def| (def.id.clone(), def)).collect(),
        }
    }

    /// Load a catalog seed file: a JSON array of item definitions.
    pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;

        let items: Vec<ItemDefinition> = serde_json::from_str(&contents).map_err(|e| {
            StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Failed to parse {}: {}", path.display(), e),
            ))
        })?;

        if let Some(bad) = items.iter().find(|d| !(d.weight.is_finite() && d.weight >= 0.0)) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{}: item {} has invalid weight {}", path.display(), bad.id, bad.weight),
            )));
        }

        log::info!("loaded {} catalog item(s) from {}", items.len(), path.display());
        Ok(Self::new(items))
    }

    pub fn get(&self, id: &str) -> Option<&ItemDefinition> {
        self.items.get(id)
    }

    /// Definition for `id`, or [`EconomyError::ItemNotFound`].
    pub fn require(&self, id: &str) -> Result<&ItemDefinition, EconomyError> {
        self.items
            .get(id)
            .ok_or_else(|| EconomyError::ItemNotFound(id.to_string()))
    }

    /// Unit weight of `id`; unknown ids weigh nothing.
    pub fn weight_of(&self, id: &str) -> f64 {
        self.items.get(id).map(|d| d.weight).unwrap_or(0.0)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new([
            ItemDefinition::new(SILVER, "Silver", 0.0, true),
            ItemDefinition::new(SALOON_TOKEN, "Saloon Token", 0.0, true),
            ItemDefinition::new("gold_nugget", "Gold Nugget", 0.5, true),
            ItemDefinition::new("whiskey", "Bottle of Whiskey", 1.25, true),
            ItemDefinition::new("rope", "Coil of Rope", 2.0, true),
            ItemDefinition::new("horseshoe", "Lucky Horseshoe", 0.75, true),
            ItemDefinition::new("revolver", "Six-Shooter", 2.5, false),
            ItemDefinition::new("saddle", "Leather Saddle", 12.0, false),
        ])
    }
}
