//! Inventory collaborator boundary.
//!
//! Inventory management is owned outside the combat layer. Combat only
//! consumes item charges, grants loot after victory, and moves a surrendering
//! combatant's belongings to the captor.

use std::collections::BTreeMap;

use crate::entity::EntityId;
use crate::error::{CombatError, ErrorSeverity};

/// Quantity of one item id.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemStack {
    pub item: String,
    pub quantity: u32,
}

impl ItemStack {
    pub fn new(item: impl Into<String>, quantity: u32) -> Self {
        Self {
            item: item.into(),
            quantity,
        }
    }
}

/// Item handed to a recipient, tagged with where it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LootGrant {
    pub item: String,
    pub quantity: u32,
    /// Combat name of the defeated or surrendering combatant.
    pub source_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("inventory for {0} is unavailable")]
    Unavailable(EntityId),

    #[error("inventory rejected the transfer: {0}")]
    Rejected(String),
}

impl CombatError for InventoryError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "INVENTORY_UNAVAILABLE",
            Self::Rejected(_) => "INVENTORY_REJECTED",
        }
    }
}

/// Operations the combat layer needs from the inventory system.
pub trait Inventory: Send {
    /// Number of `item` carried by `owner`.
    fn count(&self, owner: &EntityId, item: &str) -> u32;

    /// Removes one charge of `item`; false if the owner has none.
    fn consume(&mut self, owner: &EntityId, item: &str) -> bool;

    /// Adds granted items to `recipient`.
    fn grant(&mut self, recipient: &EntityId, grants: &[LootGrant]) -> Result<(), InventoryError>;

    /// Empties `owner`'s inventory and returns what it held.
    fn take_all(&mut self, owner: &EntityId) -> Result<Vec<ItemStack>, InventoryError>;
}

/// In-memory inventory keyed by entity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MemoryInventory {
    owners: BTreeMap<EntityId, BTreeMap<String, u32>>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_item(mut self, owner: impl Into<EntityId>, item: impl Into<String>, quantity: u32) -> Self {
        self.add(&owner.into(), item, quantity);
        self
    }

    pub fn add(&mut self, owner: &EntityId, item: impl Into<String>, quantity: u32) {
        if quantity == 0 {
            return;
        }
        *self
            .owners
            .entry(owner.clone())
            .or_default()
            .entry(item.into())
            .or_insert(0) += quantity;
    }

    /// Items held by `owner`, ordered by item id.
    pub fn items(&self, owner: &EntityId) -> Vec<ItemStack> {
        self.owners
            .get(owner)
            .map(|items| {
                items
                    .iter()
                    .map(|(item, quantity)| ItemStack::new(item.clone(), *quantity))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Inventory for MemoryInventory {
    fn count(&self, owner: &EntityId, item: &str) -> u32 {
        self.owners
            .get(owner)
            .and_then(|items| items.get(item))
            .copied()
            .unwrap_or(0)
    }

    fn consume(&mut self, owner: &EntityId, item: &str) -> bool {
        let Some(items) = self.owners.get_mut(owner) else {
            return false;
        };
        match items.get_mut(item) {
            Some(quantity) if *quantity > 1 => {
                *quantity -= 1;
                true
            }
            Some(_) => {
                items.remove(item);
                true
            }
            None => false,
        }
    }

    fn grant(&mut self, recipient: &EntityId, grants: &[LootGrant]) -> Result<(), InventoryError> {
        for grant in grants {
            self.add(recipient, grant.item.clone(), grant.quantity);
        }
        Ok(())
    }

    fn take_all(&mut self, owner: &EntityId) -> Result<Vec<ItemStack>, InventoryError> {
        let items = self.items(owner);
        self.owners.remove(owner);
        Ok(items)
    }
}
