//! Data-driven combat content and loaders.
//!
//! This crate houses the static data an encounter draws on and the loaders
//! for its RON files:
//! - Spell catalog
//! - Item catalog (combat consumables and loot-only items)
//! - Loot tables rolled for defeated enemies
//! - Creature templates (bestiary) used to populate encounters
//!
//! [`ContentCatalog`] implements [`combat_core::Catalog`] so the resolution
//! handlers can consult it directly.

pub mod bestiary;
pub mod catalog;
pub mod encounter;
pub mod loot;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use bestiary::CreatureTemplate;
pub use catalog::ContentCatalog;
pub use encounter::{EncounterBuilder, EncounterError, PreparedEncounter};
pub use loot::{LootEntry, LootTable};

#[cfg(feature = "loaders")]
pub use loaders::{BestiaryLoader, ContentFactory, ItemLoader, LoadResult, LootLoader, SpellLoader};
