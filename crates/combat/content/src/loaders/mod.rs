//! Content loaders for reading combat data from RON files.

pub mod bestiary;
pub mod factory;
pub mod item;
pub mod loot;
pub mod spell;

pub use bestiary::BestiaryLoader;
pub use factory::ContentFactory;
pub use item::ItemLoader;
pub use loot::LootLoader;
pub use spell::SpellLoader;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}

/// Parses RON text, naming the kind of document in the error.
pub(crate) fn parse_ron<T: serde::de::DeserializeOwned>(content: &str, what: &str) -> LoadResult<T> {
    ron::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse {} RON: {}", what, e))
}
