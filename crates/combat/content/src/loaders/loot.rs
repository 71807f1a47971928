//! Loot table loader.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, parse_ron, read_file};
use crate::loot::LootTable;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LootCatalog {
    pub tables: Vec<LootTable>,
}

pub struct LootLoader;

impl LootLoader {
    pub fn load(path: &Path) -> LoadResult<Vec<LootTable>> {
        Self::parse(&read_file(path)?)
    }

    /// Parses loot tables; table ids must be unique and chances at most 100.
    pub fn parse(content: &str) -> LoadResult<Vec<LootTable>> {
        let catalog: LootCatalog = parse_ron(content, "loot table")?;
        let mut seen = BTreeSet::new();
        for table in &catalog.tables {
            if !seen.insert(table.id.as_str()) {
                anyhow::bail!("Duplicate loot table '{}'", table.id);
            }
            if let Some(entry) = table.entries.iter().find(|e| e.chance > 100) {
                anyhow::bail!(
                    "Loot table '{}' gives '{}' a chance of {}%",
                    table.id,
                    entry.item,
                    entry.chance
                );
            }
        }
        Ok(catalog.tables)
    }
}
