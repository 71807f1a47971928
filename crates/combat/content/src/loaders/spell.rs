//! Spell catalog loader.

use std::path::Path;

use combat_core::Spell;
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, parse_ron, read_file};

/// Spell catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellCatalog {
    pub spells: Vec<Spell>,
}

/// Loader for spell catalog from RON files.
pub struct SpellLoader;

impl SpellLoader {
    /// Load spell catalog from a RON file.
    pub fn load(path: &Path) -> LoadResult<Vec<Spell>> {
        Self::parse(&read_file(path)?)
    }

    pub fn parse(content: &str) -> LoadResult<Vec<Spell>> {
        let catalog: SpellCatalog = parse_ron(content, "spell catalog")?;
        Ok(catalog.spells)
    }
}
