//! Creature template loader.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bestiary::CreatureTemplate;
use crate::loaders::{LoadResult, parse_ron, read_file};

/// Bestiary structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bestiary {
    pub creatures: Vec<CreatureTemplate>,
}

/// Loader for creature templates from RON files.
pub struct BestiaryLoader;

impl BestiaryLoader {
    pub fn load(path: &Path) -> LoadResult<Vec<CreatureTemplate>> {
        Self::parse(&read_file(path)?)
    }

    pub fn parse(content: &str) -> LoadResult<Vec<CreatureTemplate>> {
        let bestiary: Bestiary = parse_ron(content, "bestiary")?;
        if let Some(creature) = bestiary.creatures.iter().find(|c| c.hp == 0) {
            anyhow::bail!("Creature '{}' has no hit points", creature.id);
        }
        Ok(bestiary.creatures)
    }
}
