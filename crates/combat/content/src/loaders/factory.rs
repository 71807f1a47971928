//! Content factory for building the combat catalog from data files.

use std::path::{Path, PathBuf};

use combat_core::{Catalog, ItemDefinition, Spell};

use crate::bestiary::CreatureTemplate;
use crate::catalog::ContentCatalog;
use crate::loaders::{BestiaryLoader, ItemLoader, LoadResult, LootLoader, SpellLoader};
use crate::loot::LootTable;

const BUILTIN_SPELLS: &str = include_str!("../../data/spells.ron");
const BUILTIN_ITEMS: &str = include_str!("../../data/items.ron");
const BUILTIN_LOOT: &str = include_str!("../../data/loot.ron");
const BUILTIN_BESTIARY: &str = include_str!("../../data/bestiary.ron");

/// Content factory that loads all combat content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── spells.ron
/// ├── items.ron
/// ├── loot.ron
/// └── bestiary.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Catalog built from the data files compiled into this crate.
    pub fn builtin() -> LoadResult<ContentCatalog> {
        assemble(
            SpellLoader::parse(BUILTIN_SPELLS)?,
            ItemLoader::parse(BUILTIN_ITEMS)?,
            LootLoader::parse(BUILTIN_LOOT)?,
            BestiaryLoader::parse(BUILTIN_BESTIARY)?,
        )
    }

    /// Load spells from `spells.ron`.
    pub fn load_spells(&self) -> LoadResult<Vec<Spell>> {
        SpellLoader::load(&self.data_dir.join("spells.ron"))
    }

    /// Load item catalog from `items.ron`.
    pub fn load_items(&self) -> LoadResult<Vec<ItemDefinition>> {
        ItemLoader::load(&self.data_dir.join("items.ron"))
    }

    /// Load loot tables from `loot.ron`.
    pub fn load_loot(&self) -> LoadResult<Vec<LootTable>> {
        LootLoader::load(&self.data_dir.join("loot.ron"))
    }

    /// Load creature templates from `bestiary.ron`.
    pub fn load_bestiary(&self) -> LoadResult<Vec<CreatureTemplate>> {
        BestiaryLoader::load(&self.data_dir.join("bestiary.ron"))
    }

    /// Loads every file and checks cross references between them.
    pub fn load_catalog(&self) -> LoadResult<ContentCatalog> {
        assemble(
            self.load_spells()?,
            self.load_items()?,
            self.load_loot()?,
            self.load_bestiary()?,
        )
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Builds a catalog, rejecting dangling item, spell and loot table ids.
fn assemble(
    spells: Vec<Spell>,
    items: Vec<ItemDefinition>,
    loot: Vec<LootTable>,
    creatures: Vec<CreatureTemplate>,
) -> LoadResult<ContentCatalog> {
    let catalog = ContentCatalog::new(spells, items, loot, creatures);

    for creature in catalog.creatures() {
        if let Some(table) = &creature.loot_table
            && catalog.loot_table(table).is_none()
        {
            anyhow::bail!(
                "Creature '{}' references unknown loot table '{}'",
                creature.id,
                table
            );
        }
        if let Some(spell) = creature.spells.iter().find(|s| catalog.spell(s).is_none()) {
            anyhow::bail!(
                "Creature '{}' references unknown spell '{}'",
                creature.id,
                spell
            );
        }
    }
    for creature in catalog.creatures() {
        let Some(table) = creature.loot_table.as_deref().and_then(|t| catalog.loot_table(t))
        else {
            continue;
        };
        if let Some(entry) = table.entries.iter().find(|e| catalog.item(&e.item).is_none()) {
            anyhow::bail!(
                "Loot table '{}' references unknown item '{}'",
                table.id,
                entry.item
            );
        }
    }

    tracing::debug!(
        target: "combat::content",
        spells = catalog.spells().len(),
        items = catalog.items().len(),
        creatures = catalog.creatures().len(),
        "loaded content catalog"
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use combat_core::{DamageType, ItemEffect, ScriptedDice, Side, SpellRole};

    #[test]
    fn test_factory_paths() {
        let factory = ContentFactory::new("/tmp/data");
        assert_eq!(factory.data_dir(), Path::new("/tmp/data"));
    }

    #[test]
    fn builtin_catalog_parses() {
        let catalog = ContentFactory::builtin().unwrap();

        let firebolt = catalog.spell("Firebolt").unwrap();
        assert_eq!(firebolt.role, SpellRole::Offensive);
        assert_eq!(firebolt.damage_type, DamageType::Fire);
        assert_eq!(firebolt.dice.map(|d| d.to_string()).as_deref(), Some("1d10"));
        assert_eq!(catalog.spell("light").unwrap().role, SpellRole::Utility);

        let potion = catalog.item("healing potion").unwrap();
        assert!(matches!(potion.effects[0], ItemEffect::Heal(_)));
        assert!(catalog.item("alchemist_fire").unwrap().is_offensive());
        assert!(!catalog.item("wolf_pelt").unwrap().combat_usable);

        let cultist = catalog.creature("Cultist").unwrap();
        assert_eq!(cultist.sheet.resistance(DamageType::Fire), -25);
        assert_eq!(cultist.spells, vec!["firebolt", "mend"]);
    }

    #[test]
    fn builtin_goblin_drops_coins() {
        let catalog = ContentFactory::builtin().unwrap();
        let (goblin, _) = catalog.creature("goblin").unwrap().spawn("goblin_1", Side::Enemy);
        // Coins 3, dagger misses (d100 90), potion misses (d100 50).
        let grants = catalog.roll_loot(&goblin, &mut ScriptedDice::new([3, 90, 50]));
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].item, "copper_coin");
        assert_eq!(grants[0].quantity, 3);
        assert_eq!(grants[0].source_name, "Goblin");
    }

    #[test]
    fn loads_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("spells.ron"), BUILTIN_SPELLS).unwrap();
        std::fs::write(dir.path().join("items.ron"), BUILTIN_ITEMS).unwrap();
        std::fs::write(dir.path().join("loot.ron"), BUILTIN_LOOT).unwrap();
        std::fs::write(dir.path().join("bestiary.ron"), BUILTIN_BESTIARY).unwrap();

        let catalog = ContentFactory::new(dir.path()).load_catalog().unwrap();
        assert!(catalog.creature("ogre").is_some());
    }

    #[test]
    fn dangling_loot_table_is_rejected() {
        let bestiary = r#"(creatures: [(id: "rat", name: "Rat", hp: 3, loot_table: Some("rat"))])"#;
        let err = assemble(
            Vec::new(),
            Vec::new(),
            Vec::new(),
            BestiaryLoader::parse(bestiary).unwrap(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown loot table 'rat'"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = ContentFactory::new(dir.path()).load_spells().unwrap_err();
        assert!(err.to_string().contains("spells.ron"));
    }
}
