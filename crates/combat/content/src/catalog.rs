//! In-memory content catalog consulted during combat.

use std::collections::BTreeMap;

use combat_core::{Catalog, CombatEntity, DiceRoller, ItemDefinition, LootGrant, Spell};

use crate::bestiary::CreatureTemplate;
use crate::loot::LootTable;

/// Spells, items, loot tables and creature templates.
///
/// Lookups by key match an id or a display name, ignoring ASCII case.
#[derive(Clone, Debug, Default)]
pub struct ContentCatalog {
    spells: Vec<Spell>,
    items: Vec<ItemDefinition>,
    loot_tables: BTreeMap<String, LootTable>,
    creatures: Vec<CreatureTemplate>,
}

fn matches(key: &str, id: &str, name: &str) -> bool {
    id.eq_ignore_ascii_case(key) || name.eq_ignore_ascii_case(key)
}

impl ContentCatalog {
    pub fn new(
        spells: Vec<Spell>,
        items: Vec<ItemDefinition>,
        loot_tables: Vec<LootTable>,
        creatures: Vec<CreatureTemplate>,
    ) -> Self {
        Self {
            spells,
            items,
            loot_tables: loot_tables
                .into_iter()
                .map(|table| (table.id.clone(), table))
                .collect(),
            creatures,
        }
    }

    pub fn spells(&self) -> &[Spell] {
        &self.spells
    }

    pub fn items(&self) -> &[ItemDefinition] {
        &self.items
    }

    pub fn creatures(&self) -> &[CreatureTemplate] {
        &self.creatures
    }

    pub fn creature(&self, key: &str) -> Option<&CreatureTemplate> {
        self.creatures.iter().find(|c| matches(key, &c.id, &c.name))
    }

    pub fn loot_table(&self, id: &str) -> Option<&LootTable> {
        self.loot_tables.get(id)
    }

    /// Rolls the loot table of the template a combatant was spawned from.
    ///
    /// Combatants without a template or without a loot table drop nothing.
    pub fn roll_loot(&self, entity: &CombatEntity, dice: &mut dyn DiceRoller) -> Vec<LootGrant> {
        let table = entity
            .template
            .as_deref()
            .and_then(|template| self.creature(template))
            .and_then(|creature| creature.loot_table.as_deref())
            .and_then(|id| self.loot_table(id));
        match table {
            Some(table) => table.roll(&entity.combat_name, dice),
            None => Vec::new(),
        }
    }
}

impl Catalog for ContentCatalog {
    fn spell(&self, key: &str) -> Option<&Spell> {
        self.spells.iter().find(|s| matches(key, &s.id, &s.name))
    }

    fn item(&self, key: &str) -> Option<&ItemDefinition> {
        self.items.iter().find(|i| matches(key, &i.id, &i.name))
    }
}
