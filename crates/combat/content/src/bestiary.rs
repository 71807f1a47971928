//! Creature templates that encounters are populated from.

use combat_core::{CombatEntity, DiceNotation, EntityId, Side, StatSheet};

/// Static description of a kind of combatant.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CreatureTemplate {
    pub id: String,
    pub name: String,
    pub hp: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub mp: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub stamina: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub sheet: StatSheet,
    /// Damage dice of the creature's basic attack.
    #[cfg_attr(feature = "serde", serde(default))]
    pub weapon: Option<DiceNotation>,
    /// Spell ids the creature may cast.
    #[cfg_attr(feature = "serde", serde(default))]
    pub spells: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub loot_table: Option<String>,
}

impl CreatureTemplate {
    /// Builds a fresh combatant and its stat sheet from this template.
    pub fn spawn(&self, id: impl Into<EntityId>, side: Side) -> (CombatEntity, StatSheet) {
        let entity = CombatEntity::new(id, self.name.clone(), side)
            .with_hp(self.hp, self.hp)
            .with_mp(self.mp, self.mp)
            .with_stamina(self.stamina, self.stamina)
            .with_template(self.id.clone());
        (entity, self.sheet.clone())
    }
}
