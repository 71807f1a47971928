//! Assembles the combatants and stat sheets of an encounter.

use combat_core::{
    CombatEntity, EntityId, Side, StatSheet, StatsError, StatsProvider, StatsRegistry,
};

use crate::catalog::ContentCatalog;

/// Error raised while assembling an encounter.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EncounterError {
    #[error("unknown creature template '{0}'")]
    UnknownCreature(String),

    #[error("entity '{0}' was added twice")]
    DuplicateEntity(EntityId),

    #[error(transparent)]
    Stats(#[from] StatsError),
}

/// Combatants ready to be handed to a combat session.
#[derive(Clone, Debug, Default)]
pub struct PreparedEncounter {
    /// Roster order: the order combatants were added in.
    pub entities: Vec<CombatEntity>,
    pub stats: StatsRegistry,
}

/// Builder collecting hand-made and template-spawned combatants.
///
/// Template spawns get ids `"{template}_{n}"` numbered per template from 1.
/// Display names are left as the template name; per-encounter names are
/// assigned when the session is prepared.
pub struct EncounterBuilder<'a> {
    content: &'a ContentCatalog,
    prepared: PreparedEncounter,
}

impl<'a> EncounterBuilder<'a> {
    pub fn new(content: &'a ContentCatalog) -> Self {
        Self {
            content,
            prepared: PreparedEncounter::default(),
        }
    }

    /// Adds a combatant with an explicit stat sheet.
    pub fn combatant(
        mut self,
        entity: CombatEntity,
        sheet: StatSheet,
    ) -> Result<Self, EncounterError> {
        if self.prepared.stats.contains(&entity.id) {
            return Err(EncounterError::DuplicateEntity(entity.id));
        }
        self.prepared.stats.insert(entity.id.clone(), sheet);
        self.prepared.stats.sync_from_entity(&entity, None)?;
        self.prepared.entities.push(entity);
        Ok(self)
    }

    /// Spawns `count` combatants from a creature template.
    pub fn spawn(mut self, template: &str, side: Side, count: usize) -> Result<Self, EncounterError> {
        let creature = self
            .content
            .creature(template)
            .ok_or_else(|| EncounterError::UnknownCreature(template.to_string()))?;
        let mut next = self
            .prepared
            .entities
            .iter()
            .filter(|e| e.template.as_deref() == Some(creature.id.as_str()))
            .count()
            + 1;
        for _ in 0..count {
            let mut id = EntityId::new(format!("{}_{next}", creature.id));
            while self.prepared.stats.contains(&id) {
                next += 1;
                id = EntityId::new(format!("{}_{next}", creature.id));
            }
            let (entity, sheet) = creature.spawn(id, side);
            self = self.combatant(entity, sheet)?;
            next += 1;
        }
        Ok(self)
    }

    /// Spawns enemies from a template.
    pub fn enemies(self, template: &str, count: usize) -> Result<Self, EncounterError> {
        self.spawn(template, Side::Enemy, count)
    }

    pub fn build(self) -> PreparedEncounter {
        tracing::debug!(
            target: "combat::content",
            combatants = self.prepared.entities.len(),
            "prepared encounter"
        );
        self.prepared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bestiary::CreatureTemplate;
    use combat_core::ResourceKind;

    fn content() -> ContentCatalog {
        let goblin = CreatureTemplate {
            id: "goblin".into(),
            name: "Goblin".into(),
            hp: 20,
            mp: 0,
            stamina: 10,
            sheet: StatSheet::new(1),
            weapon: None,
            spells: Vec::new(),
            loot_table: None,
        };
        ContentCatalog::new(Vec::new(), Vec::new(), Vec::new(), vec![goblin])
    }

    #[test]
    fn spawns_numbered_ids_and_mirrors_stats() {
        let content = content();
        let hero = CombatEntity::new("hero", "Hero", Side::Player).with_hp(100, 100);
        let prepared = EncounterBuilder::new(&content)
            .combatant(hero, StatSheet::new(3))
            .unwrap()
            .enemies("Goblin", 2)
            .unwrap()
            .build();

        let ids: Vec<_> = prepared.entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["hero", "goblin_1", "goblin_2"]);
        let goblin = EntityId::new("goblin_2");
        assert_eq!(prepared.stats.current(&goblin, ResourceKind::Health), Ok(20));
    }

    #[test]
    fn unknown_template_is_an_error() {
        let content = content();
        let result = EncounterBuilder::new(&content).enemies("dragon", 1);
        assert!(matches!(result, Err(EncounterError::UnknownCreature(name)) if name == "dragon"));
    }

    #[test]
    fn duplicate_combatant_is_an_error() {
        let content = content();
        let result = EncounterBuilder::new(&content)
            .combatant(CombatEntity::new("hero", "Hero", Side::Player), StatSheet::new(1))
            .unwrap()
            .combatant(CombatEntity::new("hero", "Hero", Side::Player), StatSheet::new(1));
        assert!(matches!(result, Err(EncounterError::DuplicateEntity(_))));
    }
}
