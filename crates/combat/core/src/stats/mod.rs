//! Stats collaborator: canonical attributes, defenses and skill checks.
//!
//! The stat sheet owns everything that does not change during an encounter
//! (attributes, armor, resistances, proficiencies). Current resource levels
//! are owned by [`CombatEntity`]; the sheet keeps a mirrored copy that is
//! refreshed through [`StatsProvider::sync_from_entity`] after each mutation
//! so that external systems reading the sheet see the same numbers. Writes
//! only ever flow entity -> sheet.

mod check;
mod sheet;

pub use check::{Naturals, RollMode, SkillCheck, SkillCheckOutcome, roll_d20};
pub use sheet::{Attribute, DamageType, StatSheet};

use std::collections::BTreeMap;

use crate::dice::DiceRoller;
use crate::entity::{CombatEntity, EntityId, ResourceKind, ResourceMeter};
use crate::error::{CombatError, ErrorSeverity};

/// Errors raised by the stats collaborator.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StatsError {
    #[error("no stat sheet registered for entity {0}")]
    MissingSheet(EntityId),
}

impl CombatError for StatsError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            // A combatant without stats means the encounter was prepared wrong.
            Self::MissingSheet(_) => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingSheet(_) => "STATS_MISSING_SHEET",
        }
    }
}

/// Interface the combat layer uses to read stats and mirror resources.
pub trait StatsProvider {
    /// Returns the stat sheet of an entity.
    fn sheet(&self, entity: &EntityId) -> Result<&StatSheet, StatsError>;

    /// Current value of a mirrored resource.
    fn current(&self, entity: &EntityId, kind: ResourceKind) -> Result<u32, StatsError> {
        Ok(self.sheet(entity)?.resource(kind).current)
    }

    /// Maximum value of a mirrored resource.
    fn maximum(&self, entity: &EntityId, kind: ResourceKind) -> Result<u32, StatsError> {
        Ok(self.sheet(entity)?.resource(kind).maximum)
    }

    /// Overwrites a mirrored resource value.
    fn set_current(
        &mut self,
        entity: &EntityId,
        kind: ResourceKind,
        value: u32,
    ) -> Result<(), StatsError>;

    /// Overwrites a mirrored resource maximum.
    fn set_maximum(
        &mut self,
        entity: &EntityId,
        kind: ResourceKind,
        value: u32,
    ) -> Result<(), StatsError>;

    /// Rolls a skill check for an entity.
    fn perform_skill_check(
        &self,
        entity: &EntityId,
        check: &SkillCheck,
        dice: &mut dyn DiceRoller,
    ) -> Result<SkillCheckOutcome, StatsError> {
        Ok(check.resolve(self.sheet(entity)?, dice))
    }

    /// Mirrors resources and status names from the authoritative entity.
    fn sync_from_entity(
        &mut self,
        entity: &CombatEntity,
        action_points: Option<u32>,
    ) -> Result<(), StatsError>;
}

/// In-memory stats collaborator keyed by entity id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct StatsRegistry {
    sheets: BTreeMap<EntityId, StatSheet>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: EntityId, sheet: StatSheet) -> Option<StatSheet> {
        self.sheets.insert(entity, sheet)
    }

    pub fn remove(&mut self, entity: &EntityId) -> Option<StatSheet> {
        self.sheets.remove(entity)
    }

    pub fn contains(&self, entity: &EntityId) -> bool {
        self.sheets.contains_key(entity)
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    fn sheet_mut(&mut self, entity: &EntityId) -> Result<&mut StatSheet, StatsError> {
        self.sheets
            .get_mut(entity)
            .ok_or_else(|| StatsError::MissingSheet(entity.clone()))
    }
}

impl StatsProvider for StatsRegistry {
    fn sheet(&self, entity: &EntityId) -> Result<&StatSheet, StatsError> {
        self.sheets
            .get(entity)
            .ok_or_else(|| StatsError::MissingSheet(entity.clone()))
    }

    fn set_current(
        &mut self,
        entity: &EntityId,
        kind: ResourceKind,
        value: u32,
    ) -> Result<(), StatsError> {
        self.sheet_mut(entity)?.resource_mut(kind).set_current(value);
        Ok(())
    }

    fn set_maximum(
        &mut self,
        entity: &EntityId,
        kind: ResourceKind,
        value: u32,
    ) -> Result<(), StatsError> {
        self.sheet_mut(entity)?.resource_mut(kind).set_maximum(value);
        Ok(())
    }

    fn sync_from_entity(
        &mut self,
        entity: &CombatEntity,
        action_points: Option<u32>,
    ) -> Result<(), StatsError> {
        let sheet = self.sheet_mut(&entity.id)?;
        sheet.mirror(ResourceKind::Health, entity.hp);
        sheet.mirror(ResourceKind::Mana, entity.mp);
        sheet.mirror(ResourceKind::Stamina, entity.stamina);
        if let Some(ap) = action_points {
            let maximum = sheet.resource(ResourceKind::ActionPoints).maximum.max(ap);
            sheet.mirror(ResourceKind::ActionPoints, ResourceMeter::new(ap, maximum));
        }
        sheet.statuses = entity
            .status_effects
            .iter()
            .map(|(name, _)| name.to_string())
            .collect();
        Ok(())
    }
}
