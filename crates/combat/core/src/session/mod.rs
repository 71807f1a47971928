//! The combat session aggregate.
//!
//! [`CombatSession`] is plain state: entities, turn order, the flow's step
//! position, the outcome, the AP pool and the transcript. The flow in
//! `combat-runtime` drives it; everything here is deterministic and
//! synchronous.
//!
//! Once [`CombatSession::state`] is concluded no further combat resource
//! mutation is permitted. [`crate::handlers::resolve`] refuses to run on a
//! concluded session, and status ticking checks the same flag.

mod names;
mod record;
mod step;
mod turn;

pub use names::assign_combat_names;
pub use record::SessionRecord;
pub use step::{CombatState, CombatStep};
pub use turn::TurnAdvance;

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::action::{ActionResult, CombatAction};
use crate::display::LogEntry;
use crate::entity::{CombatEntity, EntityId, Side};
use crate::error::{CombatError, ErrorSeverity};

/// Errors raised while preparing or restoring a session.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("entity id {0} appears more than once")]
    DuplicateEntity(EntityId),

    #[error("encounter has no player-side combatant")]
    NoPlayerSide,

    #[error("encounter has no opponents")]
    NoOpponents,

    #[error("turn order references unknown entity {0}")]
    UnknownTurnEntry(EntityId),

    #[error("turn index {index} out of range for {len} combatants")]
    TurnIndexOutOfRange { index: usize, len: usize },

    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),
}

impl CombatError for SessionError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NoPlayerSide | Self::NoOpponents | Self::DuplicateEntity(_) => {
                ErrorSeverity::Validation
            }
            Self::UnknownTurnEntry(_)
            | Self::TurnIndexOutOfRange { .. }
            | Self::UnknownEntity(_) => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateEntity(_) => "SESSION_DUPLICATE_ENTITY",
            Self::NoPlayerSide => "SESSION_NO_PLAYER_SIDE",
            Self::NoOpponents => "SESSION_NO_OPPONENTS",
            Self::UnknownTurnEntry(_) => "SESSION_UNKNOWN_TURN_ENTRY",
            Self::TurnIndexOutOfRange { .. } => "SESSION_TURN_INDEX",
            Self::UnknownEntity(_) => "SESSION_UNKNOWN_ENTITY",
        }
    }
}

/// Ambush declared when combat is initiated.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Surprise {
    /// The combatant acting in the surprise round.
    pub attacker: EntityId,
    /// Intent text that triggered the ambush, if any.
    pub intent: Option<String>,
}

/// State of one encounter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CombatSession {
    /// Changes whenever a new encounter replaces the active one.
    pub encounter_id: u64,
    pub entities: BTreeMap<EntityId, CombatEntity>,
    /// Insertion order of `entities`, used for stable iteration in output.
    pub roster: Vec<EntityId>,
    /// Fixed once initiative is rolled; entities out of play are skipped.
    pub turn_order: Vec<EntityId>,
    pub round_number: u32,
    pub current_turn_index: usize,
    pub current_step: CombatStep,
    pub state: CombatState,
    pub ap_pool: BTreeMap<EntityId, u32>,
    pub combat_log: Vec<LogEntry>,
    /// Combatants that left by fleeing (alive, inactive).
    pub fled: BTreeSet<EntityId>,
    pub surprise: Option<Surprise>,
    /// Intent text of the current actor awaiting narration.
    pub pending_intent: Option<String>,
    /// Actions of the current actor not yet resolved.
    pub pending_actions: VecDeque<CombatAction>,
    pub last_result: Option<ActionResult>,
    /// Set when the encounter was ended by an internal failure.
    pub fatal_error: Option<String>,
}

impl CombatSession {
    /// Prepares an encounter: validates the roster and assigns combat names.
    pub fn prepare(encounter_id: u64, mut entities: Vec<CombatEntity>) -> Result<Self, SessionError> {
        if !entities.iter().any(|e| e.side.is_player_team()) {
            return Err(SessionError::NoPlayerSide);
        }
        if !entities.iter().any(|e| e.side == Side::Enemy) {
            return Err(SessionError::NoOpponents);
        }

        assign_combat_names(&mut entities);

        let mut map = BTreeMap::new();
        let mut roster = Vec::with_capacity(entities.len());
        for entity in entities {
            let id = entity.id.clone();
            if map.insert(id.clone(), entity).is_some() {
                return Err(SessionError::DuplicateEntity(id));
            }
            roster.push(id);
        }

        Ok(Self {
            encounter_id,
            entities: map,
            roster,
            turn_order: Vec::new(),
            round_number: 0,
            current_turn_index: 0,
            current_step: CombatStep::NotStarted,
            state: CombatState::NotStarted,
            ap_pool: BTreeMap::new(),
            combat_log: Vec::new(),
            fled: BTreeSet::new(),
            surprise: None,
            pending_intent: None,
            pending_actions: VecDeque::new(),
            last_result: None,
            fatal_error: None,
        })
    }

    #[must_use]
    pub fn with_surprise(mut self, surprise: Surprise) -> Self {
        self.surprise = Some(surprise);
        self
    }

    pub fn entity(&self, id: &EntityId) -> Option<&CombatEntity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: &EntityId) -> Option<&mut CombatEntity> {
        self.entities.get_mut(id)
    }

    /// Entities in roster order.
    pub fn iter(&self) -> impl Iterator<Item = &CombatEntity> {
        self.roster.iter().filter_map(|id| self.entities.get(id))
    }

    /// The controllable player character, if present.
    pub fn player(&self) -> Option<&CombatEntity> {
        self.iter().find(|e| e.side == Side::Player)
    }

    /// Resolves a per-encounter display name to an entity id.
    ///
    /// Matches the combat name first, then the base name when it is
    /// unambiguous, then the raw id. Case-insensitive.
    pub fn find_by_name(&self, name: &str) -> Option<&EntityId> {
        let name = name.trim();
        if let Some(entity) = self
            .iter()
            .find(|e| e.combat_name.eq_ignore_ascii_case(name))
        {
            return Some(&entity.id);
        }

        let mut base = self.iter().filter(|e| e.name.eq_ignore_ascii_case(name));
        if let (Some(only), None) = (base.next(), base.next()) {
            return Some(&only.id);
        }

        self.roster.iter().find(|id| id.as_str().eq_ignore_ascii_case(name))
    }

    /// Combat name of an entity, falling back to its id.
    pub fn display_name(&self, id: &EntityId) -> String {
        self.entities
            .get(id)
            .map(|e| e.combat_name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Living, active combatants opposing `side`, in roster order.
    pub fn living_opponents(&self, side: Side) -> impl Iterator<Item = &CombatEntity> {
        self.iter().filter(move |e| e.side.opposes(side) && e.can_act())
    }

    /// Living, active combatants on the same team as `side`.
    pub fn living_allies(&self, side: Side) -> impl Iterator<Item = &CombatEntity> {
        self.iter()
            .filter(move |e| e.side.is_player_team() == side.is_player_team() && e.can_act())
    }

    pub fn is_concluded(&self) -> bool {
        self.state.is_concluded()
    }

    /// Appends a line to the transcript.
    pub fn log(&mut self, entry: LogEntry) {
        self.combat_log.push(entry);
    }

    /// Removes the current actor's in-flight turn data.
    pub fn clear_turn_scratch(&mut self) {
        self.pending_intent = None;
        self.pending_actions.clear();
    }

    /// Records an internal failure and moves the flow to its ending step.
    pub fn abort(&mut self, reason: impl Into<String>) {
        self.fatal_error = Some(reason.into());
        self.clear_turn_scratch();
        if !self.current_step.is_terminal() {
            self.current_step = CombatStep::EndingCombat;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<CombatEntity> {
        vec![
            CombatEntity::new("hero", "Hero", Side::Player).with_hp(30, 30),
            CombatEntity::new("g1", "Goblin", Side::Enemy).with_hp(10, 10),
            CombatEntity::new("g2", "Goblin", Side::Enemy).with_hp(10, 10),
        ]
    }

    #[test]
    fn prepare_rejects_duplicate_ids() {
        let mut entities = roster();
        entities.push(CombatEntity::new("g1", "Orc", Side::Enemy));
        assert_eq!(
            CombatSession::prepare(1, entities),
            Err(SessionError::DuplicateEntity(EntityId::new("g1")))
        );
    }

    #[test]
    fn prepare_requires_both_sides() {
        let heroes = vec![CombatEntity::new("hero", "Hero", Side::Player)];
        assert_eq!(
            CombatSession::prepare(1, heroes),
            Err(SessionError::NoOpponents)
        );
    }

    #[test]
    fn names_resolve_to_ids() {
        let session = CombatSession::prepare(1, roster()).unwrap();
        assert_eq!(session.find_by_name("goblin 2"), Some(&EntityId::new("g2")));
        assert_eq!(session.find_by_name("Hero"), Some(&EntityId::new("hero")));
        // Ambiguous base name.
        assert_eq!(session.find_by_name("Goblin"), None);
        assert_eq!(session.find_by_name("g1"), Some(&EntityId::new("g1")));
    }

    #[test]
    fn abort_moves_to_ending_step() {
        let mut session = CombatSession::prepare(1, roster()).unwrap();
        session.current_step = CombatStep::ResolvingActionMechanics;
        session.abort("boom");
        assert_eq!(session.current_step, CombatStep::EndingCombat);
        assert_eq!(session.fatal_error.as_deref(), Some("boom"));
    }
}
