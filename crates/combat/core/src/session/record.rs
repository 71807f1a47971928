use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::action::{ActionResult, CombatAction};
use crate::display::LogEntry;
use crate::entity::{CombatEntity, EntityId};
use crate::session::{CombatSession, CombatState, CombatStep, SessionError, Surprise};

/// Persisted form of a [`CombatSession`].
///
/// Captures everything needed to resume mid-round, including the flow's
/// step position and the current actor's unresolved actions.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionRecord {
    pub encounter_id: u64,
    /// Entities in roster order.
    pub entities: Vec<CombatEntity>,
    pub turn_order: Vec<EntityId>,
    pub current_turn_index: usize,
    pub round_number: u32,
    pub state: CombatState,
    pub current_step: CombatStep,
    pub combat_log: Vec<LogEntry>,
    pub ap_pool: BTreeMap<EntityId, u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub fled: BTreeSet<EntityId>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub surprise: Option<Surprise>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pending_intent: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pending_actions: VecDeque<CombatAction>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub last_result: Option<ActionResult>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub fatal_error: Option<String>,
}

impl CombatSession {
    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            encounter_id: self.encounter_id,
            entities: self.iter().cloned().collect(),
            turn_order: self.turn_order.clone(),
            current_turn_index: self.current_turn_index,
            round_number: self.round_number,
            state: self.state,
            current_step: self.current_step,
            combat_log: self.combat_log.clone(),
            ap_pool: self.ap_pool.clone(),
            fled: self.fled.clone(),
            surprise: self.surprise.clone(),
            pending_intent: self.pending_intent.clone(),
            pending_actions: self.pending_actions.clone(),
            last_result: self.last_result.clone(),
            fatal_error: self.fatal_error.clone(),
        }
    }

    /// Rebuilds a session exactly as persisted.
    ///
    /// Combat names are kept verbatim; the step and state are never reset.
    pub fn from_record(record: SessionRecord) -> Result<Self, SessionError> {
        let mut entities = BTreeMap::new();
        let mut roster = Vec::with_capacity(record.entities.len());
        for entity in record.entities {
            let id = entity.id.clone();
            if entities.insert(id.clone(), entity).is_some() {
                return Err(SessionError::DuplicateEntity(id));
            }
            roster.push(id);
        }

        if let Some(unknown) = record
            .turn_order
            .iter()
            .find(|id| !entities.contains_key(*id))
        {
            return Err(SessionError::UnknownTurnEntry(unknown.clone()));
        }
        if !record.turn_order.is_empty() && record.current_turn_index >= record.turn_order.len() {
            return Err(SessionError::TurnIndexOutOfRange {
                index: record.current_turn_index,
                len: record.turn_order.len(),
            });
        }
        if let Some(unknown) = record.ap_pool.keys().find(|id| !entities.contains_key(*id)) {
            return Err(SessionError::UnknownEntity(unknown.clone()));
        }

        Ok(Self {
            encounter_id: record.encounter_id,
            entities,
            roster,
            turn_order: record.turn_order,
            round_number: record.round_number,
            current_turn_index: record.current_turn_index,
            current_step: record.current_step,
            state: record.state,
            ap_pool: record.ap_pool,
            combat_log: record.combat_log,
            fled: record.fled,
            surprise: record.surprise,
            pending_intent: record.pending_intent,
            pending_actions: record.pending_actions,
            last_result: record.last_result,
            fatal_error: record.fatal_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::LogRole;
    use crate::entity::Side;

    fn mid_round() -> CombatSession {
        let mut session = CombatSession::prepare(
            42,
            vec![
                CombatEntity::new("hero", "Hero", Side::Player).with_hp(100, 100),
                CombatEntity::new("g1", "Goblin", Side::Enemy).with_hp(20, 20),
                CombatEntity::new("g2", "Goblin", Side::Enemy).with_hp(20, 20),
            ],
        )
        .unwrap();
        session.turn_order = vec!["g1".into(), "hero".into(), "g2".into()];
        session.current_turn_index = 1;
        session.round_number = 2;
        session.state = CombatState::InProgress;
        session.current_step = CombatStep::NarratingActionOutcome;
        session.entity_mut(&"g1".into()).unwrap().take_damage(7);
        session
            .entity_mut(&"hero".into())
            .unwrap()
            .add_status_effect("Poisoned", Some(2));
        session.ap_pool.insert("hero".into(), 1);
        session.log(LogEntry::new(LogRole::Narrator, "The goblins snarl."));
        session
    }

    #[test]
    fn record_round_trip_preserves_everything() {
        let session = mid_round();
        let restored = CombatSession::from_record(session.to_record()).unwrap();
        assert_eq!(restored, session);
        assert_eq!(restored.current_step, CombatStep::NarratingActionOutcome);
        assert_eq!(restored.entity(&"g1".into()).unwrap().combat_name, "Goblin 1");
    }

    #[test]
    fn record_with_bad_turn_index_is_rejected() {
        let mut record = mid_round().to_record();
        record.current_turn_index = 9;
        assert!(matches!(
            CombatSession::from_record(record),
            Err(SessionError::TurnIndexOutOfRange { index: 9, len: 3 })
        ));
    }

    #[test]
    fn record_with_unknown_turn_entry_is_rejected() {
        let mut record = mid_round().to_record();
        record.turn_order.push("ghost".into());
        assert_eq!(
            CombatSession::from_record(record),
            Err(SessionError::UnknownTurnEntry("ghost".into()))
        );
    }
}
