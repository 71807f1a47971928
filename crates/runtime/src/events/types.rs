use serde::Serialize;

use combat_core::{ActionResult, CombatState, EntityId};

use super::Topic;

/// Lifecycle notification published by the flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CombatEvent {
    Started {
        encounter_id: u64,
        /// Combat names in roster order.
        combatants: Vec<String>,
    },
    RoundStarted {
        encounter_id: u64,
        round: u32,
    },
    TurnStarted {
        encounter_id: u64,
        round: u32,
        actor: EntityId,
        name: String,
    },
    ActionResolved {
        encounter_id: u64,
        round: u32,
        result: ActionResult,
    },
    Ended {
        encounter_id: u64,
        state: CombatState,
        rounds: u32,
        /// Set when the encounter was aborted by an internal failure.
        fatal: Option<String>,
    },
}

impl CombatEvent {
    pub fn topic(&self) -> Topic {
        match self {
            Self::Started { .. } | Self::Ended { .. } => Topic::Encounter,
            Self::RoundStarted { .. } | Self::TurnStarted { .. } => Topic::Turn,
            Self::ActionResolved { .. } => Topic::Action,
        }
    }

    pub fn encounter_id(&self) -> u64 {
        match self {
            Self::Started { encounter_id, .. }
            | Self::RoundStarted { encounter_id, .. }
            | Self::TurnStarted { encounter_id, .. }
            | Self::ActionResolved { encounter_id, .. }
            | Self::Ended { encounter_id, .. } => *encounter_id,
        }
    }
}
