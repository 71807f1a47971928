//! Messages exchanged with the narrator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use combat_core::{
    ActionResult, ActionType, CombatSession, DiceNotation, EntityId, LogEntry, RollMode, Side,
    StatusApplication,
};

/// Identifies one narrator call.
///
/// Replies carrying a ticket from a replaced encounter, or a ticket the flow
/// is no longer waiting on, are stale and dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NarrationTicket {
    pub encounter_id: u64,
    pub sequence: u64,
}

/// What the narrator sees of one combatant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    /// Per-encounter combat name; the only way requests may refer to it.
    pub name: String,
    pub side: Side,
    pub hp: u32,
    pub max_hp: u32,
    pub mp: u32,
    pub max_mp: u32,
    pub alive: bool,
    pub active: bool,
    pub statuses: Vec<String>,
}

/// Snapshot of the encounter handed to the narrator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterContext {
    pub encounter_id: u64,
    pub round: u32,
    /// Combat name of the acting combatant.
    pub actor: Option<String>,
    pub participants: Vec<ParticipantView>,
    /// Most recent transcript lines, oldest first.
    pub recent_log: Vec<LogEntry>,
}

impl EncounterContext {
    pub fn capture(session: &CombatSession, actor: Option<&EntityId>, log_lines: usize) -> Self {
        let participants = session
            .iter()
            .map(|entity| ParticipantView {
                name: entity.combat_name.clone(),
                side: entity.side,
                hp: entity.hp.current,
                max_hp: entity.hp.maximum,
                mp: entity.mp.current,
                max_mp: entity.mp.maximum,
                alive: entity.is_alive(),
                active: entity.is_active_in_combat,
                statuses: entity
                    .status_effects
                    .iter()
                    .map(|(name, _)| name.to_string())
                    .collect(),
            })
            .collect();
        let skip = session.combat_log.len().saturating_sub(log_lines);
        Self {
            encounter_id: session.encounter_id,
            round: session.round_number,
            actor: actor.map(|id| session.display_name(id)),
            participants,
            recent_log: session.combat_log[skip..].to_vec(),
        }
    }

    pub fn participant(&self, name: &str) -> Option<&ParticipantView> {
        self.participants
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// Request to turn an actor's intent into narrative and structured requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRequest {
    pub actor: String,
    pub intent: String,
    pub context: EncounterContext,
}

/// Request to describe an already resolved action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRequest {
    pub result: ActionResult,
    pub context: EncounterContext,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NarrationRequest {
    Attempt(AttemptRequest),
    Outcome(OutcomeRequest),
}

/// One narrator call queued by the flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NarrationJob {
    pub ticket: NarrationTicket,
    pub request: NarrationRequest,
}

/// Why a narrator call produced nothing usable.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NarrationFailure {
    #[error("narrator failed: {0}")]
    Adapter(String),

    #[error("narrator timed out after {0:?}")]
    TimedOut(Duration),
}

/// Raw narrator output for one ticket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NarrationReply {
    pub ticket: NarrationTicket,
    pub result: Result<String, NarrationFailure>,
}

/// Mechanical request emitted by the narrator.
///
/// Participants are always referred to by combat name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StructuredRequest {
    RequestSkillCheck(SkillCheckRequest),
    RequestStateChange(StateChangeRequest),
    RequestModeTransition(ModeTransitionRequest),
}

/// Attempt of a combat action that the rules must resolve.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillCheckRequest {
    /// Defaults to the acting combatant.
    #[serde(default)]
    pub actor: Option<String>,
    pub kind: ActionType,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub dice: Option<DiceNotation>,
    #[serde(default)]
    pub spell: Option<String>,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub roll_mode: Option<RollMode>,
    #[serde(default)]
    pub status: Option<StatusApplication>,
    #[serde(default)]
    pub surrender_to: Option<String>,
    #[serde(default)]
    pub cost_mp: u32,
    #[serde(default)]
    pub cost_stamina: u32,
}

impl SkillCheckRequest {
    pub fn new(kind: ActionType) -> Self {
        Self {
            actor: None,
            kind,
            target: None,
            dice: None,
            spell: None,
            item: None,
            skill: None,
            roll_mode: None,
            status: None,
            surrender_to: None,
            cost_mp: 0,
            cost_stamina: 0,
        }
    }
}

/// Status change the narrator wants applied to a participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangeRequest {
    #[serde(default)]
    pub actor: Option<String>,
    /// Defaults to the acting combatant.
    #[serde(default)]
    pub target: Option<String>,
    pub status: String,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub remove: bool,
}

/// Request to leave combat mode ("flee", "surrender").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeTransitionRequest {
    #[serde(default)]
    pub actor: Option<String>,
    pub mode: String,
    /// Recipient of a surrender.
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Parsed narrator answer to an [`AttemptRequest`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttemptNarration {
    pub narrative: String,
    pub requests: Vec<StructuredRequest>,
    /// Output had to be cut out of surrounding prose.
    pub salvaged: bool,
    /// Requests that did not match any known shape.
    pub dropped: usize,
}
