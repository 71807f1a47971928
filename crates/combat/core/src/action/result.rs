//! Typed results of resolved actions.
//!
//! Handlers and the narration adapter share these types instead of a loosely
//! keyed map: the narrator receives an [`ActionResult`] verbatim when asked
//! to describe an outcome and cannot alter the mechanics it carries.

use crate::action::ActionType;
use crate::entity::EntityId;
use crate::stats::{DamageType, RollMode, SkillCheckOutcome};

/// Result of one resolved action.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionResult {
    pub performer: EntityId,
    pub action_type: ActionType,
    pub success: bool,
    /// Player-facing summary line.
    pub message: String,
    pub outcome: ActionOutcome,
}

impl ActionResult {
    pub fn new(
        performer: EntityId,
        action_type: ActionType,
        success: bool,
        message: impl Into<String>,
        outcome: ActionOutcome,
    ) -> Self {
        Self {
            performer,
            action_type,
            success,
            message: message.into(),
            outcome,
        }
    }

    /// Failure result with no mechanical effect.
    pub fn rejected(
        performer: EntityId,
        action_type: ActionType,
        reason: RejectReason,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            performer,
            action_type,
            false,
            message,
            ActionOutcome::Rejected { reason },
        )
    }

    /// Whether a target of this action dropped to 0 HP.
    pub fn target_defeated(&self) -> bool {
        match &self.outcome {
            ActionOutcome::Attack(attack) => attack.target_defeated,
            ActionOutcome::Spell(spell) => spell.target_defeated,
            ActionOutcome::Item(item) => item.target_defeated,
            _ => false,
        }
    }

    /// Whether the performer left the fight (fled or surrendered).
    pub fn performer_escaped(&self) -> bool {
        matches!(&self.outcome, ActionOutcome::Escape(escape) if escape.escaped)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.outcome, ActionOutcome::Rejected { .. })
    }
}

/// Mechanical outcome, one variant per resolution path.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum ActionOutcome {
    Attack(AttackOutcome),
    Spell(SpellOutcome),
    Defend { bonus: i32 },
    Escape(EscapeOutcome),
    Item(ItemOutcome),
    /// WAIT and OTHER: no roll, optional status change.
    Passive { status_applied: Option<String> },
    /// Pre-empted before any mechanics ran.
    Rejected { reason: RejectReason },
}

/// Why an action was refused.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "reason", rename_all = "snake_case"))]
pub enum RejectReason {
    /// No target given and none could be inferred.
    NoTarget,
    /// Target not part of the encounter.
    UnknownTarget { name: String },
    /// Target already down or out of play.
    TargetUnavailable { target: EntityId },
    InsufficientMana { needed: u32, available: u32 },
    InsufficientStamina { needed: u32, available: u32 },
    InsufficientActionPoints { needed: u32, available: u32 },
    UnknownSpell { spell: String },
    /// Utility spells are refused in combat.
    OutOfCombatOnly { spell: String },
    UnknownItem { item: String },
    /// The performer does not carry the item.
    MissingItem { item: String },
    /// No surrender recipient available.
    NoRecipient,
}

/// d20 attack roll against a defense value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttackRoll {
    /// Natural face kept after advantage/disadvantage.
    pub natural: u32,
    pub modifier: i32,
    pub total: i32,
    pub defense: i32,
    pub mode: RollMode,
    pub critical: bool,
    pub fumble: bool,
    pub hit: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttackOutcome {
    pub target: EntityId,
    pub target_name: String,
    pub roll: AttackRoll,
    /// Damage after mitigation; 0 on a miss.
    pub damage: u32,
    pub damage_type: DamageType,
    pub target_hp: u32,
    pub target_defeated: bool,
    pub status_applied: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpellOutcome {
    pub spell_id: String,
    pub spell_name: String,
    pub mana_spent: u32,
    pub target: EntityId,
    pub target_name: String,
    /// Present for offensive spells.
    pub roll: Option<AttackRoll>,
    pub damage: u32,
    pub damage_type: DamageType,
    pub healed: u32,
    pub target_defeated: bool,
    pub status_applied: Option<String>,
}

/// Flee or surrender attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EscapeOutcome {
    pub check: SkillCheckOutcome,
    pub escaped: bool,
    /// Enemy receiving the performer's inventory (successful surrender).
    pub surrendered_to: Option<EntityId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemOutcome {
    pub item_id: String,
    pub item_name: String,
    pub target: EntityId,
    pub target_name: String,
    pub healed: u32,
    pub mana_restored: u32,
    pub stamina_restored: u32,
    pub damage: u32,
    pub target_defeated: bool,
    pub status_applied: Option<String>,
    pub status_removed: Option<String>,
}
