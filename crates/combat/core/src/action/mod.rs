//! Attempted actions and their typed results.
//!
//! A [`CombatAction`] exists for exactly one resolution cycle: it is built
//! from a player choice or a narrator request, resolved by the handler bound
//! to its [`ActionType`], and dropped once its [`ActionResult`] has been
//! narrated.

mod result;

pub use result::{
    ActionOutcome, ActionResult, AttackOutcome, AttackRoll, EscapeOutcome, ItemOutcome,
    RejectReason, SpellOutcome,
};

use std::collections::BTreeMap;

use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::dice::DiceNotation;
use crate::entity::EntityId;
use crate::stats::{Attribute, DamageType, RollMode};

/// Kinds of actions a combatant can attempt.
///
/// Every variant is resolved by exactly one handler in
/// [`crate::handlers::resolve`]; the match there is exhaustive.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr, EnumString, EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ActionType {
    Attack,
    Spell,
    Defend,
    Flee,
    Surrender,
    Item,
    Wait,
    Skill,
    Other,
}

impl ActionType {
    /// Actions that end the actor's turn even when action points remain.
    pub const fn is_turn_ending(&self) -> bool {
        matches!(
            self,
            Self::Defend | Self::Flee | Self::Surrender | Self::Wait
        )
    }

    /// Whether the action is aimed at an opponent by default.
    pub const fn is_hostile(&self) -> bool {
        matches!(self, Self::Attack | Self::Skill)
    }
}

/// Status effect an action applies on success.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusApplication {
    pub name: String,
    /// Turns; `None` for indefinite.
    pub duration: Option<u32>,
    /// Remove the status instead of adding it.
    #[cfg_attr(feature = "serde", serde(default))]
    pub remove: bool,
}

impl StatusApplication {
    pub fn add(name: impl Into<String>, duration: Option<u32>) -> Self {
        Self {
            name: name.into(),
            duration,
            remove: false,
        }
    }

    pub fn remove(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            duration: None,
            remove: true,
        }
    }
}

/// Typed extras attached to an action.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpecialEffects {
    /// Spell being cast (SPELL).
    pub spell_id: Option<String>,
    /// Item being used (ITEM).
    pub item_id: Option<String>,
    /// Damage type of the attack; `None` means untyped physical.
    pub damage_type: Option<DamageType>,
    /// Attribute driving the roll, overriding the sheet default.
    pub attribute: Option<Attribute>,
    pub roll_mode: RollMode,
    /// Status applied to the target on a successful hit/effect.
    pub status: Option<StatusApplication>,
    /// Enemy receiving the performer's inventory on surrender.
    pub surrender_to: Option<EntityId>,
    /// Free-form narrator annotations.
    pub extra: BTreeMap<String, String>,
}

/// One attempted action.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatAction {
    pub action_type: ActionType,
    pub performer_id: EntityId,
    /// Ordered targets; may be empty for self/area actions.
    pub targets: Vec<EntityId>,
    pub dice_notation: Option<DiceNotation>,
    pub cost_mp: u32,
    pub cost_stamina: u32,
    pub special_effects: SpecialEffects,
}

impl CombatAction {
    pub fn new(action_type: ActionType, performer: EntityId) -> Self {
        Self {
            action_type,
            performer_id: performer,
            targets: Vec::new(),
            dice_notation: None,
            cost_mp: 0,
            cost_stamina: 0,
            special_effects: SpecialEffects::default(),
        }
    }

    /// Basic weapon attack against a single target.
    pub fn attack(performer: EntityId, target: EntityId, dice: DiceNotation) -> Self {
        Self::new(ActionType::Attack, performer)
            .with_target(target)
            .with_dice(dice)
    }

    pub fn spell(performer: EntityId, spell_id: impl Into<String>) -> Self {
        let mut action = Self::new(ActionType::Spell, performer);
        action.special_effects.spell_id = Some(spell_id.into());
        action
    }

    pub fn item(performer: EntityId, item_id: impl Into<String>) -> Self {
        let mut action = Self::new(ActionType::Item, performer);
        action.special_effects.item_id = Some(item_id.into());
        action
    }

    #[must_use]
    pub fn with_target(mut self, target: EntityId) -> Self {
        self.targets.push(target);
        self
    }

    #[must_use]
    pub fn with_dice(mut self, dice: DiceNotation) -> Self {
        self.dice_notation = Some(dice);
        self
    }

    #[must_use]
    pub fn with_costs(mut self, mp: u32, stamina: u32) -> Self {
        self.cost_mp = mp;
        self.cost_stamina = stamina;
        self
    }

    #[must_use]
    pub fn with_roll_mode(mut self, mode: RollMode) -> Self {
        self.special_effects.roll_mode = mode;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusApplication) -> Self {
        self.special_effects.status = Some(status);
        self
    }

    pub fn primary_target(&self) -> Option<&EntityId> {
        self.targets.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_ending_types() {
        use strum::IntoEnumIterator;

        let ending: Vec<ActionType> = ActionType::iter().filter(|t| t.is_turn_ending()).collect();
        assert_eq!(
            ending,
            vec![
                ActionType::Defend,
                ActionType::Flee,
                ActionType::Surrender,
                ActionType::Wait
            ]
        );
    }

    #[test]
    fn action_type_parses_from_narrator_text() {
        assert_eq!("ATTACK".parse::<ActionType>(), Ok(ActionType::Attack));
        assert_eq!("surrender".parse::<ActionType>(), Ok(ActionType::Surrender));
        assert!("dance".parse::<ActionType>().is_err());
    }
}
