//! Combat configuration constants and tunable parameters.

use std::collections::BTreeMap;

use crate::action::ActionType;
use crate::stats::Naturals;

/// Tunable rules of an encounter.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CombatConfig {
    /// Sides of the initiative die added to each combatant's initiative bonus.
    pub initiative_die: u32,
    /// Re-roll initiative at the start of every round instead of once.
    pub reroll_initiative_each_round: bool,
    /// Hard cap on step handlers executed per `process` call.
    ///
    /// Only a guard against handler bugs; no game rule depends on the value.
    pub max_steps_per_process: usize,
    /// Duration (turns) of the Surprised status applied by an ambush.
    pub surprise_duration: u32,
    /// Defense bonus granted by the Defending status.
    pub defend_bonus: i32,
    /// Lowest d20 face that is a critical success.
    pub critical_natural: u32,
    /// Highest d20 face that is an automatic failure.
    pub fumble_natural: u32,
    /// Multi-action turns; `None` disables action points.
    pub action_points: Option<ApConfig>,
    pub escape: EscapeConfig,
}

impl CombatConfig {
    pub const DEFAULT_INITIATIVE_DIE: u32 = 20;
    pub const DEFAULT_MAX_STEPS: usize = 20;
    pub const DEFAULT_SURPRISE_DURATION: u32 = 1;
    pub const DEFAULT_DEFEND_BONUS: i32 = 4;
    pub const DEFAULT_CRITICAL_NATURAL: u32 = 20;
    pub const DEFAULT_FUMBLE_NATURAL: u32 = 1;

    pub fn new() -> Self {
        Self {
            initiative_die: Self::DEFAULT_INITIATIVE_DIE,
            reroll_initiative_each_round: false,
            max_steps_per_process: Self::DEFAULT_MAX_STEPS,
            surprise_duration: Self::DEFAULT_SURPRISE_DURATION,
            defend_bonus: Self::DEFAULT_DEFEND_BONUS,
            critical_natural: Self::DEFAULT_CRITICAL_NATURAL,
            fumble_natural: Self::DEFAULT_FUMBLE_NATURAL,
            action_points: None,
            escape: EscapeConfig::default(),
        }
    }

    #[must_use]
    pub fn with_action_points(mut self, ap: ApConfig) -> Self {
        self.action_points = Some(ap);
        self
    }

    #[must_use]
    pub fn with_naturals(mut self, critical: u32, fumble: u32) -> Self {
        self.critical_natural = critical;
        self.fumble_natural = fumble;
        self
    }

    pub const fn naturals(&self) -> Naturals {
        Naturals::new(self.critical_natural, self.fumble_natural)
    }

    #[must_use]
    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps_per_process = steps.max(1);
        self
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Action point settings for multi-action turns.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ApConfig {
    pub max_ap: u32,
    /// AP restored at the start of each of the entity's turns.
    pub regen_per_turn: u32,
    /// AP an entity must still hold to act again in the same turn.
    pub min_ap_to_act: u32,
    /// AP cost per action type; missing entries cost `default_cost`.
    pub costs: BTreeMap<ActionType, u32>,
    pub default_cost: u32,
}

impl ApConfig {
    /// Cost of an action type, never below 1 so a turn always terminates.
    pub fn cost_of(&self, action_type: ActionType) -> u32 {
        self.costs
            .get(&action_type)
            .copied()
            .unwrap_or(self.default_cost)
            .max(1)
    }
}

impl Default for ApConfig {
    fn default() -> Self {
        Self {
            max_ap: 4,
            regen_per_turn: 4,
            min_ap_to_act: 1,
            costs: BTreeMap::from([
                (ActionType::Attack, 2),
                (ActionType::Spell, 2),
                (ActionType::Skill, 2),
                (ActionType::Item, 1),
            ]),
            default_cost: 1,
        }
    }
}

/// Difficulty scaling of flee and surrender checks.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EscapeConfig {
    pub flee_base_difficulty: i32,
    pub surrender_base_difficulty: i32,
    /// Added per opposing combatant beyond the first.
    pub per_extra_enemy: i32,
    /// Added per level of the strongest opponent above the performer's level.
    pub per_level_gap: i32,
    pub hasted_modifier: i32,
    pub slowed_modifier: i32,
    pub encumbered_modifier: i32,
}

impl Default for EscapeConfig {
    fn default() -> Self {
        Self {
            flee_base_difficulty: 10,
            surrender_base_difficulty: 8,
            per_extra_enemy: 2,
            per_level_gap: 1,
            hasted_modifier: 2,
            slowed_modifier: -2,
            encumbered_modifier: -2,
        }
    }
}
