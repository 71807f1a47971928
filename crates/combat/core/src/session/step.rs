use strum::{AsRefStr, Display, EnumIter};

/// Position of the combat flow state machine.
///
/// Canonical order for a round without surprise:
///
/// ```text
/// NotStarted -> StartingCombat -> [surprise prefix] -> RollingInitiative -> StartingRound
///   -> AwaitingPlayerInput | AwaitingNpcIntent
///   -> ProcessingPlayerAction | ProcessingNpcAction
///   -> ResolvingActionMechanics -> NarratingActionOutcome
///   -> ApplyingStatusEffects -> AdvancingTurn -> (next actor | StartingRound)
///   -> EndingCombat -> CombatEnded
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum CombatStep {
    #[default]
    NotStarted,
    StartingCombat,
    HandlingSurpriseCheck,
    PerformingSurpriseAttack,
    NarratingSurpriseOutcome,
    EndingSurpriseRound,
    RollingInitiative,
    StartingRound,
    AwaitingPlayerInput,
    AwaitingNpcIntent,
    ProcessingPlayerAction,
    ProcessingNpcAction,
    ResolvingActionMechanics,
    NarratingActionOutcome,
    ApplyingStatusEffects,
    AdvancingTurn,
    EndingCombat,
    CombatEnded,
}

impl CombatStep {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::CombatEnded)
    }

    /// Steps where processing stops until the host supplies input.
    pub const fn requires_external_input(&self) -> bool {
        matches!(self, Self::AwaitingPlayerInput)
    }

    pub const fn is_surprise_round(&self) -> bool {
        matches!(
            self,
            Self::HandlingSurpriseCheck
                | Self::PerformingSurpriseAttack
                | Self::NarratingSurpriseOutcome
                | Self::EndingSurpriseRound
        )
    }
}

/// Outcome of the encounter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum CombatState {
    #[default]
    NotStarted,
    InProgress,
    PlayerVictory,
    PlayerDefeat,
    Fled,
}

impl CombatState {
    /// Once concluded, combat resources are frozen.
    pub const fn is_concluded(&self) -> bool {
        matches!(self, Self::PlayerVictory | Self::PlayerDefeat | Self::Fled)
    }
}
