//! Resource pools (HP, MP, Stamina) held by a combatant.
//!
//! Every mutator keeps `0 <= current <= maximum`.

use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Enum representing individual resource types.
///
/// Used by costs, display events and the stats collaborator.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr, EnumString, EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ResourceKind {
    /// Health points.
    Health,
    /// Magic points (mana).
    Mana,
    /// Physical stamina.
    Stamina,
    /// Action points (only used when multi-action turns are enabled).
    ActionPoints,
}

impl ResourceKind {
    /// Short label used in player-facing text ("HP", "MP", ...).
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Health => "HP",
            Self::Mana => "MP",
            Self::Stamina => "Stamina",
            Self::ActionPoints => "AP",
        }
    }
}

/// A clamped `current / maximum` pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceMeter {
    pub current: u32,
    pub maximum: u32,
}

impl ResourceMeter {
    /// Creates a meter, clamping `current` into `[0, maximum]`.
    pub fn new(current: u32, maximum: u32) -> Self {
        Self {
            current: current.min(maximum),
            maximum,
        }
    }

    /// Meter filled to its maximum.
    pub const fn full(maximum: u32) -> Self {
        Self {
            current: maximum,
            maximum,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.current == 0
    }

    /// Subtracts up to `amount`; returns how much was actually removed.
    pub fn drain(&mut self, amount: u32) -> u32 {
        let removed = amount.min(self.current);
        self.current -= removed;
        removed
    }

    /// Adds up to `amount` without exceeding the maximum; returns the gain.
    pub fn fill(&mut self, amount: u32) -> u32 {
        let room = self.maximum - self.current.min(self.maximum);
        let added = amount.min(room);
        self.current = (self.current + added).min(self.maximum);
        added
    }

    /// Removes exactly `amount` or nothing at all.
    pub fn try_spend(&mut self, amount: u32) -> bool {
        if amount > self.current {
            return false;
        }
        self.current -= amount;
        true
    }

    /// Overwrites the current value, clamped to the maximum.
    pub fn set_current(&mut self, value: u32) {
        self.current = value.min(self.maximum);
    }

    /// Overwrites the maximum and re-clamps the current value.
    pub fn set_maximum(&mut self, maximum: u32) {
        self.maximum = maximum;
        self.current = self.current.min(maximum);
    }
}
