//! Spell and item definitions consulted by the resolution handlers.
//!
//! Definitions are static data supplied by a [`Catalog`] implementation
//! (the RON-backed catalog lives in `combat-content`). Lookups accept either
//! the stable id or the display name because narrators refer to spells and
//! items the way a player would.

use strum::{AsRefStr, Display, EnumString};

use crate::action::StatusApplication;
use crate::dice::DiceNotation;
use crate::stats::DamageType;

/// How a spell is meant to be used; drives default targeting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr, EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SpellRole {
    /// Targets an enemy; auto-targets when none is given.
    Offensive,
    /// Targets the caster by default.
    Defensive,
    /// Exploration magic, refused in combat.
    Utility,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Spell {
    pub id: String,
    pub name: String,
    pub role: SpellRole,
    pub mana_cost: u32,
    /// Damage dice for offensive spells, healing dice for defensive ones.
    #[cfg_attr(feature = "serde", serde(default))]
    pub dice: Option<DiceNotation>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub damage_type: DamageType,
    /// Dice restore HP instead of dealing damage.
    #[cfg_attr(feature = "serde", serde(default))]
    pub heals: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: Option<StatusApplication>,
}

/// What using an item does.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemEffect {
    Heal(DiceNotation),
    RestoreMana(DiceNotation),
    RestoreStamina(DiceNotation),
    /// Thrown/offensive consumable; always hits.
    Damage {
        dice: DiceNotation,
        damage_type: DamageType,
    },
    ApplyStatus(StatusApplication),
    CureStatus(String),
}

impl ItemEffect {
    /// Offensive items default to an enemy target, the rest to the user.
    pub const fn is_offensive(&self) -> bool {
        matches!(self, Self::Damage { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemDefinition {
    pub id: String,
    pub name: String,
    pub effects: Vec<ItemEffect>,
    /// Usable during combat.
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub combat_usable: bool,
}

#[cfg(feature = "serde")]
fn default_true() -> bool {
    true
}

impl ItemDefinition {
    pub fn is_offensive(&self) -> bool {
        self.effects.iter().any(ItemEffect::is_offensive)
    }
}

/// Source of spell and item definitions.
pub trait Catalog: Send + Sync {
    /// Looks a spell up by id or name (case-insensitive).
    fn spell(&self, key: &str) -> Option<&Spell>;

    /// Looks an item up by id or name (case-insensitive).
    fn item(&self, key: &str) -> Option<&ItemDefinition>;
}

/// Catalog with no entries; spells and items are always unknown.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyCatalog;

impl Catalog for EmptyCatalog {
    fn spell(&self, _key: &str) -> Option<&Spell> {
        None
    }

    fn item(&self, _key: &str) -> Option<&ItemDefinition> {
        None
    }
}
