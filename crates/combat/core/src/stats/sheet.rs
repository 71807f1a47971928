//! Stat sheet of a single combatant.

use std::collections::{BTreeMap, BTreeSet};

use strum::{AsRefStr, Display, EnumString};

use crate::entity::{ResourceKind, ResourceMeter};

/// Core attributes.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr, EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Attribute {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

/// Damage type for resistances and damage calculation.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr, EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DamageType {
    /// Physical damage (melee, projectiles).
    #[default]
    Physical,
    /// Fire damage (burns, explosions).
    Fire,
    /// Cold damage (ice, frost).
    Cold,
    /// Lightning damage (electricity, storms).
    Lightning,
    /// Poison damage (toxins, venom).
    Poison,
    /// Arcane damage (pure magic).
    Arcane,
    /// True damage (ignores all mitigation).
    True,
}

/// Canonical stat values of one combatant.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StatSheet {
    pub level: u32,
    pub attributes: BTreeMap<Attribute, i32>,
    /// Target number an attack roll must reach.
    pub defense: i32,
    /// Flat reduction applied to physical damage.
    pub damage_reduction: u32,
    /// Flat reduction applied to spell damage.
    pub magic_defense: u32,
    /// Percentage resistance per damage type (negative = vulnerability).
    pub resistances: BTreeMap<DamageType, i32>,
    pub proficiency_bonus: i32,
    /// Skills the combatant adds its proficiency bonus to ("escape", "persuasion").
    pub proficiencies: BTreeSet<String>,
    /// Attribute driving weapon attacks.
    pub weapon_attribute: Attribute,
    /// Attribute driving spell attacks.
    pub spell_attribute: Attribute,
    /// Mirrored resource levels (entity is authoritative).
    pub resources: BTreeMap<ResourceKind, ResourceMeter>,
    /// Mirrored status effect names.
    pub statuses: BTreeSet<String>,
}

impl Default for StatSheet {
    fn default() -> Self {
        Self {
            level: 1,
            attributes: BTreeMap::new(),
            defense: 10,
            damage_reduction: 0,
            magic_defense: 0,
            resistances: BTreeMap::new(),
            proficiency_bonus: 2,
            proficiencies: BTreeSet::new(),
            weapon_attribute: Attribute::Strength,
            spell_attribute: Attribute::Intelligence,
            resources: BTreeMap::new(),
            statuses: BTreeSet::new(),
        }
    }
}

impl StatSheet {
    pub const DEFAULT_SCORE: i32 = 10;

    pub fn new(level: u32) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, attribute: Attribute, score: i32) -> Self {
        self.attributes.insert(attribute, score);
        self
    }

    #[must_use]
    pub fn with_defense(mut self, defense: i32) -> Self {
        self.defense = defense;
        self
    }

    #[must_use]
    pub fn with_damage_reduction(mut self, reduction: u32) -> Self {
        self.damage_reduction = reduction;
        self
    }

    #[must_use]
    pub fn with_magic_defense(mut self, defense: u32) -> Self {
        self.magic_defense = defense;
        self
    }

    #[must_use]
    pub fn with_resistance(mut self, damage_type: DamageType, percent: i32) -> Self {
        self.resistances.insert(damage_type, percent);
        self
    }

    #[must_use]
    pub fn with_proficiency(mut self, skill: impl Into<String>) -> Self {
        self.proficiencies.insert(skill.into());
        self
    }

    pub fn score(&self, attribute: Attribute) -> i32 {
        self.attributes
            .get(&attribute)
            .copied()
            .unwrap_or(Self::DEFAULT_SCORE)
    }

    /// Attribute modifier: `floor((score - 10) / 2)`.
    pub fn modifier(&self, attribute: Attribute) -> i32 {
        (self.score(attribute) - Self::DEFAULT_SCORE).div_euclid(2)
    }

    /// Proficiency bonus if the combatant is trained in `skill`.
    pub fn proficiency_for(&self, skill: &str) -> i32 {
        if self.proficiencies.contains(skill) {
            self.proficiency_bonus
        } else {
            0
        }
    }

    pub fn resistance(&self, damage_type: DamageType) -> i32 {
        self.resistances.get(&damage_type).copied().unwrap_or(0)
    }

    pub fn initiative_bonus(&self) -> i32 {
        self.modifier(Attribute::Dexterity)
    }

    pub fn resource(&self, kind: ResourceKind) -> ResourceMeter {
        self.resources.get(&kind).copied().unwrap_or_default()
    }

    pub(crate) fn resource_mut(&mut self, kind: ResourceKind) -> &mut ResourceMeter {
        self.resources.entry(kind).or_default()
    }

    pub(crate) fn mirror(&mut self, kind: ResourceKind, meter: ResourceMeter) {
        self.resources.insert(kind, meter);
    }
}
