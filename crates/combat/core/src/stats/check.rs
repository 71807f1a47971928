//! d20 skill checks.

use crate::dice::DiceRoller;
use crate::stats::{Attribute, StatSheet};

/// Whether a d20 roll is taken normally, best-of-two, or worst-of-two.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RollMode {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl RollMode {
    /// Combines two sources; advantage and disadvantage cancel out.
    pub fn combine(self, other: RollMode) -> RollMode {
        match (self, other) {
            (Self::Normal, mode) | (mode, Self::Normal) => mode,
            (a, b) if a == b => a,
            _ => Self::Normal,
        }
    }
}

/// Rolls a d20 honoring the roll mode; returns the natural face kept.
pub fn roll_d20(mode: RollMode, dice: &mut dyn DiceRoller) -> u32 {
    let first = dice.roll_die(20);
    match mode {
        RollMode::Normal => first,
        RollMode::Advantage => first.max(dice.roll_die(20)),
        RollMode::Disadvantage => first.min(dice.roll_die(20)),
    }
}

/// d20 faces that decide a roll on their own.
///
/// A natural at or above `critical` always succeeds; one at or below
/// `fumble` always fails. A `fumble` of 0 disables automatic failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Naturals {
    pub critical: u32,
    pub fumble: u32,
}

impl Naturals {
    pub const fn new(critical: u32, fumble: u32) -> Self {
        Self { critical, fumble }
    }

    pub const fn is_critical(&self, natural: u32) -> bool {
        natural >= self.critical
    }

    pub const fn is_fumble(&self, natural: u32) -> bool {
        !self.is_critical(natural) && natural <= self.fumble
    }
}

impl Default for Naturals {
    fn default() -> Self {
        Self::new(20, 1)
    }
}

/// A skill check request.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkillCheck {
    pub attribute: Attribute,
    /// Skill name whose proficiency applies, if any.
    pub skill: Option<String>,
    pub difficulty: i32,
    pub situational_modifier: i32,
    pub mode: RollMode,
    #[cfg_attr(feature = "serde", serde(default))]
    pub naturals: Naturals,
}

impl SkillCheck {
    pub fn new(attribute: Attribute, difficulty: i32) -> Self {
        Self {
            attribute,
            skill: None,
            difficulty,
            situational_modifier: 0,
            mode: RollMode::Normal,
            naturals: Naturals::default(),
        }
    }

    #[must_use]
    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skill = Some(skill.into());
        self
    }

    #[must_use]
    pub fn with_modifier(mut self, modifier: i32) -> Self {
        self.situational_modifier = modifier;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: RollMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_naturals(mut self, naturals: Naturals) -> Self {
        self.naturals = naturals;
        self
    }

    /// Rolls the check against a stat sheet.
    ///
    /// A critical natural always succeeds and a fumble always fails.
    pub fn resolve(&self, sheet: &StatSheet, dice: &mut dyn DiceRoller) -> SkillCheckOutcome {
        let roll = roll_d20(self.mode, dice);
        let proficiency = self
            .skill
            .as_deref()
            .map(|skill| sheet.proficiency_for(skill))
            .unwrap_or(0);
        let total =
            roll as i32 + sheet.modifier(self.attribute) + proficiency + self.situational_modifier;

        let critical = self.naturals.is_critical(roll);
        let fumble = self.naturals.is_fumble(roll);
        let success = if critical {
            true
        } else if fumble {
            false
        } else {
            total >= self.difficulty
        };

        SkillCheckOutcome {
            roll,
            total,
            difficulty: self.difficulty,
            success,
            critical,
        }
    }
}

/// Result of a skill check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkillCheckOutcome {
    /// Natural d20 face kept.
    pub roll: u32,
    pub total: i32,
    pub difficulty: i32,
    pub success: bool,
    pub critical: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedDice;

    #[test]
    fn advantage_keeps_best_face() {
        let mut dice = ScriptedDice::new([4, 17]);
        assert_eq!(roll_d20(RollMode::Advantage, &mut dice), 17);
        let mut dice = ScriptedDice::new([4, 17]);
        assert_eq!(roll_d20(RollMode::Disadvantage, &mut dice), 4);
    }

    #[test]
    fn modes_cancel() {
        assert_eq!(
            RollMode::Advantage.combine(RollMode::Disadvantage),
            RollMode::Normal
        );
        assert_eq!(
            RollMode::Normal.combine(RollMode::Advantage),
            RollMode::Advantage
        );
    }

    #[test]
    fn total_includes_modifier_proficiency_and_situation() {
        let sheet = StatSheet::default()
            .with_attribute(Attribute::Dexterity, 14)
            .with_proficiency("escape");
        let check = SkillCheck::new(Attribute::Dexterity, 15)
            .with_skill("escape")
            .with_modifier(-1);
        let mut dice = ScriptedDice::new([12]);
        let outcome = check.resolve(&sheet, &mut dice);
        // 12 + 2 (dex) + 2 (proficiency) - 1
        assert_eq!(outcome.total, 15);
        assert!(outcome.success);
    }

    #[test]
    fn natural_one_always_fails() {
        let sheet = StatSheet::default().with_attribute(Attribute::Dexterity, 30);
        let mut dice = ScriptedDice::new([1]);
        let outcome = SkillCheck::new(Attribute::Dexterity, 2).resolve(&sheet, &mut dice);
        assert!(!outcome.success);
    }

    #[test]
    fn widened_naturals_decide_the_check() {
        let sheet = StatSheet::default();
        let check = SkillCheck::new(Attribute::Dexterity, 30).with_naturals(Naturals::new(18, 3));

        let outcome = check.resolve(&sheet, &mut ScriptedDice::new([18]));
        assert!(outcome.success && outcome.critical);

        let easy = SkillCheck::new(Attribute::Dexterity, 2).with_naturals(Naturals::new(18, 3));
        assert!(!easy.resolve(&sheet, &mut ScriptedDice::new([3])).success);
        assert!(easy.resolve(&sheet, &mut ScriptedDice::new([4])).success);
    }

    #[test]
    fn zero_fumble_disables_automatic_failure() {
        let sheet = StatSheet::default().with_attribute(Attribute::Dexterity, 30);
        let check = SkillCheck::new(Attribute::Dexterity, 2).with_naturals(Naturals::new(20, 0));
        assert!(check.resolve(&sheet, &mut ScriptedDice::new([1])).success);
    }
}
