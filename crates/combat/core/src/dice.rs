//! Dice rolling for combat mechanics.
//!
//! All randomness in an encounter (initiative, attack rolls, damage, skill
//! checks, loot) flows through a [`DiceRoller`]. Given the same seed,
//! [`PcgDice`] produces the same sequence, which keeps encounters replayable.
//! [`ScriptedDice`] replays forced values and is how hosts and tests pin a
//! roll to a guaranteed hit or a specific damage total.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

/// Source of die rolls.
pub trait DiceRoller {
    /// Generate the next raw random value.
    fn next_u32(&mut self) -> u32;

    /// Roll a die with N sides (1-N inclusive).
    fn roll_die(&mut self, sides: u32) -> u32 {
        if sides <= 1 {
            return 1;
        }
        (self.next_u32() % sides) + 1
    }

    /// Pick an index in `0..len` uniformly. Returns 0 for empty ranges.
    fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        (self.next_u32() as usize) % len
    }

    /// Roll a d100 (1-100 inclusive).
    fn roll_d100(&mut self) -> u32 {
        self.roll_die(100)
    }
}

/// PCG random number generator (PCG-XSH-RR, 64-bit state, 32-bit output).
///
/// Stateful: each call advances the internal state, so an encounter seeded
/// once yields a deterministic stream of rolls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PcgDice {
    state: u64,
}

impl PcgDice {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    /// Creates a generator from a seed.
    pub fn new(seed: u64) -> Self {
        let mut dice = Self {
            state: seed.wrapping_add(Self::INCREMENT),
        };
        dice.step();
        dice
    }

    #[inline]
    fn step(&mut self) {
        self.state = self
            .state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT);
    }

    /// XSH-RR output permutation.
    #[inline]
    fn output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

impl DiceRoller for PcgDice {
    fn next_u32(&mut self) -> u32 {
        let old = self.state;
        self.step();
        Self::output(old)
    }
}

/// Dice that replay forced die faces before falling back to a PCG stream.
///
/// Forced values are returned by [`DiceRoller::roll_die`] verbatim (clamped
/// to the die's range) in FIFO order.
#[derive(Clone, Debug)]
pub struct ScriptedDice {
    forced: VecDeque<u32>,
    fallback: PcgDice,
}

impl ScriptedDice {
    pub fn new(forced: impl IntoIterator<Item = u32>) -> Self {
        Self {
            forced: forced.into_iter().collect(),
            fallback: PcgDice::new(0),
        }
    }

    /// Appends more forced faces.
    pub fn push(&mut self, face: u32) {
        self.forced.push_back(face);
    }

    /// Number of forced faces not yet consumed.
    pub fn remaining(&self) -> usize {
        self.forced.len()
    }
}

impl DiceRoller for ScriptedDice {
    fn next_u32(&mut self) -> u32 {
        match self.forced.pop_front() {
            Some(value) => value,
            None => self.fallback.next_u32(),
        }
    }

    fn roll_die(&mut self, sides: u32) -> u32 {
        match self.forced.pop_front() {
            Some(face) => face.clamp(1, sides.max(1)),
            None => self.fallback.roll_die(sides),
        }
    }

    fn pick_index(&mut self, len: usize) -> usize {
        match self.forced.pop_front() {
            Some(index) => (index as usize).min(len.saturating_sub(1)),
            None => self.fallback.pick_index(len),
        }
    }
}

/// Parsed dice expression such as `1d6`, `2d8+3` or `d20-1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct DiceNotation {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl DiceNotation {
    pub const D20: Self = Self::new(1, 20, 0);
    /// Largest die count accepted from text.
    pub const MAX_COUNT: u32 = 100;
    /// Largest die size accepted from text.
    pub const MAX_SIDES: u32 = 1000;

    pub const fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            count,
            sides,
            modifier,
        }
    }

    /// Rolls every die and returns the individual faces (modifier excluded).
    pub fn roll_faces(&self, dice: &mut dyn DiceRoller) -> Vec<u32> {
        (0..self.count).map(|_| dice.roll_die(self.sides)).collect()
    }

    /// Rolls every die and returns their sum, saturating at `i32::MAX`.
    pub fn roll_sum(&self, dice: &mut dyn DiceRoller) -> i32 {
        let sum: i64 = self
            .roll_faces(dice)
            .into_iter()
            .map(i64::from)
            .sum();
        i32::try_from(sum).unwrap_or(i32::MAX)
    }

    /// Rolls the expression and returns the total including the modifier.
    pub fn roll(&self, dice: &mut dyn DiceRoller) -> i32 {
        self.roll_sum(dice).saturating_add(self.modifier)
    }

    /// Largest possible face total (modifier excluded).
    pub const fn max_faces(&self) -> u32 {
        self.count.saturating_mul(self.sides)
    }
}

impl fmt::Display for DiceNotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{m}"),
            m => write!(f, "{m}"),
        }
    }
}

/// Errors raised while parsing dice notation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DiceParseError {
    #[error("dice notation is empty")]
    Empty,

    #[error("dice notation '{0}' is missing the 'd' separator")]
    MissingSeparator(String),

    #[error("dice notation '{0}' has an invalid number")]
    InvalidNumber(String),

    #[error("dice notation '{0}' must have at least one die with at least one side")]
    ZeroDice(String),

    #[error("dice notation '{notation}' exceeds {max_count} dice of {max_sides} sides")]
    TooLarge {
        notation: String,
        max_count: u32,
        max_sides: u32,
    },
}

impl FromStr for DiceNotation {
    type Err = DiceParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let text: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        let text = text.to_ascii_lowercase();
        if text.is_empty() {
            return Err(DiceParseError::Empty);
        }

        let (count_part, rest) = text
            .split_once('d')
            .ok_or_else(|| DiceParseError::MissingSeparator(input.to_string()))?;

        let count = if count_part.is_empty() {
            1
        } else {
            count_part
                .parse::<u32>()
                .map_err(|_| DiceParseError::InvalidNumber(input.to_string()))?
        };

        let (sides_part, modifier) = match rest.find(['+', '-']) {
            Some(pos) => {
                let modifier = rest[pos..]
                    .parse::<i32>()
                    .map_err(|_| DiceParseError::InvalidNumber(input.to_string()))?;
                (&rest[..pos], modifier)
            }
            None => (rest, 0),
        };

        let sides = sides_part
            .parse::<u32>()
            .map_err(|_| DiceParseError::InvalidNumber(input.to_string()))?;

        if count == 0 || sides == 0 {
            return Err(DiceParseError::ZeroDice(input.to_string()));
        }
        if count > Self::MAX_COUNT || sides > Self::MAX_SIDES {
            return Err(DiceParseError::TooLarge {
                notation: input.to_string(),
                max_count: Self::MAX_COUNT,
                max_sides: Self::MAX_SIDES,
            });
        }

        Ok(Self::new(count, sides, modifier))
    }
}

impl TryFrom<String> for DiceNotation {
    type Error = DiceParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DiceNotation> for String {
    fn from(value: DiceNotation) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_forms() {
        assert_eq!("1d6".parse::<DiceNotation>(), Ok(DiceNotation::new(1, 6, 0)));
        assert_eq!("2d8+3".parse::<DiceNotation>(), Ok(DiceNotation::new(2, 8, 3)));
        assert_eq!("d20-1".parse::<DiceNotation>(), Ok(DiceNotation::new(1, 20, -1)));
        assert_eq!(" 3D4 ".parse::<DiceNotation>(), Ok(DiceNotation::new(3, 4, 0)));
    }

    #[test]
    fn rejects_malformed_notation() {
        assert_eq!("".parse::<DiceNotation>(), Err(DiceParseError::Empty));
        assert!(matches!(
            "six".parse::<DiceNotation>(),
            Err(DiceParseError::MissingSeparator(_))
        ));
        assert!(matches!(
            "0d6".parse::<DiceNotation>(),
            Err(DiceParseError::ZeroDice(_))
        ));
        assert!(matches!(
            "1dx".parse::<DiceNotation>(),
            Err(DiceParseError::InvalidNumber(_))
        ));
    }

    #[test]
    fn rejects_oversized_notation() {
        assert!(matches!(
            "100000d100000".parse::<DiceNotation>(),
            Err(DiceParseError::TooLarge { .. })
        ));
        assert!(matches!(
            "101d6".parse::<DiceNotation>(),
            Err(DiceParseError::TooLarge { .. })
        ));
        assert!(matches!(
            "1d1001".parse::<DiceNotation>(),
            Err(DiceParseError::TooLarge { .. })
        ));
        assert_eq!(
            "100d1000".parse::<DiceNotation>(),
            Ok(DiceNotation::new(100, 1000, 0))
        );
    }

    #[test]
    fn huge_totals_saturate() {
        let notation = DiceNotation::new(3, u32::MAX, i32::MAX);
        let mut dice = ScriptedDice::new([u32::MAX, u32::MAX, u32::MAX]);
        assert_eq!(notation.roll(&mut dice), i32::MAX);
        assert_eq!(notation.max_faces(), u32::MAX);
    }

    #[test]
    fn display_matches_parse() {
        for text in ["1d6", "2d8+3", "1d20-1"] {
            let notation: DiceNotation = text.parse().unwrap();
            assert_eq!(notation.to_string(), text);
        }
    }

    #[test]
    fn pcg_is_deterministic_per_seed() {
        let mut a = PcgDice::new(42);
        let mut b = PcgDice::new(42);
        let rolls_a: Vec<u32> = (0..32).map(|_| a.roll_die(20)).collect();
        let rolls_b: Vec<u32> = (0..32).map(|_| b.roll_die(20)).collect();
        assert_eq!(rolls_a, rolls_b);
        assert!(rolls_a.iter().all(|r| (1..=20).contains(r)));
    }

    #[test]
    fn scripted_dice_replays_then_falls_back() {
        let mut dice = ScriptedDice::new([20, 3]);
        assert_eq!(dice.roll_die(20), 20);
        assert_eq!(dice.roll_die(6), 3);
        assert_eq!(dice.remaining(), 0);
        let next = dice.roll_die(6);
        assert!((1..=6).contains(&next));
    }

    #[test]
    fn scripted_faces_are_clamped_to_die() {
        let mut dice = ScriptedDice::new([99]);
        assert_eq!(dice.roll_die(6), 6);
    }
}
