//! Attack rolls and damage math.

use crate::action::AttackRoll;
use crate::dice::{DiceNotation, DiceRoller};
use crate::entity::{CombatEntity, StatusKind};
use crate::stats::{DamageType, Naturals, RollMode, roll_d20};

/// Roll mode after statuses: a hasted attacker gains advantage, a blinded
/// attacker or a defending target imposes disadvantage.
pub(crate) fn situational_mode(
    attacker: &CombatEntity,
    target: &CombatEntity,
    requested: RollMode,
) -> RollMode {
    let mut mode = requested;
    if attacker.has_status(StatusKind::Hasted) {
        mode = mode.combine(RollMode::Advantage);
    }
    if attacker.has_status(StatusKind::Blinded) {
        mode = mode.combine(RollMode::Disadvantage);
    }
    if target.has_status(StatusKind::Defending) {
        mode = mode.combine(RollMode::Disadvantage);
    }
    mode
}

/// Narration of an attack roll.
pub(crate) fn describe_roll(attacker: &str, verb: &str, target: &str, roll: &AttackRoll) -> String {
    let mode = match roll.mode {
        RollMode::Normal => "",
        RollMode::Advantage => " with advantage",
        RollMode::Disadvantage => " with disadvantage",
    };
    let verdict = if roll.critical {
        "Critical hit!"
    } else if roll.fumble {
        "Fumble!"
    } else if roll.hit {
        "Hit!"
    } else {
        "Miss."
    };
    format!(
        "{attacker} {verb} {target}{mode}: rolls {} {:+} = {} vs defense {}. {verdict}",
        roll.natural, roll.modifier, roll.total, roll.defense
    )
}

/// Rolls d20 + modifier against a defense value.
///
/// # Formula
///
/// ```text
/// natural = d20 (best of two with advantage, worst of two with disadvantage)
/// total   = natural + modifier
/// hit     = critical || (!fumble && total >= defense)
/// ```
///
/// `naturals` decides which faces are critical or fumbled (20 and 1 by default).
pub fn attack_roll(
    modifier: i32,
    defense: i32,
    mode: RollMode,
    naturals: Naturals,
    dice: &mut dyn DiceRoller,
) -> AttackRoll {
    let natural = roll_d20(mode, dice);
    let total = (natural as i32).saturating_add(modifier);
    let critical = naturals.is_critical(natural);
    let fumble = naturals.is_fumble(natural);
    let hit = critical || (!fumble && total >= defense);

    AttackRoll {
        natural,
        modifier,
        total,
        defense,
        mode,
        critical,
        fumble,
        hit,
    }
}

/// Rolls raw damage: dice (twice on a critical) plus the stat modifier once.
pub fn roll_damage(
    notation: &DiceNotation,
    modifier: i32,
    critical: bool,
    dice: &mut dyn DiceRoller,
) -> i32 {
    let mut total = notation.roll(dice);
    if critical {
        total = total.saturating_add(notation.roll_sum(dice));
    }
    total.saturating_add(modifier)
}

/// Applies flat reduction and typed resistance to raw damage.
///
/// # Formula
///
/// ```text
/// reduced = raw - reduction        (skipped for True damage)
/// final   = round(reduced * (100 - resistance%) / 100)   if typed
/// final   = max(final, 0)
/// ```
///
/// `reduction` is the target's damage reduction for weapons and its magic
/// defense for spells; `resistance` is only consulted for typed damage.
pub fn mitigate_damage(
    raw: i32,
    damage_type: Option<DamageType>,
    reduction: u32,
    resistance: i32,
) -> u32 {
    if damage_type == Some(DamageType::True) {
        return raw.max(0) as u32;
    }

    let reduced = raw.saturating_sub(reduction.min(i32::MAX as u32) as i32).max(0);
    let resisted = match damage_type {
        Some(_) => {
            let scale = (100 - resistance).max(0) as f64 / 100.0;
            (reduced as f64 * scale).round() as i32
        }
        None => reduced,
    };
    resisted.max(0) as u32
}
