//! ATTACK and SKILL resolution.

use crate::action::{ActionOutcome, ActionResult, ActionType, AttackOutcome, CombatAction};
use crate::dice::DiceNotation;
use crate::display::DisplaySinkExt;
use crate::entity::StatusKind;
use crate::handlers::roll::{describe_roll, situational_mode};
use crate::handlers::{
    HandlerContext, HandlerError, TargetDefault, attack_roll, mitigate_damage, roll_damage,
};

/// Damage of an attack that names no weapon dice.
const UNARMED: DiceNotation = DiceNotation::new(1, 4, 0);

pub(super) fn resolve(
    ctx: &mut HandlerContext<'_>,
    action: &CombatAction,
) -> Result<ActionResult, HandlerError> {
    let target = match ctx.resolve_target(action, TargetDefault::SoleOpponent) {
        Ok(target) => target,
        Err(reason) => return Ok(ctx.reject(action, reason)),
    };
    let costs = ctx.costs_for(action, 0);
    if let Err(reason) = ctx.pay(&action.performer_id, costs) {
        return Ok(ctx.reject(action, reason));
    }

    let attacker = ctx.performer(action)?;
    let attacker_name = attacker.combat_name.clone();
    let target_entity = ctx
        .session
        .entity(&target)
        .ok_or_else(|| HandlerError::UnknownPerformer(target.clone()))?;
    let target_name = target_entity.combat_name.clone();
    let defending = target_entity.has_status(StatusKind::Defending);
    let mode = situational_mode(attacker, target_entity, action.special_effects.roll_mode);

    let sheet = ctx.stats.sheet(&action.performer_id)?;
    let attribute = action
        .special_effects
        .attribute
        .unwrap_or(sheet.weapon_attribute);
    let mut modifier = sheet.modifier(attribute);
    if action.action_type == ActionType::Skill {
        if let Some(skill) = action.special_effects.extra.get("skill") {
            modifier += sheet.proficiency_for(skill);
        }
    }

    let target_sheet = ctx.stats.sheet(&target)?;
    let defense = target_sheet.defense + if defending { ctx.config.defend_bonus } else { 0 };
    let damage_type = action.special_effects.damage_type;
    let reduction = target_sheet.damage_reduction;
    let resistance = damage_type.map(|t| target_sheet.resistance(t)).unwrap_or(0);

    let roll = attack_roll(modifier, defense, mode, ctx.config.naturals(), ctx.dice);
    ctx.sink
        .line(describe_roll(&attacker_name, "attacks", &target_name, &roll));

    if !roll.hit {
        let hp = ctx.session.entity(&target).map(|e| e.hp.current).unwrap_or(0);
        return Ok(ActionResult::new(
            action.performer_id.clone(),
            action.action_type,
            false,
            format!("{attacker_name}'s attack misses {target_name}."),
            ActionOutcome::Attack(AttackOutcome {
                target,
                target_name,
                roll,
                damage: 0,
                damage_type: damage_type.unwrap_or_default(),
                target_hp: hp,
                target_defeated: false,
                status_applied: None,
            }),
        ));
    }

    let notation = action.dice_notation.unwrap_or(UNARMED);
    let raw = roll_damage(&notation, modifier, roll.critical, ctx.dice);
    let damage = mitigate_damage(raw, damage_type, reduction, resistance);
    let (target_hp, target_defeated) = ctx.deal_damage(&target, damage, damage_type)?;

    let status_applied = match &action.special_effects.status {
        Some(status) if !target_defeated => ctx.apply_status(&target, status)?,
        _ => None,
    };

    Ok(ActionResult::new(
        action.performer_id.clone(),
        action.action_type,
        true,
        format!("{attacker_name} hits {target_name} for {damage} damage."),
        ActionOutcome::Attack(AttackOutcome {
            target,
            target_name,
            roll,
            damage,
            damage_type: damage_type.unwrap_or_default(),
            target_hp,
            target_defeated,
            status_applied,
        }),
    ))
}
