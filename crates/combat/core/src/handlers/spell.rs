//! SPELL resolution.
//!
//! Targeting without an explicit target follows the spell's role:
//! defensive spells land on the caster, offensive spells pick the only
//! living enemy or a random one, utility spells are refused.

use crate::action::{ActionOutcome, ActionResult, CombatAction, RejectReason, SpellOutcome};
use crate::catalog::SpellRole;
use crate::dice::DiceNotation;
use crate::display::DisplaySinkExt;
use crate::entity::{ResourceKind, StatusKind};
use crate::handlers::roll::{describe_roll, situational_mode};
use crate::handlers::{
    HandlerContext, HandlerError, TargetDefault, attack_roll, mitigate_damage, roll_damage,
};

/// Fallback potency of a spell defined without dice.
const CANTRIP: DiceNotation = DiceNotation::new(1, 6, 0);

pub(super) fn resolve(
    ctx: &mut HandlerContext<'_>,
    action: &CombatAction,
) -> Result<ActionResult, HandlerError> {
    let key = action.special_effects.spell_id.clone().unwrap_or_default();
    let Some(spell) = ctx.catalog.spell(&key).cloned() else {
        return Ok(ctx.reject(action, RejectReason::UnknownSpell { spell: key }));
    };
    let default = match spell.role {
        SpellRole::Utility => {
            return Ok(ctx.reject(
                action,
                RejectReason::OutOfCombatOnly {
                    spell: spell.name.clone(),
                },
            ));
        }
        SpellRole::Defensive => TargetDefault::Performer,
        SpellRole::Offensive => TargetDefault::RandomOpponent,
    };

    let target = match ctx.resolve_target(action, default) {
        Ok(target) => target,
        Err(reason) => return Ok(ctx.reject(action, reason)),
    };
    let costs = ctx.costs_for(action, spell.mana_cost);
    if let Err(reason) = ctx.pay(&action.performer_id, costs) {
        return Ok(ctx.reject(action, reason));
    }

    let caster = ctx.performer(action)?;
    let caster_name = caster.combat_name.clone();
    let target_entity = ctx
        .session
        .entity(&target)
        .ok_or_else(|| HandlerError::UnknownPerformer(target.clone()))?;
    let target_name = target_entity.combat_name.clone();
    let mode = situational_mode(caster, target_entity, action.special_effects.roll_mode);
    let defending = target_entity.has_status(StatusKind::Defending);

    let sheet = ctx.stats.sheet(&action.performer_id)?;
    let modifier = sheet.modifier(sheet.spell_attribute);
    let notation = spell.dice.or(action.dice_notation).unwrap_or(CANTRIP);

    let mut outcome = SpellOutcome {
        spell_id: spell.id.clone(),
        spell_name: spell.name.clone(),
        mana_spent: costs.mp,
        target: target.clone(),
        target_name: target_name.clone(),
        roll: None,
        damage: 0,
        damage_type: spell.damage_type,
        healed: 0,
        target_defeated: false,
        status_applied: None,
    };

    if spell.role == SpellRole::Offensive {
        let target_sheet = ctx.stats.sheet(&target)?;
        let defense = target_sheet.defense + if defending { ctx.config.defend_bonus } else { 0 };
        let reduction = target_sheet.magic_defense;
        let resistance = target_sheet.resistance(spell.damage_type);

        let roll = attack_roll(modifier, defense, mode, ctx.config.naturals(), ctx.dice);
        let verb = format!("casts {} at", spell.name);
        ctx.sink
            .line(describe_roll(&caster_name, &verb, &target_name, &roll));
        outcome.roll = Some(roll);

        if !roll.hit {
            return Ok(ActionResult::new(
                action.performer_id.clone(),
                action.action_type,
                false,
                format!("{caster_name}'s {} misses {target_name}.", spell.name),
                ActionOutcome::Spell(outcome),
            ));
        }

        let raw = roll_damage(&notation, modifier, roll.critical, ctx.dice);
        let damage = mitigate_damage(raw, Some(spell.damage_type), reduction, resistance);
        let (_, defeated) = ctx.deal_damage(&target, damage, Some(spell.damage_type))?;
        outcome.damage = damage;
        outcome.target_defeated = defeated;
    } else {
        ctx.sink
            .line(format!("{caster_name} casts {} on {target_name}.", spell.name));
        if spell.heals {
            let amount = notation.roll(ctx.dice).saturating_add(modifier).max(0) as u32;
            let missing = ctx
                .session
                .entity(&target)
                .map(|e| e.hp.maximum - e.hp.current)
                .unwrap_or(0);
            ctx.sink
                .line(format!("{target_name} recovers {} HP.", amount.min(missing)));
            outcome.healed = ctx.restore(&target, ResourceKind::Health, amount)?;
        }
    }

    if let Some(status) = spell.status.as_ref().or(action.special_effects.status.as_ref()) {
        if !outcome.target_defeated {
            outcome.status_applied = ctx.apply_status(&target, status)?;
        }
    }

    let message = if outcome.damage > 0 {
        format!(
            "{caster_name}'s {} hits {target_name} for {} damage.",
            spell.name, outcome.damage
        )
    } else {
        format!("{caster_name} casts {}.", spell.name)
    };
    Ok(ActionResult::new(
        action.performer_id.clone(),
        action.action_type,
        true,
        message,
        ActionOutcome::Spell(outcome),
    ))
}

#[cfg(test)]
mod tests {
    use crate::action::{ActionOutcome, CombatAction, RejectReason};
    use crate::dice::ScriptedDice;
    use crate::entity::EntityId;
    use crate::handlers::fixtures::Arena;
    use crate::session::CombatState;

    fn hero() -> EntityId {
        EntityId::new("hero")
    }

    #[test]
    fn unaffordable_spell_is_rejected_before_any_roll() {
        let mut arena = Arena::new();
        arena.session.entity_mut(&hero()).unwrap().mp.set_current(2);
        let mut dice = ScriptedDice::new([18, 10]);

        let action = CombatAction::spell(hero(), "firebolt").with_target("goblin0".into());
        let result = arena.run(&mut dice, &action).unwrap();

        assert!(matches!(
            result.outcome,
            ActionOutcome::Rejected {
                reason: RejectReason::InsufficientMana {
                    needed: 5,
                    available: 2
                }
            }
        ));
        assert_eq!(dice.remaining(), 2);
        assert_eq!(arena.hp("goblin0"), 20);
        assert_eq!(arena.session.entity(&hero()).unwrap().mp.current, 2);
    }

    #[test]
    fn offensive_spell_auto_targets_sole_enemy_and_can_win() {
        let mut arena = Arena::with_goblins(&[5]);
        // d20 15 + 2 (INT 14) hits; 1d10 -> 4 + 2 = 6 fire damage.
        let mut dice = ScriptedDice::new([15, 4]);

        let result = arena
            .run(&mut dice, &CombatAction::spell(hero(), "Firebolt"))
            .unwrap();

        assert!(result.success);
        assert!(result.target_defeated());
        assert_eq!(arena.session.entity(&hero()).unwrap().mp.current, 5);
        assert_eq!(arena.session.state, CombatState::PlayerVictory);
    }

    #[test]
    fn defensive_spell_defaults_to_caster() {
        let mut arena = Arena::new();
        arena.session.entity_mut(&hero()).unwrap().take_damage(50);
        let mut dice = ScriptedDice::new([6]);

        let result = arena
            .run(&mut dice, &CombatAction::spell(hero(), "mend"))
            .unwrap();

        let ActionOutcome::Spell(outcome) = &result.outcome else {
            panic!("expected spell outcome");
        };
        assert_eq!(outcome.target, hero());
        assert_eq!(outcome.healed, 8);
        assert_eq!(arena.hp("hero"), 58);
    }

    #[test]
    fn utility_spell_is_refused_in_combat() {
        let mut arena = Arena::new();
        let mut dice = ScriptedDice::new([]);
        let result = arena
            .run(&mut dice, &CombatAction::spell(hero(), "light"))
            .unwrap();
        assert!(result.message.contains("can only be used outside combat"));
        assert_eq!(arena.session.entity(&hero()).unwrap().mp.current, 10);
    }

    #[test]
    fn offensive_spell_with_several_enemies_picks_one() {
        let mut arena = Arena::with_goblins(&[20, 20, 20]);
        // pick index 2, then d20 19, then 1d10 -> 1.
        let mut dice = ScriptedDice::new([2, 19, 1]);
        let result = arena
            .run(&mut dice, &CombatAction::spell(hero(), "firebolt"))
            .unwrap();
        let ActionOutcome::Spell(outcome) = &result.outcome else {
            panic!("expected spell outcome");
        };
        assert_eq!(outcome.target, EntityId::new("goblin2"));
        assert_eq!(arena.hp("goblin2"), 17);
    }
}
