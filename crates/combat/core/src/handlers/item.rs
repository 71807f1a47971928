//! ITEM resolution: consumes one charge and applies the item's effects.

use crate::action::{ActionOutcome, ActionResult, CombatAction, ItemOutcome, RejectReason};
use crate::catalog::ItemEffect;
use crate::display::DisplaySinkExt;
use crate::entity::ResourceKind;
use crate::handlers::{HandlerContext, HandlerError, TargetDefault, mitigate_damage};

pub(super) fn resolve(
    ctx: &mut HandlerContext<'_>,
    action: &CombatAction,
) -> Result<ActionResult, HandlerError> {
    let key = action.special_effects.item_id.clone().unwrap_or_default();
    let Some(item) = ctx.catalog.item(&key).cloned() else {
        return Ok(ctx.reject(action, RejectReason::UnknownItem { item: key }));
    };
    if ctx.inventory.count(&action.performer_id, &item.id) == 0 {
        return Ok(ctx.reject(action, RejectReason::MissingItem { item: item.name }));
    }

    let default = if item.is_offensive() {
        TargetDefault::SoleOpponent
    } else {
        TargetDefault::Performer
    };
    let target = match ctx.resolve_target(action, default) {
        Ok(target) => target,
        Err(reason) => return Ok(ctx.reject(action, reason)),
    };
    let costs = ctx.costs_for(action, 0);
    if let Err(reason) = ctx.pay(&action.performer_id, costs) {
        return Ok(ctx.reject(action, reason));
    }
    ctx.inventory.consume(&action.performer_id, &item.id);

    let user = ctx.name_of(&action.performer_id);
    let target_name = ctx.name_of(&target);
    if target == action.performer_id {
        ctx.sink.line(format!("{user} uses {}.", item.name));
    } else {
        ctx.sink
            .line(format!("{user} uses {} on {target_name}.", item.name));
    }

    let mut outcome = ItemOutcome {
        item_id: item.id.clone(),
        item_name: item.name.clone(),
        target: target.clone(),
        target_name: target_name.clone(),
        healed: 0,
        mana_restored: 0,
        stamina_restored: 0,
        damage: 0,
        target_defeated: false,
        status_applied: None,
        status_removed: None,
    };

    for effect in &item.effects {
        if outcome.target_defeated {
            break;
        }
        match effect {
            ItemEffect::Heal(dice) => {
                let amount = dice.roll(ctx.dice).max(0) as u32;
                ctx.sink.line(format!("{target_name} recovers {amount} HP."));
                outcome.healed += ctx.restore(&target, ResourceKind::Health, amount)?;
            }
            ItemEffect::RestoreMana(dice) => {
                let amount = dice.roll(ctx.dice).max(0) as u32;
                ctx.sink.line(format!("{target_name} recovers {amount} MP."));
                outcome.mana_restored += ctx.restore(&target, ResourceKind::Mana, amount)?;
            }
            ItemEffect::RestoreStamina(dice) => {
                let amount = dice.roll(ctx.dice).max(0) as u32;
                ctx.sink
                    .line(format!("{target_name} recovers {amount} stamina."));
                outcome.stamina_restored +=
                    ctx.restore(&target, ResourceKind::Stamina, amount)?;
            }
            ItemEffect::Damage { dice, damage_type } => {
                let sheet = ctx.stats.sheet(&target)?;
                let (reduction, resistance) =
                    (sheet.magic_defense, sheet.resistance(*damage_type));
                let raw = dice.roll(ctx.dice);
                let damage = mitigate_damage(raw, Some(*damage_type), reduction, resistance);
                let (_, defeated) = ctx.deal_damage(&target, damage, Some(*damage_type))?;
                outcome.damage += damage;
                outcome.target_defeated = defeated;
            }
            ItemEffect::ApplyStatus(status) => {
                if let Some(name) = ctx.apply_status(&target, status)? {
                    outcome.status_applied = Some(name);
                }
            }
            ItemEffect::CureStatus(name) => {
                let cure = crate::action::StatusApplication::remove(name.clone());
                if let Some(name) = ctx.apply_status(&target, &cure)? {
                    outcome.status_removed = Some(name);
                }
            }
        }
    }

    Ok(ActionResult::new(
        action.performer_id.clone(),
        action.action_type,
        true,
        format!("{user} uses {}.", item.name),
        ActionOutcome::Item(outcome),
    ))
}
