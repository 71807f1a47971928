//! DEFEND, WAIT and OTHER: no rolls.

use crate::action::{ActionOutcome, ActionResult, CombatAction, StatusApplication};
use crate::display::DisplaySinkExt;
use crate::entity::StatusKind;
use crate::handlers::{HandlerContext, HandlerError, TargetDefault};

/// Raises the performer's defense until its next turn.
pub(super) fn defend(
    ctx: &mut HandlerContext<'_>,
    action: &CombatAction,
) -> Result<ActionResult, HandlerError> {
    let costs = ctx.costs_for(action, 0);
    if let Err(reason) = ctx.pay(&action.performer_id, costs) {
        return Ok(ctx.reject(action, reason));
    }

    let name = ctx.name_of(&action.performer_id);
    let bonus = ctx.config.defend_bonus;
    ctx.sink
        .line(format!("{name} takes a defensive stance (+{bonus} defense)."));
    ctx.apply_status(
        &action.performer_id,
        &StatusApplication::add(StatusKind::Defending.as_ref(), None),
    )?;

    Ok(ActionResult::new(
        action.performer_id.clone(),
        action.action_type,
        true,
        format!("{name} defends."),
        ActionOutcome::Defend { bonus },
    ))
}

pub(super) fn wait(
    ctx: &mut HandlerContext<'_>,
    action: &CombatAction,
) -> Result<ActionResult, HandlerError> {
    let name = ctx.name_of(&action.performer_id);
    let message = format!("{name} waits.");
    ctx.sink.line(message.clone());
    Ok(ActionResult::new(
        action.performer_id.clone(),
        action.action_type,
        true,
        message,
        ActionOutcome::Passive {
            status_applied: None,
        },
    ))
}

/// Free-form action; its only mechanical effect is an optional status change.
pub(super) fn other(
    ctx: &mut HandlerContext<'_>,
    action: &CombatAction,
) -> Result<ActionResult, HandlerError> {
    let target = match ctx.resolve_target(action, TargetDefault::Performer) {
        Ok(target) => target,
        Err(reason) => return Ok(ctx.reject(action, reason)),
    };
    let costs = ctx.costs_for(action, 0);
    if let Err(reason) = ctx.pay(&action.performer_id, costs) {
        return Ok(ctx.reject(action, reason));
    }

    let status_applied = match &action.special_effects.status {
        Some(status) => ctx.apply_status(&target, status)?,
        None => None,
    };
    let name = ctx.name_of(&action.performer_id);
    Ok(ActionResult::new(
        action.performer_id.clone(),
        action.action_type,
        true,
        format!("{name} acts."),
        ActionOutcome::Passive { status_applied },
    ))
}

#[cfg(test)]
mod tests {
    use crate::action::{ActionType, CombatAction, StatusApplication};
    use crate::dice::ScriptedDice;
    use crate::entity::{EntityId, StatusKind};
    use crate::handlers::fixtures::Arena;

    #[test]
    fn defend_marks_performer_defending() {
        let mut arena = Arena::new();
        let hero = EntityId::new("hero");
        let result = arena
            .run(
                &mut ScriptedDice::new([]),
                &CombatAction::new(ActionType::Defend, hero.clone()),
            )
            .unwrap();
        assert!(result.success);
        assert!(arena
            .session
            .entity(&hero)
            .unwrap()
            .has_status(StatusKind::Defending));
    }

    #[test]
    fn defending_target_is_harder_to_hit() {
        let mut arena = Arena::new();
        arena
            .session
            .entity_mut(&"goblin0".into())
            .unwrap()
            .add_status_effect("Defending", None);
        // Disadvantage keeps 12; 12 + 2 = 14 vs 10 + 4.
        let mut dice = ScriptedDice::new([17, 12, 3]);
        let attack = CombatAction::attack(
            "hero".into(),
            "goblin0".into(),
            crate::dice::DiceNotation::new(1, 6, 0),
        );
        let result = arena.run(&mut dice, &attack).unwrap();
        assert!(result.success);
        assert_eq!(arena.hp("goblin0"), 15);
    }

    #[test]
    fn other_can_remove_a_status() {
        let mut arena = Arena::new();
        let hero = EntityId::new("hero");
        arena
            .session
            .entity_mut(&hero)
            .unwrap()
            .add_status_effect("Burning", Some(3));
        let action = CombatAction::new(ActionType::Other, hero.clone())
            .with_status(StatusApplication::remove("Burning"));
        arena.run(&mut ScriptedDice::new([]), &action).unwrap();
        assert!(!arena.session.entity(&hero).unwrap().status_effects.has("Burning"));
    }
}
