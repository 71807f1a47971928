//! FLEE and SURRENDER: skill checks that take the performer out of play.

use crate::action::{ActionOutcome, ActionResult, CombatAction, EscapeOutcome, RejectReason};
use crate::display::{DisplayEvent, DisplaySinkExt};
use crate::entity::{EntityId, StatusKind};
use crate::handlers::{HandlerContext, HandlerError};
use crate::stats::{Attribute, SkillCheck};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Escape {
    Flee,
    Surrender,
}

pub(super) fn flee(
    ctx: &mut HandlerContext<'_>,
    action: &CombatAction,
) -> Result<ActionResult, HandlerError> {
    resolve(ctx, action, Escape::Flee)
}

pub(super) fn surrender(
    ctx: &mut HandlerContext<'_>,
    action: &CombatAction,
) -> Result<ActionResult, HandlerError> {
    resolve(ctx, action, Escape::Surrender)
}

/// Difficulty and situational modifier of an escape attempt.
///
/// difficulty = base + per_extra_enemy * (opponents - 1)
///            + per_level_gap * max(0, strongest opponent level - own level)
fn difficulty(
    ctx: &HandlerContext<'_>,
    action: &CombatAction,
    kind: Escape,
) -> Result<(i32, i32), HandlerError> {
    let escape = &ctx.config.escape;
    let performer = ctx.performer(action)?;
    let own_level = ctx.stats.sheet(&performer.id)?.level as i32;

    let mut opponents = 0;
    let mut strongest = 0;
    for opponent in ctx.session.living_opponents(performer.side) {
        opponents += 1;
        strongest = strongest.max(ctx.stats.sheet(&opponent.id)?.level as i32);
    }

    let base = match kind {
        Escape::Flee => escape.flee_base_difficulty,
        Escape::Surrender => escape.surrender_base_difficulty,
    };
    let difficulty = base
        + escape.per_extra_enemy * (opponents - 1).max(0)
        + escape.per_level_gap * (strongest - own_level).max(0);

    let mut situational = 0;
    if performer.has_status(StatusKind::Hasted) {
        situational += escape.hasted_modifier;
    }
    if performer.has_status(StatusKind::Slowed) {
        situational += escape.slowed_modifier;
    }
    if performer.has_status(StatusKind::Encumbered) {
        situational += escape.encumbered_modifier;
    }
    Ok((difficulty, situational))
}

/// Designated recipient if it is a living opponent, else the first one.
fn surrender_recipient(ctx: &HandlerContext<'_>, action: &CombatAction) -> Option<EntityId> {
    let side = ctx.session.entity(&action.performer_id)?.side;
    let designated = action.special_effects.surrender_to.as_ref().filter(|id| {
        ctx.session
            .entity(id)
            .is_some_and(|e| e.side.opposes(side) && e.can_act())
    });
    designated
        .cloned()
        .or_else(|| ctx.session.living_opponents(side).next().map(|e| e.id.clone()))
}

fn resolve(
    ctx: &mut HandlerContext<'_>,
    action: &CombatAction,
    kind: Escape,
) -> Result<ActionResult, HandlerError> {
    let recipient = match kind {
        Escape::Flee => None,
        Escape::Surrender => match surrender_recipient(ctx, action) {
            Some(recipient) => Some(recipient),
            None => return Ok(ctx.reject(action, RejectReason::NoRecipient)),
        },
    };
    let costs = ctx.costs_for(action, 0);
    if let Err(reason) = ctx.pay(&action.performer_id, costs) {
        return Ok(ctx.reject(action, reason));
    }

    let (difficulty, situational) = difficulty(ctx, action, kind)?;
    let (attribute, skill) = match kind {
        Escape::Flee => (Attribute::Dexterity, "escape"),
        Escape::Surrender => (Attribute::Charisma, "persuasion"),
    };
    let check = SkillCheck::new(attribute, difficulty)
        .with_skill(skill)
        .with_modifier(situational)
        .with_mode(action.special_effects.roll_mode)
        .with_naturals(ctx.config.naturals());
    let outcome = ctx
        .stats
        .perform_skill_check(&action.performer_id, &check, ctx.dice)?;

    let name = ctx.name_of(&action.performer_id);
    let attempt = match kind {
        Escape::Flee => "tries to flee",
        Escape::Surrender => "offers surrender",
    };
    ctx.sink.line(format!(
        "{name} {attempt}: rolls {} for a total of {} vs DC {}.",
        outcome.roll, outcome.total, outcome.difficulty
    ));

    let message = match (kind, outcome.success) {
        (Escape::Flee, true) => "Escape successful!".to_string(),
        (Escape::Flee, false) => "Escape failed!".to_string(),
        (Escape::Surrender, true) => {
            let captor = recipient
                .as_ref()
                .map(|id| ctx.name_of(id))
                .unwrap_or_default();
            format!("{captor} accepts {name}'s surrender.")
        }
        (Escape::Surrender, false) => "The surrender is refused!".to_string(),
    };
    ctx.sink.line(message.clone());

    if outcome.success {
        if kind == Escape::Flee {
            ctx.session.fled.insert(action.performer_id.clone());
        }
        if let Some(entity) = ctx.session.entity_mut(&action.performer_id) {
            entity.deactivate();
            let state = DisplayEvent::entity_state(entity);
            ctx.sink.push(state);
        }
        ctx.session.check_combat_state();
    }

    Ok(ActionResult::new(
        action.performer_id.clone(),
        action.action_type,
        outcome.success,
        message,
        ActionOutcome::Escape(EscapeOutcome {
            check: outcome,
            escaped: outcome.success,
            surrendered_to: recipient.filter(|_| outcome.success),
        }),
    ))
}
