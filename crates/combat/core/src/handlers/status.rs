//! Turn-boundary status handling.

use crate::dice::DiceNotation;
use crate::display::{DisplayEvent, DisplaySinkExt};
use crate::entity::{EntityId, ResourceKind, StatusKind};
use crate::handlers::{HandlerContext, HandlerError, mitigate_damage};
use crate::stats::DamageType;

const POISON_TICK: DiceNotation = DiceNotation::new(1, 4, 0);
const BURN_TICK: DiceNotation = DiceNotation::new(1, 6, 0);
const REGEN_TICK: DiceNotation = DiceNotation::new(1, 4, 0);

/// What happened when an actor's statuses ticked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusTick {
    pub damage: u32,
    pub healed: u32,
    pub expired: Vec<String>,
    pub defeated: bool,
}

impl HandlerContext<'_> {
    /// Prepares an actor's turn.
    ///
    /// Drops the Defending stance held since its previous turn. Returns the
    /// status that makes it lose this turn, if any.
    pub fn begin_turn(&mut self, actor: &EntityId) -> Option<StatusKind> {
        let entity = self.session.entity_mut(actor)?;
        if entity.remove_status_effect(StatusKind::Defending.as_ref()) {
            let event = DisplayEvent::entity_state(entity);
            self.sink.push(event);
        }
        [StatusKind::Surprised, StatusKind::Stunned]
            .into_iter()
            .find(|kind| entity.has_status(*kind))
    }

    /// Applies periodic effects then ticks durations down for one actor.
    ///
    /// No-op once combat has concluded.
    pub fn tick_status_effects(&mut self, actor: &EntityId) -> Result<StatusTick, HandlerError> {
        let mut tick = StatusTick::default();
        if self.session.is_concluded() {
            return Ok(tick);
        }
        let Some(entity) = self.session.entity(actor) else {
            return Ok(tick);
        };
        if !entity.is_alive() {
            return Ok(tick);
        }
        let poisoned = entity.has_status(StatusKind::Poisoned);
        let burning = entity.has_status(StatusKind::Burning);
        let regenerating = entity.has_status(StatusKind::Regenerating);

        for (active, dice, damage_type) in [
            (poisoned, POISON_TICK, DamageType::Poison),
            (burning, BURN_TICK, DamageType::Fire),
        ] {
            if !active || tick.defeated {
                continue;
            }
            let resistance = self.stats.sheet(actor)?.resistance(damage_type);
            let damage = mitigate_damage(dice.roll(self.dice), Some(damage_type), 0, resistance);
            let (_, defeated) = self.deal_damage(actor, damage, Some(damage_type))?;
            tick.damage += damage;
            tick.defeated = defeated;
        }

        if regenerating && !tick.defeated {
            let amount = REGEN_TICK.roll(self.dice).max(0) as u32;
            let name = self.name_of(actor);
            self.sink.line(format!("{name} regenerates {amount} HP."));
            tick.healed = self.restore(actor, ResourceKind::Health, amount)?;
        }

        let Some(entity) = self.session.entity_mut(actor) else {
            return Ok(tick);
        };
        tick.expired = entity.decrement_status_effect_durations();
        if !tick.expired.is_empty() {
            let name = entity.combat_name.clone();
            let event = DisplayEvent::entity_state(entity);
            for effect in &tick.expired {
                self.sink.line(format!("{name} is no longer {effect}."));
            }
            self.sink.push(event);
            self.sync(actor)?;
        }
        Ok(tick)
    }
}
