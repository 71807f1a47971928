//! Resolution handlers, one per [`ActionType`].
//!
//! Every handler follows the same contract:
//!
//! 1. Validate targets. An invalid target yields a failed [`ActionResult`]
//!    with a readable message and no mutation.
//! 2. Pay resource costs (mana, stamina, AP) before any roll. A cost that
//!    cannot be afforded pre-empts the handler entirely.
//! 3. Emit roll/mechanics lines, then the damage line, then apply the HP
//!    change with its preview/finalize pair, then the defeat line.
//!
//! Handlers never touch the screen; they push [`DisplayEvent`]s into the
//! context's sink in the order the player must see them.
//!
//! [`DisplayEvent`]: crate::display::DisplayEvent

mod attack;
mod escape;
mod item;
mod passive;
mod roll;
mod spell;
mod status;

pub use roll::{attack_roll, mitigate_damage, roll_damage};
pub use status::StatusTick;

use tracing::debug;

use crate::action::{ActionResult, ActionType, CombatAction, RejectReason};
use crate::catalog::Catalog;
use crate::config::CombatConfig;
use crate::dice::DiceRoller;
use crate::display::{DisplayEvent, DisplaySink, DisplaySinkExt};
use crate::entity::{CombatEntity, EntityId, ResourceKind, Side};
use crate::error::{CombatError, ErrorSeverity};
use crate::inventory::Inventory;
use crate::session::CombatSession;
use crate::stats::{DamageType, StatsError, StatsProvider};

/// Failures that are defects rather than in-fiction outcomes.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error("performer {0} is not part of the encounter")]
    UnknownPerformer(EntityId),

    #[error("performer {0} cannot act")]
    PerformerUnavailable(EntityId),

    #[error("combat has already concluded")]
    Concluded,

    #[error(transparent)]
    Stats(#[from] StatsError),
}

impl CombatError for HandlerError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::PerformerUnavailable(_) => ErrorSeverity::Validation,
            Self::UnknownPerformer(_) | Self::Concluded => ErrorSeverity::Internal,
            Self::Stats(err) => err.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownPerformer(_) => "HANDLER_UNKNOWN_PERFORMER",
            Self::PerformerUnavailable(_) => "HANDLER_PERFORMER_UNAVAILABLE",
            Self::Concluded => "HANDLER_CONCLUDED",
            Self::Stats(err) => err.error_code(),
        }
    }
}

/// Everything a handler may read or mutate.
pub struct HandlerContext<'a> {
    pub session: &'a mut CombatSession,
    pub stats: &'a mut dyn StatsProvider,
    pub dice: &'a mut dyn DiceRoller,
    pub catalog: &'a dyn Catalog,
    pub inventory: &'a mut dyn Inventory,
    pub config: &'a CombatConfig,
    pub sink: &'a mut dyn DisplaySink,
}

/// Resolves one action with the handler bound to its type.
pub fn resolve(
    ctx: &mut HandlerContext<'_>,
    action: &CombatAction,
) -> Result<ActionResult, HandlerError> {
    if ctx.session.is_concluded() {
        return Err(HandlerError::Concluded);
    }
    let performer = ctx
        .session
        .entity(&action.performer_id)
        .ok_or_else(|| HandlerError::UnknownPerformer(action.performer_id.clone()))?;
    if !performer.can_act() {
        return Err(HandlerError::PerformerUnavailable(action.performer_id.clone()));
    }
    // Fails fast on a combatant registered without stats.
    ctx.stats.sheet(&action.performer_id)?;

    let result = match action.action_type {
        ActionType::Attack | ActionType::Skill => attack::resolve(ctx, action),
        ActionType::Spell => spell::resolve(ctx, action),
        ActionType::Defend => passive::defend(ctx, action),
        ActionType::Flee => escape::flee(ctx, action),
        ActionType::Surrender => escape::surrender(ctx, action),
        ActionType::Item => item::resolve(ctx, action),
        ActionType::Wait => passive::wait(ctx, action),
        ActionType::Other => passive::other(ctx, action),
    }?;

    debug!(
        target: "combat::handler",
        performer = %action.performer_id,
        action = %action.action_type,
        success = result.success,
        "action resolved"
    );
    Ok(result)
}

/// Resource costs of one action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Costs {
    pub mp: u32,
    pub stamina: u32,
    pub ap: u32,
}

/// Default target when an action names none.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TargetDefault {
    /// The performer.
    Performer,
    /// The only living opponent; ambiguous otherwise.
    SoleOpponent,
    /// A uniformly random living opponent.
    RandomOpponent,
}

impl HandlerContext<'_> {
    pub(crate) fn performer(&self, action: &CombatAction) -> Result<&CombatEntity, HandlerError> {
        self.session
            .entity(&action.performer_id)
            .ok_or_else(|| HandlerError::UnknownPerformer(action.performer_id.clone()))
    }

    pub(crate) fn name_of(&self, id: &EntityId) -> String {
        self.session.display_name(id)
    }

    /// Costs declared on the action plus the configured AP price.
    pub(crate) fn costs_for(&self, action: &CombatAction, extra_mp: u32) -> Costs {
        Costs {
            mp: action.cost_mp.saturating_add(extra_mp),
            stamina: action.cost_stamina,
            ap: self
                .config
                .action_points
                .as_ref()
                .map(|ap| ap.cost_of(action.action_type))
                .unwrap_or(0),
        }
    }

    /// Picks the single target of an action.
    pub(crate) fn resolve_target(
        &mut self,
        action: &CombatAction,
        default: TargetDefault,
    ) -> Result<EntityId, RejectReason> {
        if let Some(target) = action.primary_target() {
            let entity = self
                .session
                .entity(target)
                .ok_or_else(|| RejectReason::UnknownTarget {
                    name: target.to_string(),
                })?;
            if !entity.can_act() {
                return Err(RejectReason::TargetUnavailable {
                    target: target.clone(),
                });
            }
            return Ok(target.clone());
        }

        let side = self
            .session
            .entity(&action.performer_id)
            .map(|e| e.side)
            .unwrap_or(Side::Enemy);
        match default {
            TargetDefault::Performer => Ok(action.performer_id.clone()),
            TargetDefault::SoleOpponent => {
                let mut opponents = self.session.living_opponents(side);
                match (opponents.next(), opponents.next()) {
                    (Some(only), None) => Ok(only.id.clone()),
                    _ => Err(RejectReason::NoTarget),
                }
            }
            TargetDefault::RandomOpponent => {
                let candidates: Vec<EntityId> = self
                    .session
                    .living_opponents(side)
                    .map(|e| e.id.clone())
                    .collect();
                match candidates.len() {
                    0 => Err(RejectReason::NoTarget),
                    1 => Ok(candidates[0].clone()),
                    len => Ok(candidates[self.dice.pick_index(len)].clone()),
                }
            }
        }
    }

    /// Deducts all costs or none.
    pub(crate) fn pay(&mut self, performer: &EntityId, costs: Costs) -> Result<(), RejectReason> {
        let Some(entity) = self.session.entity(performer) else {
            return Err(RejectReason::NoTarget);
        };
        if entity.mp.current < costs.mp {
            return Err(RejectReason::InsufficientMana {
                needed: costs.mp,
                available: entity.mp.current,
            });
        }
        if entity.stamina.current < costs.stamina {
            return Err(RejectReason::InsufficientStamina {
                needed: costs.stamina,
                available: entity.stamina.current,
            });
        }
        let ap = self.session.action_points(performer);
        if costs.ap > 0 && ap < costs.ap {
            return Err(RejectReason::InsufficientActionPoints {
                needed: costs.ap,
                available: ap,
            });
        }

        if costs.ap > 0 {
            self.session.spend_ap(performer, costs.ap);
        }
        if costs.mp > 0 {
            self.change_resource(performer, ResourceKind::Mana, |e| {
                e.spend_mp(costs.mp);
            });
        }
        if costs.stamina > 0 {
            self.change_resource(performer, ResourceKind::Stamina, |e| {
                e.spend_stamina(costs.stamina);
            });
        }
        Ok(())
    }

    /// Applies a resource mutation and emits its preview/finalize pair.
    pub(crate) fn change_resource(
        &mut self,
        id: &EntityId,
        kind: ResourceKind,
        mutate: impl FnOnce(&mut CombatEntity),
    ) {
        let Some(entity) = self.session.entity_mut(id) else {
            return;
        };
        let before = entity.meter(kind).map(|m| m.current).unwrap_or(0);
        mutate(entity);
        let after = entity.meter(kind).copied().unwrap_or_default();
        self.sink.resource_change(id, kind, before, after);
    }

    /// Mirrors an entity's resources into the stats collaborator.
    pub(crate) fn sync(&mut self, id: &EntityId) -> Result<(), HandlerError> {
        let ap = self
            .config
            .action_points
            .as_ref()
            .map(|_| self.session.action_points(id));
        if let Some(entity) = self.session.entity(id) {
            self.stats.sync_from_entity(entity, ap)?;
        }
        Ok(())
    }

    /// Emits the damage line, applies the loss, then the defeat line.
    ///
    /// Returns the target's remaining HP and whether it was defeated.
    pub(crate) fn deal_damage(
        &mut self,
        target: &EntityId,
        amount: u32,
        damage_type: Option<DamageType>,
    ) -> Result<(u32, bool), HandlerError> {
        let name = self.name_of(target);
        let line = match damage_type {
            Some(kind) if kind != DamageType::Physical => {
                format!("{name} takes {amount} {kind} damage.")
            }
            _ => format!("{name} takes {amount} damage."),
        };
        self.sink.line(line);

        self.change_resource(target, ResourceKind::Health, |e| {
            e.take_damage(amount);
        });
        self.sync(target)?;

        let Some(entity) = self.session.entity_mut(target) else {
            return Ok((0, false));
        };
        let hp = entity.hp.current;
        if entity.is_alive() {
            return Ok((hp, false));
        }
        entity.deactivate();
        let state = DisplayEvent::entity_state(entity);
        self.sink.line(format!("{name} is defeated!"));
        self.sink.push(state);
        self.session.check_combat_state();
        Ok((hp, true))
    }

    /// Restores HP with its preview/finalize pair; returns the amount healed.
    pub(crate) fn restore(
        &mut self,
        target: &EntityId,
        kind: ResourceKind,
        amount: u32,
    ) -> Result<u32, HandlerError> {
        let mut gained = 0;
        self.change_resource(target, kind, |e| {
            gained = match kind {
                ResourceKind::Health => e.heal(amount),
                ResourceKind::Mana => e.restore_mp(amount),
                ResourceKind::Stamina => e.restore_stamina(amount),
                ResourceKind::ActionPoints => 0,
            };
        });
        self.sync(target)?;
        Ok(gained)
    }

    /// Adds or removes a status; returns the name when something changed.
    pub(crate) fn apply_status(
        &mut self,
        target: &EntityId,
        status: &crate::action::StatusApplication,
    ) -> Result<Option<String>, HandlerError> {
        let Some(entity) = self.session.entity_mut(target) else {
            return Ok(None);
        };
        let changed = if status.remove {
            entity.remove_status_effect(&status.name)
        } else {
            entity.add_status_effect(status.name.clone(), status.duration);
            true
        };
        if !changed {
            return Ok(None);
        }
        let event = DisplayEvent::entity_state(entity);
        let name = entity.combat_name.clone();
        self.sink.push(event);
        self.sink.line(if status.remove {
            format!("{name} is no longer {}.", status.name)
        } else {
            format!("{name} is now {}.", status.name)
        });
        self.sync(target)?;
        Ok(Some(status.name.clone()))
    }

    /// Builds a rejection and narrates its message.
    pub(crate) fn reject(&mut self, action: &CombatAction, reason: RejectReason) -> ActionResult {
        let message = self.reject_message(action, &reason);
        self.sink.line(message.clone());
        ActionResult::rejected(action.performer_id.clone(), action.action_type, reason, message)
    }

    fn reject_message(&self, action: &CombatAction, reason: &RejectReason) -> String {
        let who = self.name_of(&action.performer_id);
        match reason {
            RejectReason::NoTarget => format!("{who} has no clear target."),
            RejectReason::UnknownTarget { name } => format!("{who} cannot find {name}."),
            RejectReason::TargetUnavailable { target } => {
                format!("{} is already out of the fight.", self.name_of(target))
            }
            RejectReason::InsufficientMana { needed, available } => {
                format!("{who} lacks the mana ({available}/{needed}).")
            }
            RejectReason::InsufficientStamina { needed, available } => {
                format!("{who} lacks the stamina ({available}/{needed}).")
            }
            RejectReason::InsufficientActionPoints { needed, available } => {
                format!("{who} lacks the action points ({available}/{needed}).")
            }
            RejectReason::UnknownSpell { spell } => format!("{who} does not know {spell}."),
            RejectReason::OutOfCombatOnly { spell } => {
                format!("{spell} can only be used outside combat.")
            }
            RejectReason::UnknownItem { item } => format!("{who} reaches for {item}, but no such thing exists."),
            RejectReason::MissingItem { item } => format!("{who} has no {item} left."),
            RejectReason::NoRecipient => "There is no one to surrender to.".to_string(),
        }
    }
}
