//! Step handlers, one per [`CombatStep`].
//!
//! Each handler either moves `current_step` forward or leaves it in place
//! while arming a wait (display or narration). Anything else is a stall.

use tracing::{debug, info, warn};

use combat_core::{
    ActionResult, CombatAction, CombatState, CombatStep, DisplayEvent, DisplaySink,
    DisplaySinkExt, EntityId, LogRole, Side, StatusKind, TurnAdvance, resolve,
};

use super::CombatFlow;
use crate::error::{Result, RuntimeError};
use crate::events::CombatEvent;
use crate::hooks::HookTrigger;
use crate::intent::NpcIntent;
use crate::narration::{
    AttemptRequest, EncounterContext, NarrationRequest, OutcomeRequest, parse_attempt, to_actions,
};

impl CombatFlow {
    pub(super) fn run_step(&mut self, step: CombatStep) -> Result<()> {
        match step {
            CombatStep::NotStarted => {
                self.session.current_step = CombatStep::StartingCombat;
                Ok(())
            }
            CombatStep::StartingCombat => self.start_combat(),
            CombatStep::HandlingSurpriseCheck => self.surprise_check(),
            CombatStep::PerformingSurpriseAttack => self.surprise_attack(),
            CombatStep::NarratingSurpriseOutcome => {
                self.narrate_outcome(CombatStep::EndingSurpriseRound)
            }
            CombatStep::EndingSurpriseRound => {
                self.session.surprise = None;
                self.outbox.notice("The surprise round is over.");
                self.session.current_step = CombatStep::RollingInitiative;
                Ok(())
            }
            CombatStep::RollingInitiative => self.roll_initiative(),
            CombatStep::StartingRound => self.start_round(),
            CombatStep::AwaitingNpcIntent => self.npc_intent(),
            CombatStep::ProcessingPlayerAction | CombatStep::ProcessingNpcAction => {
                self.process_intent()
            }
            CombatStep::ResolvingActionMechanics => self.resolve_mechanics(),
            CombatStep::NarratingActionOutcome => {
                self.narrate_outcome(CombatStep::ApplyingStatusEffects)
            }
            CombatStep::ApplyingStatusEffects => self.apply_status_effects(),
            CombatStep::AdvancingTurn => self.advance_turn(),
            CombatStep::EndingCombat => self.end_combat(),
            // Input and terminal steps never reach a handler.
            CombatStep::AwaitingPlayerInput | CombatStep::CombatEnded => Ok(()),
        }
    }

    fn current_actor(&self) -> Result<EntityId> {
        self.session
            .current_actor()
            .cloned()
            .ok_or(RuntimeError::NoActor(self.session.current_step))
    }

    /// Mirrors every combatant into the stats collaborator.
    fn sync_all(&mut self) -> Result<()> {
        let tracks_ap = self.config.action_points.is_some();
        for entity in self.session.iter() {
            let ap = tracks_ap.then(|| self.session.action_points(&entity.id));
            self.stats
                .sync_from_entity(entity, ap)
                .map_err(combat_core::HandlerError::from)?;
        }
        Ok(())
    }

    fn context(&self, actor: Option<&EntityId>) -> EncounterContext {
        EncounterContext::capture(&self.session, actor, self.narration_config.context_log_lines)
    }

    fn start_combat(&mut self) -> Result<()> {
        self.session.state = CombatState::InProgress;
        self.sync_all()?;

        let names: Vec<String> = self.session.iter().map(|e| e.combat_name.clone()).collect();
        self.outbox.notice(format!("Combat begins: {}.", names.join(", ")));
        let states: Vec<DisplayEvent> = self.session.iter().map(DisplayEvent::entity_state).collect();
        for state in states {
            self.outbox.push(state);
        }
        info!(
            target: "combat::flow",
            encounter = self.session.encounter_id,
            combatants = names.len(),
            "combat started"
        );
        self.publish(CombatEvent::Started {
            encounter_id: self.session.encounter_id,
            combatants: names,
        });

        self.session.current_step = if self.session.surprise.is_some() {
            CombatStep::HandlingSurpriseCheck
        } else {
            CombatStep::RollingInitiative
        };
        Ok(())
    }

    fn surprise_check(&mut self) -> Result<()> {
        let attacker = self
            .session
            .surprise
            .as_ref()
            .and_then(|surprise| self.session.entity(&surprise.attacker))
            .filter(|entity| entity.can_act())
            .map(|entity| (entity.id.clone(), entity.combat_name.clone(), entity.side));
        let Some((attacker, name, side)) = attacker else {
            warn!(target: "combat::flow", "surprise attacker cannot act, skipping ambush");
            self.session.surprise = None;
            self.session.current_step = CombatStep::RollingInitiative;
            return Ok(());
        };

        self.outbox.line(format!("{name} strikes before anyone can react!"));
        let duration = self.config.surprise_duration.max(1);
        let victims: Vec<EntityId> = self
            .session
            .living_opponents(side)
            .map(|e| e.id.clone())
            .collect();
        for id in &victims {
            if let Some(entity) = self.session.entity_mut(id) {
                entity.add_status_effect(StatusKind::Surprised.to_string(), Some(duration));
                let event = DisplayEvent::entity_state(entity);
                let line = format!("{} is caught off guard.", entity.combat_name);
                self.outbox.push(event);
                self.outbox.line(line);
            }
        }
        self.sync_all()?;
        debug!(target: "combat::flow", attacker = %attacker, surprised = victims.len(), "surprise round");
        self.session.current_step = CombatStep::PerformingSurpriseAttack;
        Ok(())
    }

    fn surprise_attack(&mut self) -> Result<()> {
        let Some(surprise) = self.session.surprise.clone() else {
            self.session.current_step = CombatStep::EndingSurpriseRound;
            return Ok(());
        };
        if let Some(intent) = &surprise.intent {
            let role = match self.session.entity(&surprise.attacker).map(|e| e.side) {
                Some(Side::Player) => LogRole::Player,
                _ => LogRole::Npc,
            };
            self.outbox.push(DisplayEvent::narrative(role, intent.clone()));
        }
        match self.intents.basic_attack(&self.session, &surprise.attacker) {
            Some(action) => {
                self.resolve_action(&action)?;
                self.session.current_step = CombatStep::NarratingSurpriseOutcome;
            }
            None => self.session.current_step = CombatStep::EndingSurpriseRound,
        }
        Ok(())
    }

    fn roll_initiative(&mut self) -> Result<()> {
        self.session
            .roll_initiative(
                self.stats.as_ref(),
                self.dice.as_mut(),
                self.config.initiative_die,
            )
            .map_err(combat_core::HandlerError::from)?;
        let order = self.turn_order_names();
        self.outbox.notice(format!("Initiative: {}.", order.join(", ")));
        self.outbox
            .push(DisplayEvent::turn_order(self.session.round_number, order, None));
        self.session.current_step = CombatStep::StartingRound;
        Ok(())
    }

    fn turn_order_names(&self) -> Vec<String> {
        self.session
            .turn_order
            .iter()
            .map(|id| self.session.display_name(id))
            .collect()
    }

    fn start_round(&mut self) -> Result<()> {
        let first = self.session.round_number == 0;
        if first {
            self.session.round_number = 1;
        } else if self.config.reroll_initiative_each_round {
            self.session
                .roll_initiative(
                    self.stats.as_ref(),
                    self.dice.as_mut(),
                    self.config.initiative_die,
                )
                .map_err(combat_core::HandlerError::from)?;
        }

        let index = if first || self.config.reroll_initiative_each_round {
            match self.session.select_first_actor() {
                TurnAdvance::Next { index, .. } => index,
                TurnAdvance::NoEligibleActor => {
                    self.session.current_step = CombatStep::EndingCombat;
                    return Ok(());
                }
            }
        } else {
            self.session.current_turn_index
        };

        let round = self.session.round_number;
        self.outbox.notice(format!("Round {round} begins."));
        let order = self.turn_order_names();
        self.outbox
            .push(DisplayEvent::turn_order(round, order, Some(index)));
        self.publish(CombatEvent::RoundStarted {
            encounter_id: self.session.encounter_id,
            round,
        });
        self.begin_actor_turn()
    }

    /// Opens the turn of the combatant at the current index.
    fn begin_actor_turn(&mut self) -> Result<()> {
        let actor = self.current_actor()?;
        let (name, side) = self
            .session
            .entity(&actor)
            .map(|e| (e.combat_name.clone(), e.side))
            .ok_or(RuntimeError::NoActor(self.session.current_step))?;

        self.session.clear_turn_scratch();
        self.session.last_result = None;
        if let Some(ap) = self.config.action_points.clone() {
            self.session.regenerate_ap(&actor, &ap);
        }
        self.publish(CombatEvent::TurnStarted {
            encounter_id: self.session.encounter_id,
            round: self.session.round_number,
            actor: actor.clone(),
            name: name.clone(),
        });
        debug!(target: "combat::flow", actor = %name, round = self.session.round_number, "turn started");

        if let Some(status) = self.with_ctx(|ctx| ctx.begin_turn(&actor)) {
            self.outbox.line(format!("{name} is {status} and loses the turn."));
            self.session.current_step = CombatStep::ApplyingStatusEffects;
            return Ok(());
        }

        self.session.current_step = match side {
            Side::Player => CombatStep::AwaitingPlayerInput,
            Side::Ally | Side::Enemy => CombatStep::AwaitingNpcIntent,
        };
        if side == Side::Player {
            self.outbox.notice(format!("{name}, what do you do?"));
        }
        Ok(())
    }

    fn npc_intent(&mut self) -> Result<()> {
        let actor = self.current_actor()?;
        let intent = self
            .intents
            .npc_intent(&self.session, &actor, self.dice.as_mut());
        match intent {
            NpcIntent::Action(action) => self.session.pending_actions.push_back(action),
            NpcIntent::Narrated(text) => {
                let name = self.session.display_name(&actor);
                self.outbox
                    .push(DisplayEvent::narrative(LogRole::Npc, format!("{name}: {text}")));
                self.session.pending_intent = Some(text);
            }
        }
        self.session.current_step = CombatStep::ProcessingNpcAction;
        Ok(())
    }

    /// Turns the actor's pending intent into actions through the narrator.
    fn process_intent(&mut self) -> Result<()> {
        let actor = self.current_actor()?;
        let name = self.session.display_name(&actor);

        let Some(intent) = self.session.pending_intent.clone() else {
            if self.session.pending_actions.is_empty() {
                self.deliberate(&name);
            } else {
                self.session.current_step = CombatStep::ResolvingActionMechanics;
            }
            return Ok(());
        };

        let Some(reply) = self.take_narration() else {
            let request = AttemptRequest {
                actor: name,
                intent,
                context: self.context(Some(&actor)),
            };
            self.dispatch(NarrationRequest::Attempt(request));
            return Ok(());
        };
        self.session.pending_intent = None;

        let parsed = reply.and_then(|raw| parse_attempt(&raw));
        match parsed {
            Ok(attempt) => {
                if attempt.salvaged || attempt.dropped > 0 {
                    debug!(
                        target: "combat::narration",
                        salvaged = attempt.salvaged,
                        dropped = attempt.dropped,
                        "narration output repaired"
                    );
                }
                if !attempt.narrative.trim().is_empty() {
                    self.outbox.line(attempt.narrative.trim());
                }
                let weapon = self.intents.weapon(&self.session, &actor);
                let actions = to_actions(&attempt.requests, &self.session, &actor, weapon);
                if actions.is_empty() {
                    self.deliberate(&name);
                } else {
                    self.session.pending_actions.extend(actions);
                    self.session.current_step = CombatStep::ResolvingActionMechanics;
                }
            }
            Err(failure) => {
                warn!(target: "combat::narration", actor = %name, error = %failure, "narration failed, using fallback");
                match self.intents.basic_attack(&self.session, &actor) {
                    Some(action) => {
                        self.outbox
                            .line(format!("{name} hesitates, then lashes out on instinct."));
                        self.session.pending_actions.push_back(action);
                        self.session.current_step = CombatStep::ResolvingActionMechanics;
                    }
                    None => {
                        self.outbox
                            .notice("Something went wrong; the moment passes.");
                        self.session.current_step = CombatStep::ApplyingStatusEffects;
                    }
                }
            }
        }
        Ok(())
    }

    fn deliberate(&mut self, name: &str) {
        self.outbox.line(format!("{name} deliberates."));
        self.session.clear_turn_scratch();
        self.session.current_step = CombatStep::ApplyingStatusEffects;
    }

    /// Resolves one action and runs the per-action hooks.
    fn resolve_action(&mut self, action: &CombatAction) -> Result<ActionResult> {
        let result = self.with_ctx(|ctx| resolve(ctx, action))?;
        self.session.last_result = Some(result.clone());
        self.publish(CombatEvent::ActionResolved {
            encounter_id: self.session.encounter_id,
            round: self.session.round_number,
            result: result.clone(),
        });
        self.run_hooks(HookTrigger::ActionResolved(&result))?;
        self.session.check_combat_state();
        Ok(result)
    }

    fn resolve_mechanics(&mut self) -> Result<()> {
        let Some(action) = self.session.pending_actions.pop_front() else {
            self.session.current_step = CombatStep::ApplyingStatusEffects;
            return Ok(());
        };
        let able = self
            .session
            .entity(&action.performer_id)
            .is_some_and(|e| e.can_act());
        if !able {
            debug!(target: "combat::flow", performer = %action.performer_id, "performer left the fight, dropping actions");
            self.session.clear_turn_scratch();
            self.session.current_step = CombatStep::ApplyingStatusEffects;
            return Ok(());
        }

        let result = self.resolve_action(&action)?;
        if !result.success || result.action_type.is_turn_ending() {
            self.session.pending_actions.clear();
        }
        self.session.current_step = CombatStep::NarratingActionOutcome;
        Ok(())
    }

    /// Optional descriptive narration of the last result, then `next`.
    ///
    /// A concluded encounter skips straight to its ending.
    fn narrate_outcome(&mut self, next: CombatStep) -> Result<()> {
        if self.session.is_concluded() {
            self.take_narration();
            self.session.clear_turn_scratch();
            self.session.current_step = CombatStep::EndingCombat;
            return Ok(());
        }

        let wanted = self.narration_config.narrate_outcomes
            && self
                .session
                .last_result
                .as_ref()
                .is_some_and(|r| !r.is_rejected());
        if wanted {
            match self.take_narration() {
                None => {
                    let Some(result) = self.session.last_result.clone() else {
                        return Ok(());
                    };
                    let context = self.context(Some(&result.performer));
                    self.dispatch(NarrationRequest::Outcome(OutcomeRequest { result, context }));
                    return Ok(());
                }
                Some(Ok(text)) if !text.trim().is_empty() => self.outbox.line(text.trim()),
                Some(Ok(_)) => {}
                Some(Err(failure)) => {
                    debug!(target: "combat::narration", error = %failure, "outcome narration skipped");
                }
            }
        }

        self.session.current_step =
            if next == CombatStep::ApplyingStatusEffects && !self.session.pending_actions.is_empty() {
                CombatStep::ResolvingActionMechanics
            } else {
                next
            };
        Ok(())
    }

    /// Statuses tick once per turn: an actor about to go again skips the
    /// tick until its turn really ends.
    fn apply_status_effects(&mut self) -> Result<()> {
        if !self.session.check_combat_state().is_concluded() && self.acts_again() {
            self.session.current_step = CombatStep::AdvancingTurn;
            return Ok(());
        }

        let actor = self.current_actor()?;
        let tick = self.with_ctx(|ctx| ctx.tick_status_effects(&actor))?;
        if tick.defeated {
            debug!(target: "combat::flow", actor = %actor, "defeated by a status effect");
        }
        self.session.current_step = if self.session.check_combat_state().is_concluded() {
            CombatStep::EndingCombat
        } else {
            CombatStep::AdvancingTurn
        };
        Ok(())
    }

    fn advance_turn(&mut self) -> Result<()> {
        if self.session.check_combat_state().is_concluded() {
            self.session.clear_turn_scratch();
            self.session.current_step = CombatStep::EndingCombat;
            return Ok(());
        }

        if let Some(step) = self.extra_action()? {
            self.session.current_step = step;
            return Ok(());
        }

        match self.session.advance_turn() {
            TurnAdvance::Next { new_round: true, .. } => {
                self.session.current_step = CombatStep::StartingRound;
                Ok(())
            }
            TurnAdvance::Next { .. } => self.begin_actor_turn(),
            TurnAdvance::NoEligibleActor => {
                self.session.current_step = CombatStep::EndingCombat;
                Ok(())
            }
        }
    }

    /// Whether the current actor holds enough AP after a successful,
    /// non-turn-ending action to go again.
    fn acts_again(&self) -> bool {
        let Some(ap) = &self.config.action_points else {
            return false;
        };
        let Some(last) = &self.session.last_result else {
            return false;
        };
        if !last.success || last.action_type.is_turn_ending() {
            return false;
        }
        let Some(actor) = self.session.current_actor() else {
            return false;
        };
        self.session.entity(actor).is_some_and(|e| e.can_act())
            && self.session.action_points(actor) >= ap.min_ap_to_act
    }

    /// Multi-action branch: the same actor goes again while it holds enough
    /// AP after a successful, non-turn-ending action.
    fn extra_action(&mut self) -> Result<Option<CombatStep>> {
        if !self.acts_again() {
            return Ok(None);
        }
        let actor = self.current_actor()?;
        let Some(entity) = self.session.entity(&actor) else {
            return Ok(None);
        };
        let remaining = self.session.action_points(&actor);

        let (name, side) = (entity.combat_name.clone(), entity.side);
        debug!(target: "combat::flow", actor = %name, remaining, "extra action");
        self.session.clear_turn_scratch();
        self.session.last_result = None;
        self.outbox.notice(format!("{name} can act again ({remaining} AP left)."));
        Ok(Some(match side {
            Side::Player => CombatStep::AwaitingPlayerInput,
            Side::Ally | Side::Enemy => CombatStep::AwaitingNpcIntent,
        }))
    }

    fn end_combat(&mut self) -> Result<()> {
        let state = self.session.check_combat_state();
        self.session.clear_turn_scratch();
        self.take_narration();

        if state.is_concluded() && self.session.fatal_error.is_none() {
            self.run_hooks(HookTrigger::CombatEnded(state))?;
        }

        let summary = match state {
            CombatState::PlayerVictory => "Victory! No enemy is left standing.",
            CombatState::PlayerDefeat => "Defeat. The party has fallen.",
            CombatState::Fled => "You escaped the battle.",
            CombatState::NotStarted | CombatState::InProgress => "The encounter ends unresolved.",
        };
        self.outbox.notice(summary);
        info!(
            target: "combat::flow",
            encounter = self.session.encounter_id,
            state = %state,
            rounds = self.session.round_number,
            fatal = self.session.fatal_error.is_some(),
            "combat ended"
        );
        self.publish(CombatEvent::Ended {
            encounter_id: self.session.encounter_id,
            state,
            rounds: self.session.round_number,
            fatal: self.session.fatal_error.clone(),
        });
        self.session.current_step = CombatStep::CombatEnded;
        Ok(())
    }
}
