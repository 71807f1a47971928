//! The combat flow state machine.
//!
//! [`CombatFlow`] owns a [`CombatSession`] together with its collaborators
//! and advances it one step handler at a time. It is synchronous: narration
//! calls leave as [`NarrationJob`]s, display events leave through the
//! [`DisplayOutbox`], and the host feeds replies, idle signals and player
//! input back in before calling [`CombatFlow::process`] again.
//!
//! # Waiting
//!
//! `process` stops as soon as one of these holds:
//!
//! - a step queued a visual display event that has not been shown yet
//! - a narration call is in flight
//! - the step needs player input
//! - the encounter has ended
//!
//! A per-call step budget and a stall check turn handler defects into a
//! fatal end of the encounter instead of a hung host.

mod outbox;
mod steps;

pub use outbox::{DisplayEnvelope, DisplayOutbox};

use std::sync::Arc;

use tracing::{debug, error, warn};

use combat_core::{
    Catalog, CombatAction, CombatConfig, CombatError, CombatSession, CombatStep, DiceRoller,
    DisplayEvent, DisplaySink, EmptyCatalog, HandlerContext, Inventory, LogRole,
    MemoryInventory, PcgDice, SessionRecord, StatsProvider,
};

use crate::config::{NarrationConfig, RuntimeConfig};
use crate::error::{Result, RuntimeError};
use crate::events::CombatEvent;
use crate::hooks::{ConsequenceHook, HookContext, HookError, HookRegistry, HookTrigger};
use crate::intent::{BasicIntents, IntentProvider};
use crate::narration::{
    NarrationFailure, NarrationJob, NarrationReply, NarrationRequest, NarrationTicket,
};

/// Why `process` returned before reaching input or the end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitReason {
    /// Queued visual events must be shown first.
    Display,
    /// A narration call is in flight.
    Narration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    Waiting(WaitReason),
    AwaitingInput,
    Finished,
}

/// State of the single narration call a flow may have outstanding.
#[derive(Debug, Default)]
enum NarrationSlot {
    #[default]
    Idle,
    InFlight(NarrationTicket),
    Ready(std::result::Result<String, NarrationFailure>),
}

/// Drives one encounter.
pub struct CombatFlow {
    session: CombatSession,
    stats: Box<dyn StatsProvider + Send>,
    dice: Box<dyn DiceRoller + Send>,
    catalog: Arc<dyn Catalog>,
    inventory: Box<dyn Inventory>,
    intents: Box<dyn IntentProvider>,
    hooks: HookRegistry,
    config: CombatConfig,
    narration_config: NarrationConfig,

    outbox: DisplayOutbox,
    awaiting_display: Option<u64>,
    narration: NarrationSlot,
    next_ticket: u64,
    jobs: Vec<NarrationJob>,
    events: Vec<CombatEvent>,
}

impl CombatFlow {
    pub fn builder(session: CombatSession) -> CombatFlowBuilder {
        CombatFlowBuilder::new(session)
    }

    /// Resumes a saved encounter at its persisted step.
    ///
    /// A step that was waiting on a narration call dispatches it again on
    /// the next `process`.
    pub fn restore(record: SessionRecord) -> Result<CombatFlowBuilder> {
        CombatFlowBuilder::from_record(record)
    }

    pub fn session(&self) -> &CombatSession {
        &self.session
    }

    pub fn stats(&self) -> &dyn StatsProvider {
        self.stats.as_ref()
    }

    pub fn inventory(&self) -> &dyn Inventory {
        self.inventory.as_ref()
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    pub fn encounter_id(&self) -> u64 {
        self.session.encounter_id
    }

    pub fn current_step(&self) -> CombatStep {
        self.session.current_step
    }

    pub fn is_finished(&self) -> bool {
        self.session.current_step.is_terminal()
    }

    /// What the flow is currently blocked on, if anything.
    pub fn wait_reason(&self) -> Option<WaitReason> {
        if self.awaiting_display.is_some() {
            Some(WaitReason::Display)
        } else if matches!(self.narration, NarrationSlot::InFlight(_)) {
            Some(WaitReason::Narration)
        } else {
            None
        }
    }

    /// Runs step handlers until the flow has to wait.
    pub fn process(&mut self) -> ProcessOutcome {
        let budget = self.config.max_steps_per_process.max(1);
        let mut executed = 0;

        loop {
            if let Some(reason) = self.wait_reason() {
                return ProcessOutcome::Waiting(reason);
            }
            let step = self.session.current_step;
            if step.is_terminal() {
                return ProcessOutcome::Finished;
            }
            if step.requires_external_input() {
                return ProcessOutcome::AwaitingInput;
            }
            if executed == budget {
                self.fail(RuntimeError::StepBudgetExceeded { budget });
                continue;
            }

            executed += 1;
            debug!(target: "combat::flow", step = ?step, round = self.session.round_number, "running step");
            let result = self.run_step(step);
            self.flush_step();
            self.check_transition(step, result);
        }
    }

    /// A handler must move the step or arm a wait; anything else aborts.
    fn check_transition(&mut self, step: CombatStep, result: Result<()>) {
        match result {
            Err(err) => self.fail(err),
            Ok(()) if self.session.current_step == step && self.wait_reason().is_none() => {
                self.fail(RuntimeError::StepStalled { step });
            }
            Ok(()) => {}
        }
    }

    /// Display orchestrator reports everything up to `seq` as shown.
    pub fn on_display_idle(&mut self, seq: u64) {
        if let Some(mark) = self.awaiting_display
            && seq >= mark
        {
            debug!(target: "combat::flow", seq, "display idle");
            self.awaiting_display = None;
        }
    }

    /// Delivers a narration reply. Returns false for a stale or unexpected
    /// reply, which is dropped without touching the session.
    pub fn on_narration_reply(&mut self, reply: NarrationReply) -> bool {
        match self.narration {
            NarrationSlot::InFlight(ticket) if ticket == reply.ticket => {
                self.narration = NarrationSlot::Ready(reply.result);
                true
            }
            _ => {
                debug!(
                    target: "combat::flow",
                    encounter = reply.ticket.encounter_id,
                    sequence = reply.ticket.sequence,
                    "dropping stale narration reply"
                );
                false
            }
        }
    }

    /// Accepts free-form intent text from the player. Only valid while the
    /// flow is awaiting player input.
    pub fn submit_player_input(&mut self, text: impl Into<String>) -> bool {
        if self.session.current_step != CombatStep::AwaitingPlayerInput {
            return false;
        }
        let text = text.into();
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.outbox.push(DisplayEvent::narrative(LogRole::Player, text));
        self.flush_step();
        self.session.pending_intent = Some(text.to_string());
        self.session.current_step = CombatStep::ProcessingPlayerAction;
        true
    }

    /// Accepts an already structured action for the current actor,
    /// bypassing narration.
    pub fn submit_player_action(&mut self, action: CombatAction) -> bool {
        if self.session.current_step != CombatStep::AwaitingPlayerInput
            || self.session.current_actor() != Some(&action.performer_id)
        {
            return false;
        }
        self.session.pending_actions.push_back(action);
        self.session.current_step = CombatStep::ProcessingPlayerAction;
        true
    }

    /// Hands queued display events to the orchestrator.
    pub fn drain_display(&mut self) -> Vec<DisplayEnvelope> {
        self.outbox.drain()
    }

    pub fn take_narration_jobs(&mut self) -> Vec<NarrationJob> {
        std::mem::take(&mut self.jobs)
    }

    pub fn take_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }

    fn with_ctx<R>(&mut self, f: impl FnOnce(&mut HandlerContext<'_>) -> R) -> R {
        let mut ctx = HandlerContext {
            session: &mut self.session,
            stats: self.stats.as_mut(),
            dice: self.dice.as_mut(),
            catalog: self.catalog.as_ref(),
            inventory: self.inventory.as_mut(),
            config: &self.config,
            sink: &mut self.outbox,
        };
        f(&mut ctx)
    }

    fn run_hooks(&mut self, trigger: HookTrigger<'_>) -> std::result::Result<(), HookError> {
        if self.hooks.is_empty() {
            return Ok(());
        }
        let mut ctx = HookContext {
            trigger,
            session: &self.session,
            inventory: self.inventory.as_mut(),
            dice: self.dice.as_mut(),
            sink: &mut self.outbox,
        };
        self.hooks.run(&mut ctx)
    }

    fn publish(&mut self, event: CombatEvent) {
        self.events.push(event);
    }

    fn dispatch(&mut self, request: NarrationRequest) {
        self.next_ticket += 1;
        let ticket = NarrationTicket {
            encounter_id: self.session.encounter_id,
            sequence: self.next_ticket,
        };
        debug!(
            target: "combat::flow",
            sequence = ticket.sequence,
            kind = match &request {
                NarrationRequest::Attempt(_) => "attempt",
                NarrationRequest::Outcome(_) => "outcome",
            },
            "narration dispatched"
        );
        self.jobs.push(NarrationJob { ticket, request });
        self.narration = NarrationSlot::InFlight(ticket);
    }

    /// Takes a delivered reply; `None` if nothing has arrived.
    fn take_narration(&mut self) -> Option<std::result::Result<String, NarrationFailure>> {
        match std::mem::take(&mut self.narration) {
            NarrationSlot::Ready(result) => Some(result),
            other => {
                self.narration = other;
                None
            }
        }
    }

    /// Moves transcript lines into the session and arms the display wait.
    fn flush_step(&mut self) {
        for entry in self.outbox.take_log() {
            self.session.log(entry);
        }
        if self.outbox.take_visual() {
            self.awaiting_display = Some(self.outbox.last_seq());
        }
    }

    /// Ends the encounter after an internal failure.
    fn fail(&mut self, err: RuntimeError) {
        error!(
            target: "combat::flow",
            step = ?self.session.current_step,
            code = err.error_code(),
            error = %err,
            "encounter aborted"
        );
        self.narration = NarrationSlot::Idle;
        self.jobs.clear();

        if self.session.fatal_error.is_some() {
            // Failing again while ending: stop without running anything else.
            warn!(target: "combat::flow", "second failure while ending, closing encounter");
            self.session.current_step = CombatStep::CombatEnded;
            self.publish(CombatEvent::Ended {
                encounter_id: self.session.encounter_id,
                state: self.session.state,
                rounds: self.session.round_number,
                fatal: self.session.fatal_error.clone(),
            });
            return;
        }

        self.outbox
            .push(DisplayEvent::system_error(format!("Combat aborted: {err}")));
        self.session.abort(err.to_string());
        self.flush_step();
    }
}

/// Assembles a [`CombatFlow`] from a session and its collaborators.
///
/// Only the stats collaborator is required; everything else has an
/// in-memory default.
pub struct CombatFlowBuilder {
    session: CombatSession,
    stats: Option<Box<dyn StatsProvider + Send>>,
    dice: Option<Box<dyn DiceRoller + Send>>,
    seed: Option<u64>,
    catalog: Option<Arc<dyn Catalog>>,
    inventory: Option<Box<dyn Inventory>>,
    intents: Option<Box<dyn IntentProvider>>,
    hooks: HookRegistry,
    config: CombatConfig,
    narration: NarrationConfig,
}

impl CombatFlowBuilder {
    pub fn new(session: CombatSession) -> Self {
        Self {
            session,
            stats: None,
            dice: None,
            seed: None,
            catalog: None,
            inventory: None,
            intents: None,
            hooks: HookRegistry::default(),
            config: CombatConfig::default(),
            narration: NarrationConfig::default(),
        }
    }

    pub fn from_record(record: SessionRecord) -> Result<Self> {
        Ok(Self::new(CombatSession::from_record(record)?))
    }

    pub fn stats(mut self, stats: impl StatsProvider + Send + 'static) -> Self {
        self.stats = Some(Box::new(stats));
        self
    }

    pub fn dice(mut self, dice: impl DiceRoller + Send + 'static) -> Self {
        self.dice = Some(Box::new(dice));
        self
    }

    /// Seed for the default [`PcgDice`]; ignored when dice are supplied.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn inventory(mut self, inventory: impl Inventory + 'static) -> Self {
        self.inventory = Some(Box::new(inventory));
        self
    }

    pub fn intents(mut self, intents: impl IntentProvider + 'static) -> Self {
        self.intents = Some(Box::new(intents));
        self
    }

    pub fn hook(mut self, hook: Arc<dyn ConsequenceHook>) -> Self {
        self.hooks.register(hook);
        self
    }

    pub fn hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(mut self, config: CombatConfig) -> Self {
        self.config = config;
        self
    }

    pub fn narration(mut self, narration: NarrationConfig) -> Self {
        self.narration = narration;
        self
    }

    /// Applies the combat and narration sections and the seed.
    pub fn runtime_config(mut self, config: &RuntimeConfig) -> Self {
        self.config = config.combat.clone();
        self.narration = config.narration.clone();
        if let Some(seed) = config.seed {
            self.seed = Some(seed);
        }
        self
    }

    pub fn build(self) -> Result<CombatFlow> {
        let stats = self
            .stats
            .ok_or(RuntimeError::MissingCollaborator("a stats provider"))?;
        if let Some(missing) = self
            .session
            .roster
            .iter()
            .find(|id| stats.sheet(id).is_err())
        {
            return Err(RuntimeError::MissingStats(missing.clone()));
        }

        let dice = match self.dice {
            Some(dice) => dice,
            None => {
                let seed = self.seed.unwrap_or_else(rand::random);
                debug!(target: "combat::flow", seed, "seeding encounter dice");
                Box::new(PcgDice::new(seed))
            }
        };

        Ok(CombatFlow {
            session: self.session,
            stats,
            dice,
            catalog: self.catalog.unwrap_or_else(|| Arc::new(EmptyCatalog)),
            inventory: self
                .inventory
                .unwrap_or_else(|| Box::new(MemoryInventory::new())),
            intents: self.intents.unwrap_or_else(|| Box::new(BasicIntents::new())),
            hooks: self.hooks,
            config: self.config,
            narration_config: self.narration,
            outbox: DisplayOutbox::new(),
            awaiting_display: None,
            narration: NarrationSlot::Idle,
            next_ticket: 0,
            jobs: Vec::new(),
            events: Vec::new(),
        })
    }
}

impl std::fmt::Debug for CombatFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatFlow")
            .field("encounter_id", &self.session.encounter_id)
            .field("step", &self.session.current_step)
            .field("state", &self.session.state)
            .field("awaiting_display", &self.awaiting_display)
            .field("narration", &self.narration)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combat_core::{CombatEntity, Side, StatSheet, StatsRegistry};

    fn flow() -> CombatFlow {
        let session = CombatSession::prepare(
            4,
            vec![
                CombatEntity::new("hero", "Aria", Side::Player).with_hp(30, 30),
                CombatEntity::new("g1", "Goblin", Side::Enemy).with_hp(10, 10),
            ],
        )
        .unwrap();
        let mut stats = StatsRegistry::new();
        stats.insert("hero".into(), StatSheet::new(1));
        stats.insert("g1".into(), StatSheet::new(1));
        CombatFlow::builder(session).stats(stats).seed(1).build().unwrap()
    }

    #[test]
    fn stalled_step_aborts_the_encounter() {
        let mut flow = flow();

        // A handler that returned without moving on.
        flow.session.current_step = CombatStep::ApplyingStatusEffects;
        flow.check_transition(CombatStep::ApplyingStatusEffects, Ok(()));

        assert_eq!(flow.session.current_step, CombatStep::EndingCombat);
        let reason = flow.session.fatal_error.clone().unwrap();
        assert!(reason.contains("neither advanced nor waited"), "{reason}");
        assert!(
            flow.session
                .combat_log
                .iter()
                .any(|entry| entry.content.starts_with("Combat aborted:"))
        );
    }

    #[test]
    fn step_waiting_on_narration_is_not_a_stall() {
        let mut flow = flow();
        flow.session.current_step = CombatStep::ProcessingPlayerAction;
        flow.narration = NarrationSlot::InFlight(NarrationTicket {
            encounter_id: 4,
            sequence: 1,
        });

        flow.check_transition(CombatStep::ProcessingPlayerAction, Ok(()));

        assert!(flow.session.fatal_error.is_none());
        assert_eq!(flow.session.current_step, CombatStep::ProcessingPlayerAction);
        assert_eq!(flow.wait_reason(), Some(WaitReason::Narration));
    }
}
