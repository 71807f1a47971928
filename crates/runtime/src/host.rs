//! Async host that runs one encounter end to end.
//!
//! The host owns the [`CombatFlow`] and is the only code that calls into
//! it. It spawns the narration worker and the display orchestrator, then
//! loops: process the flow, forward whatever it produced, and wait for the
//! next idle signal, narration reply or player input.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use combat_core::{CombatAction, CombatState, LogEntry, SessionRecord};

use crate::config::RuntimeConfig;
use crate::display::{DisplayBackend, DisplayOrchestrator, StepControl};
use crate::error::{Result, RuntimeError};
use crate::events::{CombatEvent, EventBus, Topic};
use crate::flow::{CombatFlow, DisplayEnvelope, ProcessOutcome};
use crate::narration::{NarrationJob, NarrationWorker, Narrator};

/// Input from the player side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerInput {
    /// Free-form intent, resolved through the narrator.
    Text(String),
    /// Structured action, resolved directly.
    Action(CombatAction),
}

/// Cloneable handle for feeding a running host.
#[derive(Clone, Debug)]
pub struct EncounterHandle {
    input: mpsc::Sender<PlayerInput>,
    control: StepControl,
    bus: EventBus,
}

impl EncounterHandle {
    pub async fn say(&self, text: impl Into<String>) -> Result<()> {
        self.send(PlayerInput::Text(text.into())).await
    }

    pub async fn act(&self, action: CombatAction) -> Result<()> {
        self.send(PlayerInput::Action(action)).await
    }

    pub async fn send(&self, input: PlayerInput) -> Result<()> {
        self.input
            .send(input)
            .await
            .map_err(|_| RuntimeError::InputChannelClosed)
    }

    /// Releases the display event held in single-step mode.
    pub fn advance(&self) {
        self.control.advance();
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<CombatEvent> {
        self.bus.subscribe(topic)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

/// Final state of a hosted encounter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncounterSummary {
    pub state: CombatState,
    pub rounds: u32,
    pub fatal_error: Option<String>,
    pub log: Vec<LogEntry>,
    pub record: SessionRecord,
}

impl EncounterSummary {
    pub fn from_flow(flow: &CombatFlow) -> Self {
        let session = flow.session();
        Self {
            state: session.state,
            rounds: session.round_number,
            fatal_error: session.fatal_error.clone(),
            log: session.combat_log.clone(),
            record: session.to_record(),
        }
    }
}

/// What [`EncounterHost::run`] hands back.
pub struct HostOutcome<B> {
    pub summary: EncounterSummary,
    pub flow: CombatFlow,
    pub backend: B,
}

pub struct EncounterHost<B> {
    flow: CombatFlow,
    narrator: Arc<dyn Narrator>,
    backend: B,
    config: RuntimeConfig,
    input: mpsc::Receiver<PlayerInput>,
    control: StepControl,
    bus: EventBus,
}

impl<B: DisplayBackend + 'static> EncounterHost<B> {
    pub fn new(
        flow: CombatFlow,
        narrator: Arc<dyn Narrator>,
        backend: B,
        config: &RuntimeConfig,
    ) -> (Self, EncounterHandle) {
        let (input_tx, input_rx) = mpsc::channel(config.channels.input_buffer.max(1));
        let control = StepControl::new();
        let bus = EventBus::with_capacity(config.channels.event_buffer);
        let handle = EncounterHandle {
            input: input_tx,
            control: control.clone(),
            bus: bus.clone(),
        };
        let host = Self {
            flow,
            narrator,
            backend,
            config: config.clone(),
            input: input_rx,
            control,
            bus,
        };
        (host, handle)
    }

    /// Runs the encounter until it ends.
    ///
    /// Fails only when a collaborator task disappears; encounter-level
    /// failures end the combat and are reported in the summary.
    pub async fn run(self) -> Result<HostOutcome<B>> {
        let Self {
            mut flow,
            narrator,
            backend,
            config,
            mut input,
            control,
            bus,
        } = self;

        let (job_tx, job_rx) = mpsc::channel(config.channels.narration_buffer.max(1));
        let (reply_tx, mut reply_rx) = mpsc::channel(config.channels.narration_buffer.max(1));
        let (batch_tx, batch_rx) = mpsc::channel(config.channels.display_buffer.max(1));
        let (idle_tx, mut idle_rx) = mpsc::channel(config.channels.display_buffer.max(1));

        let worker = NarrationWorker::new(narrator, config.narration.timeout, job_rx, reply_tx);
        let worker = tokio::spawn(worker.run());
        let orchestrator =
            DisplayOrchestrator::new(backend, config.display.clone(), batch_rx, idle_tx, control);
        let orchestrator = tokio::spawn(orchestrator.run());

        info!(target: "combat::host", encounter = flow.encounter_id(), "encounter hosted");

        loop {
            let outcome = flow.process();
            pump(&mut flow, &bus, &job_tx, &batch_tx).await?;
            if outcome == ProcessOutcome::Finished {
                break;
            }
            let awaiting_input = outcome == ProcessOutcome::AwaitingInput;

            tokio::select! {
                seq = idle_rx.recv() => match seq {
                    Some(seq) => flow.on_display_idle(seq),
                    None => return Err(RuntimeError::DisplayChannelClosed),
                },
                reply = reply_rx.recv() => match reply {
                    Some(reply) => {
                        flow.on_narration_reply(reply);
                    }
                    None => return Err(RuntimeError::NarrationChannelClosed),
                },
                received = input.recv(), if awaiting_input => match received {
                    Some(PlayerInput::Text(text)) => {
                        if !flow.submit_player_input(text) {
                            warn!(target: "combat::host", "ignored empty player input");
                        }
                    }
                    Some(PlayerInput::Action(action)) => {
                        if !flow.submit_player_action(action) {
                            warn!(target: "combat::host", "ignored action for another combatant");
                        }
                    }
                    None => return Err(RuntimeError::InputChannelClosed),
                },
            }
        }

        drop(job_tx);
        drop(batch_tx);
        worker.await.map_err(RuntimeError::WorkerJoin)?;
        let backend = orchestrator.await.map_err(RuntimeError::WorkerJoin)?;

        let summary = EncounterSummary::from_flow(&flow);
        info!(
            target: "combat::host",
            encounter = flow.encounter_id(),
            state = %summary.state,
            rounds = summary.rounds,
            "encounter finished"
        );
        Ok(HostOutcome {
            summary,
            flow,
            backend,
        })
    }
}

/// Forwards narration jobs, lifecycle events and display batches.
async fn pump(
    flow: &mut CombatFlow,
    bus: &EventBus,
    jobs: &mpsc::Sender<NarrationJob>,
    batches: &mpsc::Sender<Vec<DisplayEnvelope>>,
) -> Result<()> {
    for job in flow.take_narration_jobs() {
        jobs.send(job)
            .await
            .map_err(|_| RuntimeError::NarrationChannelClosed)?;
    }
    for event in flow.take_events() {
        bus.publish(event);
    }
    let batch = flow.drain_display();
    if !batch.is_empty() {
        debug!(target: "combat::host", events = batch.len(), "display batch");
        batches
            .send(batch)
            .await
            .map_err(|_| RuntimeError::DisplayChannelClosed)?;
    }
    Ok(())
}
