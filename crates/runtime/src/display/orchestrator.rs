//! Paced presentation of display batches.

use std::sync::Arc;

use tokio::sync::{Notify, mpsc};
use tracing::{debug, trace};

use super::DisplayBackend;
use crate::config::DisplayConfig;
use crate::flow::DisplayEnvelope;

/// Handle for advancing a single-stepping orchestrator by hand.
#[derive(Debug, Clone, Default)]
pub struct StepControl {
    notify: Arc<Notify>,
}

impl StepControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Releases the event currently held. Does nothing when no event is
    /// held, so an early press never skips a later pause.
    pub fn advance(&self) {
        self.notify.notify_waiters();
    }
}

/// Drains display batches in FIFO order.
///
/// Visual events are presented one at a time, followed by the configured
/// delay (or, in single-step mode, a manual advance). Non-visual events are
/// applied immediately but keep their position. After each batch the
/// sequence number of its last event is reported on the idle channel.
pub struct DisplayOrchestrator<B> {
    backend: B,
    config: DisplayConfig,
    batches: mpsc::Receiver<Vec<DisplayEnvelope>>,
    idle: mpsc::Sender<u64>,
    control: StepControl,
}

impl<B: DisplayBackend> DisplayOrchestrator<B> {
    pub fn new(
        backend: B,
        config: DisplayConfig,
        batches: mpsc::Receiver<Vec<DisplayEnvelope>>,
        idle: mpsc::Sender<u64>,
        control: StepControl,
    ) -> Self {
        Self {
            backend,
            config,
            batches,
            idle,
            control,
        }
    }

    /// Runs until the batch channel closes, then returns the backend.
    pub async fn run(mut self) -> B {
        debug!(
            target: "combat::display",
            delay_ms = self.config.step_delay.as_millis() as u64,
            single_step = self.config.single_step,
            "display orchestrator started"
        );
        while let Some(batch) = self.batches.recv().await {
            let mut last = None;
            for envelope in &batch {
                self.show(envelope).await;
                last = Some(envelope.seq);
            }
            let Some(seq) = last else {
                continue;
            };
            if self.idle.send(seq).await.is_err() {
                debug!(target: "combat::display", "flow dropped the idle channel");
                break;
            }
        }
        debug!(target: "combat::display", "display orchestrator stopped");
        self.backend
    }

    async fn show(&mut self, envelope: &DisplayEnvelope) {
        let event = &envelope.event;
        if !event.is_visual() {
            trace!(target: "combat::display", seq = envelope.seq, "applying event");
            self.backend.apply(event).await;
            return;
        }

        trace!(target: "combat::display", seq = envelope.seq, "presenting event");
        if self.config.single_step {
            // Registered before presenting so a press during presentation counts.
            let notify = Arc::clone(&self.control.notify);
            let released = notify.notified();
            tokio::pin!(released);
            released.as_mut().enable();
            self.backend.present(event).await;
            released.await;
            return;
        }
        self.backend.present(event).await;
        if !self.config.step_delay.is_zero() {
            tokio::time::sleep(self.config.step_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::RecordingBackend;
    use combat_core::{DisplayEvent, EntityId, ResourceKind, ResourceMeter};
    use std::time::Duration;

    fn envelope(seq: u64, event: DisplayEvent) -> DisplayEnvelope {
        DisplayEnvelope { seq, event }
    }

    #[tokio::test]
    async fn reports_last_seq_and_keeps_order() {
        let (batch_tx, batch_rx) = mpsc::channel(4);
        let (idle_tx, mut idle_rx) = mpsc::channel(4);
        let orchestrator = DisplayOrchestrator::new(
            RecordingBackend::new(),
            DisplayConfig::default(),
            batch_rx,
            idle_tx,
            StepControl::new(),
        );
        let task = tokio::spawn(orchestrator.run());

        let meter = ResourceMeter::new(12, 20);
        batch_tx
            .send(vec![
                envelope(1, DisplayEvent::system("Goblin takes 8 damage.")),
                envelope(
                    2,
                    DisplayEvent::resource_preview(EntityId::new("g1"), ResourceKind::Health, 20, meter),
                ),
                envelope(
                    3,
                    DisplayEvent::resource_finalize(EntityId::new("g1"), ResourceKind::Health, meter),
                ),
            ])
            .await
            .unwrap();
        assert_eq!(idle_rx.recv().await, Some(3));

        drop(batch_tx);
        let backend = task.await.unwrap();
        assert_eq!(backend.presented.len(), 2);
        assert_eq!(backend.applied.len(), 1);
        assert_eq!(backend.lines(), vec!["Goblin takes 8 damage."]);
    }

    #[tokio::test]
    async fn single_step_holds_until_advanced() {
        let (batch_tx, batch_rx) = mpsc::channel(4);
        let (idle_tx, mut idle_rx) = mpsc::channel(4);
        let control = StepControl::new();
        let config = DisplayConfig {
            single_step: true,
            ..DisplayConfig::default()
        };
        let orchestrator =
            DisplayOrchestrator::new(RecordingBackend::new(), config, batch_rx, idle_tx, control.clone());
        let _task = tokio::spawn(orchestrator.run());

        batch_tx
            .send(vec![envelope(1, DisplayEvent::system("Round 1 begins."))])
            .await
            .unwrap();
        let held = tokio::time::timeout(Duration::from_millis(50), idle_rx.recv()).await;
        assert!(held.is_err());

        control.advance();
        assert_eq!(idle_rx.recv().await, Some(1));
    }

    #[tokio::test]
    async fn advance_with_nothing_held_is_dropped() {
        let (batch_tx, batch_rx) = mpsc::channel(4);
        let (idle_tx, mut idle_rx) = mpsc::channel(4);
        let control = StepControl::new();
        let config = DisplayConfig {
            single_step: true,
            ..DisplayConfig::default()
        };
        let orchestrator =
            DisplayOrchestrator::new(RecordingBackend::new(), config, batch_rx, idle_tx, control.clone());
        let _task = tokio::spawn(orchestrator.run());

        control.advance();
        control.advance();
        batch_tx
            .send(vec![envelope(1, DisplayEvent::system("Round 1 begins."))])
            .await
            .unwrap();
        let held = tokio::time::timeout(Duration::from_millis(50), idle_rx.recv()).await;
        assert!(held.is_err());

        control.advance();
        assert_eq!(idle_rx.recv().await, Some(1));
    }
}
