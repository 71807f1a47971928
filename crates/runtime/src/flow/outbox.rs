//! Ordered queue of display events awaiting the orchestrator.

use std::collections::VecDeque;

use serde::Serialize;

use combat_core::{DisplayEvent, DisplaySink, LogEntry};

/// A display event stamped with its position in the encounter's output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DisplayEnvelope {
    pub seq: u64,
    pub event: DisplayEvent,
}

/// Sink handed to handlers and hooks.
///
/// Stamps every event with a monotonically increasing sequence number and
/// collects transcript lines for the session log as a side channel.
#[derive(Debug, Default)]
pub struct DisplayOutbox {
    next_seq: u64,
    pending: VecDeque<DisplayEnvelope>,
    log: Vec<LogEntry>,
    visual: bool,
}

impl DisplayOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number of the most recent event (0 before any).
    pub fn last_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Takes every queued event in production order.
    pub fn drain(&mut self) -> Vec<DisplayEnvelope> {
        self.pending.drain(..).collect()
    }

    /// Transcript lines produced since the last call.
    pub fn take_log(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.log)
    }

    /// Whether a visual event was queued since the last call.
    pub fn take_visual(&mut self) -> bool {
        std::mem::replace(&mut self.visual, false)
    }
}

impl DisplaySink for DisplayOutbox {
    fn push(&mut self, event: DisplayEvent) {
        self.next_seq += 1;
        self.visual |= event.is_visual();
        if let Some(entry) = event.log_entry() {
            self.log.push(entry);
        }
        self.pending.push_back(DisplayEnvelope {
            seq: self.next_seq,
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combat_core::{DisplaySinkExt, EntityId, LogRole, ResourceKind, ResourceMeter};

    #[test]
    fn finalize_alone_is_not_visual() {
        let mut outbox = DisplayOutbox::new();
        outbox.push(DisplayEvent::resource_finalize(
            EntityId::new("g1"),
            ResourceKind::Health,
            ResourceMeter::new(12, 20),
        ));
        assert!(!outbox.take_visual());

        outbox.line("Goblin takes 8 damage.");
        assert!(outbox.take_visual());
        assert!(!outbox.take_visual());
    }

    #[test]
    fn sequence_and_log_follow_push_order() {
        let mut outbox = DisplayOutbox::new();
        outbox.notice("Round 1 begins.");
        outbox.push(DisplayEvent::narrative(LogRole::Player, "I swing."));

        let seqs: Vec<u64> = outbox.drain().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
        assert_eq!(outbox.last_seq(), 2);
        assert_eq!(
            outbox.take_log(),
            vec![
                LogEntry::new(LogRole::System, "Round 1 begins."),
                LogEntry::new(LogRole::Player, "I swing."),
            ]
        );
        assert!(outbox.is_empty());
    }
}
