//! Display events produced by the combat layer.
//!
//! The combat layer never writes to a screen. Handlers push typed
//! [`DisplayEvent`]s into a [`DisplaySink`]; an external orchestrator drains
//! them in FIFO order at its own pace. Resource changes are emitted as a
//! preview/finalize pair: the preview animates the bar, the finalize is a
//! non-visual commit that is processed immediately but keeps its place in
//! the queue.

use strum::{AsRefStr, Display};

use crate::entity::{CombatEntity, EntityId, ResourceKind, ResourceMeter};

/// Speaker of a combat log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LogRole {
    Narrator,
    System,
    Player,
    Npc,
}

/// One line of the durable combat transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogEntry {
    pub role: LogRole,
    pub content: String,
}

impl LogEntry {
    pub fn new(role: LogRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Output area an event is addressed to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DisplayChannel {
    /// Main narrative text box.
    #[default]
    Narrative,
    /// Combatant panels (bars, status icons).
    CombatPanel,
    /// Turn order strip.
    TurnTracker,
}

/// Payload of a display event.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum DisplayEventKind {
    Narrative {
        role: LogRole,
        text: String,
    },
    /// Out-of-fiction message; `error` marks fatal encounter failures.
    System {
        text: String,
        error: bool,
    },
    /// Phase 1 of a resource change: animate the bar towards `to`.
    ResourcePreview {
        entity: EntityId,
        resource: ResourceKind,
        from: u32,
        to: u32,
        maximum: u32,
    },
    /// Phase 2: commit the value to the presentation model. Non-visual.
    ResourceFinalize {
        entity: EntityId,
        resource: ResourceKind,
        value: u32,
        maximum: u32,
    },
    EntityState {
        entity: EntityId,
        combat_name: String,
        alive: bool,
        active: bool,
        statuses: Vec<String>,
    },
    TurnOrder {
        round: u32,
        /// Combat names in initiative order.
        order: Vec<String>,
        current: Option<usize>,
    },
}

/// A queued unit of output.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisplayEvent {
    pub kind: DisplayEventKind,
    pub target_channel: DisplayChannel,
    /// Reveal text progressively rather than at once.
    pub gradual: bool,
    /// Eligible for text-to-speech.
    pub speakable: bool,
}

impl DisplayEvent {
    pub fn narrative(role: LogRole, text: impl Into<String>) -> Self {
        Self {
            kind: DisplayEventKind::Narrative {
                role,
                text: text.into(),
            },
            target_channel: DisplayChannel::Narrative,
            gradual: true,
            speakable: true,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            kind: DisplayEventKind::System {
                text: text.into(),
                error: false,
            },
            target_channel: DisplayChannel::Narrative,
            gradual: false,
            speakable: false,
        }
    }

    pub fn system_error(text: impl Into<String>) -> Self {
        Self {
            kind: DisplayEventKind::System {
                text: text.into(),
                error: true,
            },
            target_channel: DisplayChannel::Narrative,
            gradual: false,
            speakable: false,
        }
    }

    pub fn resource_preview(
        entity: EntityId,
        resource: ResourceKind,
        from: u32,
        after: ResourceMeter,
    ) -> Self {
        Self::panel(DisplayEventKind::ResourcePreview {
            entity,
            resource,
            from,
            to: after.current,
            maximum: after.maximum,
        })
    }

    pub fn resource_finalize(entity: EntityId, resource: ResourceKind, after: ResourceMeter) -> Self {
        Self::panel(DisplayEventKind::ResourceFinalize {
            entity,
            resource,
            value: after.current,
            maximum: after.maximum,
        })
    }

    pub fn entity_state(entity: &CombatEntity) -> Self {
        Self::panel(DisplayEventKind::EntityState {
            entity: entity.id.clone(),
            combat_name: entity.combat_name.clone(),
            alive: entity.is_alive(),
            active: entity.is_active_in_combat,
            statuses: entity
                .status_effects
                .iter()
                .map(|(name, _)| name.to_string())
                .collect(),
        })
    }

    pub fn turn_order(round: u32, order: Vec<String>, current: Option<usize>) -> Self {
        Self {
            kind: DisplayEventKind::TurnOrder {
                round,
                order,
                current,
            },
            target_channel: DisplayChannel::TurnTracker,
            gradual: false,
            speakable: false,
        }
    }

    fn panel(kind: DisplayEventKind) -> Self {
        Self {
            kind,
            target_channel: DisplayChannel::CombatPanel,
            gradual: false,
            speakable: false,
        }
    }

    /// Non-visual events are applied immediately instead of being paced.
    pub fn is_visual(&self) -> bool {
        !matches!(self.kind, DisplayEventKind::ResourceFinalize { .. })
    }

    /// Transcript line for narrative and system events.
    pub fn log_entry(&self) -> Option<LogEntry> {
        match &self.kind {
            DisplayEventKind::Narrative { role, text } => Some(LogEntry::new(*role, text.clone())),
            DisplayEventKind::System { text, .. } => Some(LogEntry::new(LogRole::System, text.clone())),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            DisplayEventKind::Narrative { text, .. } | DisplayEventKind::System { text, .. } => {
                Some(text)
            }
            _ => None,
        }
    }
}

/// Append-only destination for display events.
pub trait DisplaySink {
    fn push(&mut self, event: DisplayEvent);
}

impl DisplaySink for Vec<DisplayEvent> {
    fn push(&mut self, event: DisplayEvent) {
        Vec::push(self, event);
    }
}

/// Convenience constructors for any sink, trait objects included.
pub trait DisplaySinkExt: DisplaySink {
    /// Narrator line.
    fn line(&mut self, text: impl Into<String>) {
        self.push(DisplayEvent::narrative(LogRole::Narrator, text));
    }

    fn notice(&mut self, text: impl Into<String>) {
        self.push(DisplayEvent::system(text));
    }

    /// Emits the preview/finalize pair for a resource change.
    fn resource_change(
        &mut self,
        entity: &EntityId,
        resource: ResourceKind,
        from: u32,
        after: ResourceMeter,
    ) {
        self.push(DisplayEvent::resource_preview(entity.clone(), resource, from, after));
        self.push(DisplayEvent::resource_finalize(entity.clone(), resource, after));
    }
}

impl<T: DisplaySink + ?Sized> DisplaySinkExt for T {}
