//! Runtime orchestration for turn-based combat encounters.
//!
//! This crate drives the deterministic rules in `combat-core` through an
//! explicit step machine and connects it to the outside world: a narrator
//! that turns intent text into structured requests, a display orchestrator
//! that paces output, and consequence hooks that run after mechanics.
//!
//! Modules are organized by responsibility:
//! - [`flow`] hosts the combat state machine and its builder
//! - [`narration`] provides the narrator trait, output parsing and worker task
//! - [`display`] paces display events through a backend
//! - [`hooks`] provides post-resolution consequence hooks (loot, surrender)
//! - [`host`] runs one encounter end to end on tokio
//! - [`events`] provides topic-based lifecycle events
//! - [`persistence`] saves and restores sessions
pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod flow;
pub mod hooks;
pub mod host;
pub mod intent;
pub mod logging;
pub mod narration;
pub mod persistence;

pub use config::{ChannelConfig, DisplayConfig, NarrationConfig, RuntimeConfig};
pub use display::{DisplayBackend, DisplayOrchestrator, RecordingBackend, StepControl};
pub use error::{Result, RuntimeError};
pub use events::{CombatEvent, EventBus, Topic};
pub use flow::{
    CombatFlow, CombatFlowBuilder, DisplayEnvelope, DisplayOutbox, ProcessOutcome, WaitReason,
};
pub use hooks::{
    ConsequenceHook, HookContext, HookCriticality, HookError, HookRegistry, HookTrigger, LootHook,
    SurrenderTransferHook,
};
pub use host::{EncounterHandle, EncounterHost, EncounterSummary, HostOutcome, PlayerInput};
pub use intent::{BasicIntents, IntentProvider, NpcIntent, TemplateIntents, UNARMED};
pub use narration::{
    NarrationFailure, Narrator, NarratorError, ScriptedNarrator, ScriptedReply, StructuredRequest,
    TemplateNarrator,
};
pub use persistence::{load_session, read_from_path, save_session, write_to_path};
