//! Deterministic combat rules shared by the runtime and offline tools.
//!
//! `combat-core` defines the canonical combat model (entities, actions,
//! stats, dice) and the resolution handlers that turn an attempted action
//! into entity mutations and display events. Nothing here performs I/O or
//! spawns tasks; the step-driven flow that sequences these pieces lives in
//! `combat-runtime`.
pub mod action;
pub mod catalog;
pub mod config;
pub mod dice;
pub mod display;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod inventory;
pub mod session;
pub mod stats;

pub use action::{
    ActionOutcome, ActionResult, ActionType, AttackOutcome, AttackRoll, CombatAction,
    EscapeOutcome, ItemOutcome, RejectReason, SpecialEffects, SpellOutcome, StatusApplication,
};
pub use catalog::{Catalog, EmptyCatalog, ItemDefinition, ItemEffect, Spell, SpellRole};
pub use config::{ApConfig, CombatConfig, EscapeConfig};
pub use dice::{DiceNotation, DiceParseError, DiceRoller, PcgDice, ScriptedDice};
pub use display::{
    DisplayChannel, DisplayEvent, DisplayEventKind, DisplaySink, DisplaySinkExt, LogEntry, LogRole,
};
pub use entity::{CombatEntity, EntityId, ResourceKind, ResourceMeter, Side, StatusEffects, StatusKind};
pub use error::{CombatError, ErrorContext, ErrorSeverity};
pub use handlers::{HandlerContext, HandlerError, StatusTick, resolve};
pub use inventory::{Inventory, InventoryError, ItemStack, LootGrant, MemoryInventory};
pub use session::{
    CombatSession, CombatState, CombatStep, SessionError, SessionRecord, Surprise, TurnAdvance,
};
pub use stats::{
    Attribute, DamageType, Naturals, RollMode, SkillCheck, SkillCheckOutcome, StatSheet,
    StatsError, StatsProvider, StatsRegistry,
};
