//! Consequence hooks run by the flow.
//!
//! Hooks react to resolved actions and to the end of an encounter with side
//! effects that live outside the combat model: loot grants, the surrender
//! inventory transfer, and whatever the host registers on top.
//!
//! # Architecture
//!
//! - Hooks are registered on the flow builder and sorted by priority
//! - After each resolved action, and once when combat ends, every hook is
//!   asked whether it triggers for the [`HookTrigger`]
//! - A hook's criticality decides whether its failure ends the encounter

mod loot;
mod registry;
mod surrender;

pub use loot::LootHook;
pub use registry::HookRegistry;
pub use surrender::SurrenderTransferHook;

use thiserror::Error;

use combat_core::{
    ActionResult, CombatError, CombatSession, CombatState, DiceRoller, DisplaySink, EntityId,
    ErrorSeverity, Inventory, InventoryError,
};

/// Defines the criticality level of a hook for error handling.
///
/// - Critical hooks must succeed or the encounter is aborted
/// - Important hooks log errors but allow continuation
/// - Optional hooks can fail silently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookCriticality {
    /// Failure aborts the encounter with a system error.
    Critical,

    /// Failure is logged as an error; the flow continues. The default.
    Important,

    /// Failure is logged at debug level only.
    Optional,
}

/// What a hook is being asked to react to.
#[derive(Debug, Clone, Copy)]
pub enum HookTrigger<'a> {
    /// An action finished resolving (mechanics applied, nothing narrated yet).
    ActionResolved(&'a ActionResult),
    /// The encounter concluded with this outcome.
    CombatEnded(CombatState),
}

/// Collaborators a hook may use.
///
/// The session is read-only: hooks run after mechanics and must not change
/// combat resources.
pub struct HookContext<'a> {
    pub trigger: HookTrigger<'a>,
    pub session: &'a CombatSession,
    pub inventory: &'a mut dyn Inventory,
    pub dice: &'a mut dyn DiceRoller,
    pub sink: &'a mut dyn DisplaySink,
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("hook {hook} failed: {source}")]
    Inventory {
        hook: &'static str,
        #[source]
        source: InventoryError,
    },

    #[error("hook {hook} found no recipient {recipient}")]
    MissingRecipient {
        hook: &'static str,
        recipient: EntityId,
    },
}

impl CombatError for HookError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Inventory { source, .. } => source.severity(),
            Self::MissingRecipient { .. } => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Inventory { .. } => "HOOK_INVENTORY",
            Self::MissingRecipient { .. } => "HOOK_MISSING_RECIPIENT",
        }
    }
}

/// Side effect triggered by combat events.
///
/// Hooks are sorted by priority (lower values execute first):
/// - Negative priorities: transfers that must happen before anything reads inventories
/// - Zero: default
/// - Positive priorities: cosmetic hooks
pub trait ConsequenceHook: Send + Sync {
    /// Human-readable name used in logging.
    fn name(&self) -> &'static str;

    fn priority(&self) -> i32 {
        0
    }

    fn criticality(&self) -> HookCriticality {
        HookCriticality::Important
    }

    fn should_trigger(&self, ctx: &HookContext<'_>) -> bool;

    fn apply(&self, ctx: &mut HookContext<'_>) -> Result<(), HookError>;
}
