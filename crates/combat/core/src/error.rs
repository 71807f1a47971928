//! Common error infrastructure for combat-core.
//!
//! Domain-specific errors (e.g. [`crate::session::SessionError`],
//! [`crate::handlers::HandlerError`]) live next to the code that raises them.
//! They all implement [`CombatError`] so the flow can decide whether a failure
//! reads as in-fiction text or ends the encounter.
//!
//! Every error carries a severity. Recoverable and validation failures stay
//! inside the fiction; internal and fatal ones abort the encounter.

use crate::entity::EntityId;

/// How the flow treats a failure.
///
/// - **Recoverable**: The turn can continue with a substitute (e.g. fallback action)
/// - **Validation**: Invalid input, reported to the player as in-fiction text
/// - **Internal**: Unexpected state inconsistency, ends the encounter
/// - **Fatal**: Corrupted session, ends the encounter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Recoverable error - a substitute action or message is used instead.
    ///
    /// Examples: narrator timeout, malformed narrator output
    Recoverable,

    /// Validation error - invalid input, rejected without mutation.
    ///
    /// Examples: target already defeated, not enough mana
    Validation,

    /// Broken bookkeeping between collaborators.
    ///
    /// Examples: stats collaborator missing for an entity, step not transitioning
    Internal,

    /// Fatal error - the encounter cannot continue.
    ///
    /// Examples: step budget exhausted, orchestrator gone
    Fatal,
}

impl ErrorSeverity {
    /// Lowercase label used in log fields.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// A substitute keeps the turn going.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error must end the encounter.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Where in the encounter an error was raised.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Acting entity, when there is one.
    pub actor: Option<EntityId>,

    pub round: u32,

    /// Short static note.
    pub message: Option<&'static str>,
}

impl ErrorContext {
    /// Creates a new error context for the given round.
    #[must_use]
    pub const fn new(round: u32) -> Self {
        Self {
            actor: None,
            round,
            message: None,
        }
    }

    #[must_use]
    pub fn with_actor(mut self, actor: EntityId) -> Self {
        self.actor = Some(actor);
        self
    }

    #[must_use]
    pub const fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }
}

/// Implemented by every error type of the rules engine.
///
/// Severity follows what the flow can do next, not how bad the failure looks.
pub trait CombatError: core::fmt::Display + core::fmt::Debug {
    fn severity(&self) -> ErrorSeverity;

    fn context(&self) -> Option<&ErrorContext> {
        None
    }

    /// Stable identifier for logs, the type name unless overridden.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_covers_fatal() {
        assert!(ErrorSeverity::Fatal.is_internal());
        assert!(ErrorSeverity::Internal.is_internal());
        assert!(!ErrorSeverity::Validation.is_internal());
        assert!(ErrorSeverity::Recoverable.is_recoverable());
    }

    #[test]
    fn context_builder_keeps_fields() {
        let ctx = ErrorContext::new(3)
            .with_actor(EntityId::new("goblin"))
            .with_message("no stats");
        assert_eq!(ctx.round, 3);
        assert_eq!(ctx.actor, Some(EntityId::new("goblin")));
        assert_eq!(ctx.message, Some("no stats"));
    }
}
