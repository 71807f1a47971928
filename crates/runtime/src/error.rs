//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from encounter preparation, the narration worker, display
//! orchestration and persistence so hosts can bubble them up with context.
use thiserror::Error;

use combat_core::{CombatError, EntityId, ErrorSeverity, HandlerError, SessionError};

use crate::hooks::HookError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error("no stat sheet registered for combatant {0}")]
    MissingStats(EntityId),

    #[error("combat flow requires {0} to be configured before building")]
    MissingCollaborator(&'static str),

    #[error("step {step} neither advanced nor waited")]
    StepStalled { step: combat_core::CombatStep },

    #[error("step budget of {budget} exhausted in one process call")]
    StepBudgetExceeded { budget: usize },

    #[error("{0} has no combatant to act for")]
    NoActor(combat_core::CombatStep),

    #[error("player input channel closed")]
    InputChannelClosed,

    #[error("narration worker channel closed")]
    NarrationChannelClosed,

    #[error("display orchestrator channel closed")]
    DisplayChannelClosed,

    #[error("worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("failed to encode or decode save data")]
    Serialization(#[from] serde_json::Error),

    #[error("save file I/O failed")]
    Io(#[from] std::io::Error),
}

impl CombatError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Session(err) => err.severity(),
            Self::Handler(err) => err.severity(),
            Self::Hook(err) => err.severity(),
            Self::StepStalled { .. } | Self::StepBudgetExceeded { .. } | Self::NoActor(_) => {
                ErrorSeverity::Fatal
            }
            Self::MissingStats(_) | Self::MissingCollaborator(_) => ErrorSeverity::Internal,
            Self::InputChannelClosed
            | Self::NarrationChannelClosed
            | Self::DisplayChannelClosed
            | Self::WorkerJoin(_) => ErrorSeverity::Internal,
            Self::Serialization(_) | Self::Io(_) => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Session(err) => err.error_code(),
            Self::Handler(err) => err.error_code(),
            Self::Hook(_) => "RUNTIME_HOOK",
            Self::MissingStats(_) => "RUNTIME_MISSING_STATS",
            Self::MissingCollaborator(_) => "RUNTIME_MISSING_COLLABORATOR",
            Self::StepStalled { .. } => "RUNTIME_STEP_STALLED",
            Self::StepBudgetExceeded { .. } => "RUNTIME_STEP_BUDGET",
            Self::NoActor(_) => "RUNTIME_NO_ACTOR",
            Self::InputChannelClosed => "RUNTIME_INPUT_CLOSED",
            Self::NarrationChannelClosed => "RUNTIME_NARRATION_CLOSED",
            Self::DisplayChannelClosed => "RUNTIME_DISPLAY_CLOSED",
            Self::WorkerJoin(_) => "RUNTIME_WORKER_JOIN",
            Self::Serialization(_) => "RUNTIME_SERIALIZATION",
            Self::Io(_) => "RUNTIME_IO",
        }
    }
}
