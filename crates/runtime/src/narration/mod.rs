//! Narration integration.
//!
//! The flow asks a [`Narrator`] to turn an intent into narrative text and
//! [`StructuredRequest`]s, and optionally to describe resolved outcomes.
//! Calls run on the [`NarrationWorker`] task and come back as tickets the
//! flow matches against what it is waiting for.
mod adapter;
mod narrator;
mod types;
mod worker;

pub use adapter::{extract_json_block, parse_attempt, to_actions};
pub use narrator::{Narrator, NarratorError, ScriptedNarrator, ScriptedReply, TemplateNarrator};
pub use types::{
    AttemptNarration, AttemptRequest, EncounterContext, ModeTransitionRequest, NarrationFailure,
    NarrationJob, NarrationReply, NarrationRequest, NarrationTicket, OutcomeRequest,
    ParticipantView, SkillCheckRequest, StateChangeRequest, StructuredRequest,
};
pub use worker::NarrationWorker;
