//! Display orchestration.
//!
//! The flow never presents anything itself. Batches of
//! [`DisplayEnvelope`](crate::flow::DisplayEnvelope)s are handed to a
//! [`DisplayOrchestrator`] task that shows them through a [`DisplayBackend`]
//! at its own pace and reports back when the queue is empty.

mod backend;
mod orchestrator;

pub use backend::{DisplayBackend, RecordingBackend};
pub use orchestrator::{DisplayOrchestrator, StepControl};
