//! Topic-based event bus for encounter lifecycle events.
//!
//! The flow publishes [`CombatEvent`]s as the encounter progresses; hosts
//! subscribe to the topics they need (a UI to turns, a logger to actions).
//! Delivery is best-effort and never blocks the flow.

mod bus;
mod types;

pub use bus::{EventBus, Topic};
pub use types::CombatEvent;
