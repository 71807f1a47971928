//! Runtime configuration structures and loaders.
use std::env;
use std::time::Duration;

use combat_core::{ApConfig, CombatConfig};

/// Configuration shared by the flow, the narration worker and the
/// display orchestrator.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeConfig {
    pub combat: CombatConfig,
    pub narration: NarrationConfig,
    pub display: DisplayConfig,
    pub channels: ChannelConfig,
    /// Seed for the encounter dice; a fresh one is drawn when absent.
    pub seed: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            combat: CombatConfig::default(),
            narration: NarrationConfig::default(),
            display: DisplayConfig::default(),
            channels: ChannelConfig::default(),
            seed: None,
        }
    }
}

impl RuntimeConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `COMBAT_MAX_STEPS` - Step budget per process call (default: 20)
    /// - `COMBAT_INITIATIVE_DIE` - Sides of the initiative die (default: 20)
    /// - `COMBAT_REROLL_INITIATIVE` - Reroll initiative every round (default: false)
    /// - `COMBAT_ACTION_POINTS` - Enable multi-action turns with default AP tables (default: false)
    /// - `COMBAT_SURPRISE_DURATION` - Turns a surprised combatant loses (default: 1)
    /// - `COMBAT_NARRATION_TIMEOUT_MS` - Narrator call timeout (default: 30000)
    /// - `COMBAT_NARRATE_OUTCOMES` - Ask the narrator to describe outcomes (default: true)
    /// - `COMBAT_STEP_DELAY_MS` - Pause after each visual display event (default: 0)
    /// - `COMBAT_SINGLE_STEP` - Wait for a manual advance after each event (default: false)
    /// - `COMBAT_DISPLAY_BUFFER` - Display batch queue size (default: 64)
    /// - `COMBAT_EVENT_BUFFER` - Lifecycle event buffer per topic (default: 100)
    /// - `COMBAT_SEED` - Dice seed (default: random)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`RuntimeConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key);
        let mut config = Self::default();

        if let Some(steps) = parse::<usize>(read("COMBAT_MAX_STEPS")) {
            config.combat.max_steps_per_process = steps.max(1);
        }
        if let Some(die) = parse::<u32>(read("COMBAT_INITIATIVE_DIE")) {
            config.combat.initiative_die = die.max(2);
        }
        if let Some(reroll) = parse::<bool>(read("COMBAT_REROLL_INITIATIVE")) {
            config.combat.reroll_initiative_each_round = reroll;
        }
        if let Some(true) = parse::<bool>(read("COMBAT_ACTION_POINTS")) {
            config.combat.action_points = Some(ApConfig::default());
        }
        if let Some(turns) = parse::<u32>(read("COMBAT_SURPRISE_DURATION")) {
            config.combat.surprise_duration = turns;
        }

        if let Some(ms) = parse::<u64>(read("COMBAT_NARRATION_TIMEOUT_MS")) {
            config.narration.timeout = Duration::from_millis(ms.max(1));
        }
        if let Some(narrate) = parse::<bool>(read("COMBAT_NARRATE_OUTCOMES")) {
            config.narration.narrate_outcomes = narrate;
        }

        if let Some(ms) = parse::<u64>(read("COMBAT_STEP_DELAY_MS")) {
            config.display.step_delay = Duration::from_millis(ms);
        }
        if let Some(single) = parse::<bool>(read("COMBAT_SINGLE_STEP")) {
            config.display.single_step = single;
        } else if read("COMBAT_SINGLE_STEP").is_some() {
            // Setting the variable without a value turns it on.
            config.display.single_step = true;
        }

        if let Some(capacity) = parse::<usize>(read("COMBAT_DISPLAY_BUFFER")) {
            config.channels.display_buffer = capacity.max(1);
        }
        if let Some(capacity) = parse::<usize>(read("COMBAT_EVENT_BUFFER")) {
            config.channels.event_buffer = capacity.max(1);
        }

        config.seed = parse::<u64>(read("COMBAT_SEED"));
        config
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NarrationConfig {
    /// Upper bound on one narrator call before the fallback path applies.
    pub timeout: Duration,
    /// Request a description of each resolved action.
    pub narrate_outcomes: bool,
    /// Transcript lines included in the narrator's encounter context.
    pub context_log_lines: usize,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            narrate_outcomes: true,
            context_log_lines: 12,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Pause after each visual event.
    pub step_delay: Duration,
    /// Developer mode: hold after every event until advanced by hand.
    pub single_step: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelConfig {
    pub display_buffer: usize,
    pub narration_buffer: usize,
    pub input_buffer: usize,
    pub event_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            display_buffer: 64,
            narration_buffer: 8,
            input_buffer: 8,
            event_buffer: 100,
        }
    }
}

fn parse<T>(value: Option<String>) -> Option<T>
where
    T: std::str::FromStr,
{
    value?.trim().parse().ok()
}
