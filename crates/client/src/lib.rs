//! Headless sandbox running one scripted encounter.
//!
//! # Architecture
//!
//! ```text
//! Sandbox (composition root)
//!   ├─→ ContentCatalog (builtin RON data)
//!   ├─→ CombatFlow (session, stats, dice, intents, hooks)
//!   ├─→ Narrator (keyword templates, no language model)
//!   └─→ DisplayBackend (console by default)
//! ```
//!
//! The player's turns are fed from a script of intent lines. Once the
//! script runs out its last line is repeated until the encounter ends.

mod console;

pub use console::ConsoleBackend;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use combat_content::{ContentCatalog, EncounterBuilder};
use combat_core::{
    Attribute, CombatEntity, CombatSession, DiceNotation, MemoryInventory, Side, StatSheet,
    Surprise,
};
use combat_runtime::{
    CombatFlow, DisplayBackend, EncounterHost, EncounterSummary, LootHook, RuntimeConfig,
    SurrenderTransferHook, TemplateIntents, TemplateNarrator, write_to_path,
};

pub const PLAYER_ID: &str = "hero";

/// Scenario knobs on top of [`RuntimeConfig`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SandboxConfig {
    pub player_name: String,
    pub enemy_template: String,
    pub enemy_count: usize,
    /// The player opens with a surprise round.
    pub ambush: bool,
    /// NPC turns go through the narrator as intent text.
    pub narrated_npcs: bool,
    pub script: Vec<String>,
    /// Where to write the final session record.
    pub save_path: Option<PathBuf>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            player_name: "Aria".into(),
            enemy_template: "goblin".into(),
            enemy_count: 2,
            ambush: false,
            narrated_npcs: false,
            script: vec![
                "I charge the nearest goblin".into(),
                "I attack Goblin 1".into(),
                "I attack Goblin 2".into(),
            ],
            save_path: None,
        }
    }
}

impl SandboxConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `SANDBOX_PLAYER` - Player character name (default: Aria)
    /// - `SANDBOX_ENEMY` - Bestiary template of the opponents (default: goblin)
    /// - `SANDBOX_ENEMY_COUNT` - Number of opponents (default: 2)
    /// - `SANDBOX_AMBUSH` - Player opens with a surprise round (default: false)
    /// - `SANDBOX_NARRATED_NPCS` - NPC intents go through the narrator (default: false)
    /// - `SANDBOX_SCRIPT` - Player intents separated by `;`
    /// - `SANDBOX_SAVE` - Path for the final session record (default: none)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(name) = env::var("SANDBOX_PLAYER")
            && !name.trim().is_empty()
        {
            config.player_name = name.trim().to_string();
        }
        if let Ok(template) = env::var("SANDBOX_ENEMY") {
            config.enemy_template = template.trim().to_ascii_lowercase();
        }
        if let Some(count) = env::var("SANDBOX_ENEMY_COUNT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            config.enemy_count = count.max(1);
        }
        if let Some(ambush) = env::var("SANDBOX_AMBUSH").ok().and_then(|v| v.parse().ok()) {
            config.ambush = ambush;
        }
        if let Some(narrated) = env::var("SANDBOX_NARRATED_NPCS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.narrated_npcs = narrated;
        }
        if let Ok(script) = env::var("SANDBOX_SCRIPT") {
            let lines: Vec<String> = script
                .split(';')
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect();
            if !lines.is_empty() {
                config.script = lines;
            }
        }
        config.save_path = env::var_os("SANDBOX_SAVE").map(PathBuf::from);
        config
    }
}

/// Player character of the sandbox.
pub fn player(name: &str) -> (CombatEntity, StatSheet) {
    let entity = CombatEntity::new(PLAYER_ID, name, Side::Player)
        .with_hp(30, 30)
        .with_mp(10, 10)
        .with_stamina(12, 12);
    let sheet = StatSheet::new(2)
        .with_attribute(Attribute::Strength, 14)
        .with_attribute(Attribute::Dexterity, 13)
        .with_attribute(Attribute::Intelligence, 12)
        .with_defense(13)
        .with_proficiency("escape");
    (entity, sheet)
}

/// Assembles the flow for a sandbox encounter.
pub fn build_flow(
    content: Arc<ContentCatalog>,
    config: &SandboxConfig,
    runtime: &RuntimeConfig,
    encounter_id: u64,
) -> Result<CombatFlow> {
    let (hero, sheet) = player(&config.player_name);
    let encounter = EncounterBuilder::new(&content)
        .combatant(hero, sheet)?
        .enemies(&config.enemy_template, config.enemy_count)?
        .build();

    let mut session = CombatSession::prepare(encounter_id, encounter.entities)?;
    if config.ambush {
        session = session.with_surprise(Surprise {
            attacker: PLAYER_ID.into(),
            intent: config.script.first().cloned(),
        });
    }

    let intents = TemplateIntents::new(content.clone())
        .with_weapon(PLAYER_ID, DiceNotation::new(1, 8, 0))
        .narrated(config.narrated_npcs);
    let inventory = MemoryInventory::new()
        .with_item(PLAYER_ID, "healing_potion", 2)
        .with_item(PLAYER_ID, "copper_coin", 12);

    let flow = CombatFlow::builder(session)
        .stats(encounter.stats)
        .catalog(content.clone())
        .inventory(inventory)
        .intents(intents)
        .hook(Arc::new(LootHook::new(content)))
        .hook(Arc::new(SurrenderTransferHook))
        .runtime_config(runtime)
        .build()?;
    Ok(flow)
}

/// Runs one scripted encounter on `backend` and returns its summary.
pub async fn run<B>(
    content: Arc<ContentCatalog>,
    config: &SandboxConfig,
    runtime: &RuntimeConfig,
    backend: B,
) -> Result<(EncounterSummary, B)>
where
    B: DisplayBackend + 'static,
{
    if config.script.is_empty() {
        bail!("the player script is empty");
    }
    let flow = build_flow(content, config, runtime, 1)?;
    let (host, handle) = EncounterHost::new(flow, Arc::new(TemplateNarrator), backend, runtime);

    let script = config.script.clone();
    let player = handle.clone();
    let typist = tokio::spawn(async move {
        let last = script.last().cloned().unwrap_or_default();
        for line in script.into_iter().chain(std::iter::repeat(last)) {
            // The host closes input once the encounter is over.
            if player.say(line).await.is_err() {
                break;
            }
        }
    });

    let outcome = host.run().await.context("encounter host failed")?;
    typist.await.context("player script task failed")?;

    if let Some(path) = &config.save_path {
        write_to_path(&outcome.flow, path)
            .with_context(|| format!("failed to save to {}", path.display()))?;
        info!(path = %path.display(), "session saved");
    }
    if let Some(reason) = &outcome.summary.fatal_error {
        warn!(reason = %reason, "encounter ended by an internal failure");
    }
    Ok((outcome.summary, outcome.backend))
}
