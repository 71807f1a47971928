//! Combat sandbox binary.
//!
//! Composition root for a headless encounter: loads `.env`, installs
//! logging, builds the builtin content and runs one scripted fight against
//! the console backend.
//!
//! # Examples
//!
//! ```bash
//! SANDBOX_ENEMY=wolf SANDBOX_SCRIPT="I attack the wolf;flee" cargo run -p combat-sandbox
//! COMBAT_STEP_DELAY_MS=400 COMBAT_SEED=7 cargo run -p combat-sandbox
//! ```

use std::sync::Arc;

use anyhow::Result;

use combat_content::ContentFactory;
use combat_runtime::{RuntimeConfig, logging};
use combat_sandbox::{ConsoleBackend, SandboxConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::setup_logging()?;

    let runtime = RuntimeConfig::from_env();
    let sandbox = SandboxConfig::from_env();
    tracing::info!(
        enemy = %sandbox.enemy_template,
        count = sandbox.enemy_count,
        seed = ?runtime.seed,
        "starting sandbox encounter"
    );

    let content = Arc::new(ContentFactory::builtin()?);
    let (summary, _) = combat_sandbox::run(content, &sandbox, &runtime, ConsoleBackend::new()).await?;

    println!();
    println!("Outcome: {} after {} round(s)", summary.state, summary.rounds);
    if let Some(reason) = summary.fatal_error {
        println!("Aborted: {reason}");
    }
    Ok(())
}
