//! Save and load of encounter state.
//!
//! Saves are the session's [`SessionRecord`] as pretty-printed JSON. A
//! record restores the encounter exactly, including a mid-round step.

use std::fs;
use std::path::Path;

use tracing::debug;

use combat_core::SessionRecord;

use crate::error::Result;
use crate::flow::CombatFlow;

pub fn save_session(flow: &CombatFlow) -> Result<String> {
    Ok(serde_json::to_string_pretty(&flow.session().to_record())?)
}

pub fn load_session(data: &str) -> Result<SessionRecord> {
    Ok(serde_json::from_str(data)?)
}

/// Writes the save to a temporary sibling file, then renames it into place.
pub fn write_to_path(flow: &CombatFlow, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let data = save_session(flow)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    debug!(target: "combat::persistence", path = %path.display(), "encounter saved");
    Ok(())
}

pub fn read_from_path(path: impl AsRef<Path>) -> Result<SessionRecord> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)?;
    debug!(target: "combat::persistence", path = %path.display(), "encounter loaded");
    load_session(&data)
}
