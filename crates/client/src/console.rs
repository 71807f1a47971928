//! Plain stdout rendering of display events.

use std::io::Write;

use async_trait::async_trait;

use combat_core::{DisplayEvent, DisplayEventKind, LogRole};
use combat_runtime::DisplayBackend;

/// Prints narrative and system lines, bar changes and turn order.
///
/// Entity state snapshots are skipped; the lines around them already say
/// what changed.
#[derive(Debug, Default)]
pub struct ConsoleBackend {
    /// Print only transcript lines.
    quiet: bool,
}

impl ConsoleBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Console form of an event; `None` when it prints nothing.
    pub fn render(&self, event: &DisplayEvent) -> Option<String> {
        match &event.kind {
            DisplayEventKind::Narrative { role, text } => Some(match role {
                LogRole::Player => format!("> {text}"),
                LogRole::Npc => format!("  \"{text}\""),
                LogRole::Narrator | LogRole::System => text.clone(),
            }),
            DisplayEventKind::System { text, error: true } => Some(format!("!! {text}")),
            DisplayEventKind::System { text, .. } => Some(format!("-- {text}")),
            _ if self.quiet => None,
            DisplayEventKind::ResourcePreview {
                entity,
                resource,
                from,
                to,
                maximum,
            } => Some(format!("   [{entity} {resource}: {from} -> {to} / {maximum}]")),
            DisplayEventKind::TurnOrder {
                order,
                current: Some(index),
                ..
            } => order
                .get(*index)
                .map(|name| format!("   [turn: {name}]")),
            DisplayEventKind::TurnOrder { .. }
            | DisplayEventKind::ResourceFinalize { .. }
            | DisplayEventKind::EntityState { .. } => None,
        }
    }
}

#[async_trait]
impl DisplayBackend for ConsoleBackend {
    async fn present(&mut self, event: &DisplayEvent) {
        if let Some(line) = self.render(event) {
            let mut stdout = std::io::stdout().lock();
            // A closed stdout only loses output.
            let _ = writeln!(stdout, "{line}");
        }
    }
}
