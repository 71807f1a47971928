//! Victory loot.

use std::sync::Arc;

use tracing::debug;

use combat_content::ContentCatalog;
use combat_core::{Catalog, CombatState, DisplaySinkExt, Side};

use super::{ConsequenceHook, HookContext, HookError, HookTrigger};

/// Rolls the loot table of every defeated enemy and grants the drops to
/// the player character.
pub struct LootHook {
    content: Arc<ContentCatalog>,
}

impl LootHook {
    pub fn new(content: Arc<ContentCatalog>) -> Self {
        Self { content }
    }
}

impl ConsequenceHook for LootHook {
    fn name(&self) -> &'static str {
        "loot"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn should_trigger(&self, ctx: &HookContext<'_>) -> bool {
        matches!(ctx.trigger, HookTrigger::CombatEnded(CombatState::PlayerVictory))
            && ctx.session.player().is_some()
    }

    fn apply(&self, ctx: &mut HookContext<'_>) -> Result<(), HookError> {
        let Some(player) = ctx.session.player() else {
            return Ok(());
        };
        let (recipient, recipient_name) = (player.id.clone(), player.combat_name.clone());

        for enemy in ctx
            .session
            .iter()
            .filter(|e| e.side == Side::Enemy && !e.is_alive())
        {
            let grants = self.content.roll_loot(enemy, ctx.dice);
            if grants.is_empty() {
                continue;
            }
            ctx.inventory
                .grant(&recipient, &grants)
                .map_err(|source| HookError::Inventory {
                    hook: self.name(),
                    source,
                })?;
            for grant in &grants {
                let item = self
                    .content
                    .item(&grant.item)
                    .map(|i| i.name.clone())
                    .unwrap_or_else(|| grant.item.clone());
                ctx.sink.line(format!(
                    "{recipient_name} finds {}x {item} on {}.",
                    grant.quantity, grant.source_name
                ));
            }
            debug!(target: "combat::hooks", source = %enemy.combat_name, drops = grants.len(), "loot granted");
        }
        Ok(())
    }
}
