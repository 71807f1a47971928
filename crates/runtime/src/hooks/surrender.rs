//! Inventory transfer after a successful surrender.

use combat_core::{ActionOutcome, DisplaySinkExt, LootGrant};

use super::{ConsequenceHook, HookContext, HookError, HookTrigger};

/// Hands everything the surrendering combatant carries to its captor.
#[derive(Debug, Default, Clone, Copy)]
pub struct SurrenderTransferHook;

impl ConsequenceHook for SurrenderTransferHook {
    fn name(&self) -> &'static str {
        "surrender_transfer"
    }

    fn priority(&self) -> i32 {
        -10
    }

    fn should_trigger(&self, ctx: &HookContext<'_>) -> bool {
        matches!(
            ctx.trigger,
            HookTrigger::ActionResolved(result)
                if matches!(&result.outcome, ActionOutcome::Escape(escape) if escape.surrendered_to.is_some())
        )
    }

    fn apply(&self, ctx: &mut HookContext<'_>) -> Result<(), HookError> {
        let HookTrigger::ActionResolved(result) = ctx.trigger else {
            return Ok(());
        };
        let ActionOutcome::Escape(escape) = &result.outcome else {
            return Ok(());
        };
        let Some(captor) = &escape.surrendered_to else {
            return Ok(());
        };
        if ctx.session.entity(captor).is_none() {
            return Err(HookError::MissingRecipient {
                hook: self.name(),
                recipient: captor.clone(),
            });
        }

        let performer = ctx.session.display_name(&result.performer);
        let captor_name = ctx.session.display_name(captor);
        let inventory_error = |source| HookError::Inventory {
            hook: "surrender_transfer",
            source,
        };

        let stacks = ctx
            .inventory
            .take_all(&result.performer)
            .map_err(inventory_error)?;
        if stacks.is_empty() {
            ctx.sink.line(format!("{performer} has nothing to hand over."));
            return Ok(());
        }
        let grants: Vec<LootGrant> = stacks
            .into_iter()
            .map(|stack| LootGrant {
                item: stack.item,
                quantity: stack.quantity,
                source_name: performer.clone(),
            })
            .collect();
        ctx.inventory
            .grant(captor, &grants)
            .map_err(inventory_error)?;
        ctx.sink.line(format!(
            "{captor_name} takes {} item(s) from {performer}.",
            grants.len()
        ));
        Ok(())
    }
}
