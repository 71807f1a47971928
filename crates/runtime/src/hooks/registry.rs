//! Hook registry for managing and executing consequence hooks.

use std::sync::Arc;

use tracing::{debug, error};

use super::{ConsequenceHook, HookContext, HookCriticality, HookError};

/// Registry that runs consequence hooks in priority order.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn ConsequenceHook>>,
}

impl HookRegistry {
    /// Creates a registry; hooks are sorted by priority (lower values first).
    pub fn new(mut hooks: Vec<Arc<dyn ConsequenceHook>>) -> Self {
        hooks.sort_by_key(|h| h.priority());
        Self { hooks }
    }

    /// Adds a hook, keeping priority order stable for equal priorities.
    pub fn register(&mut self, hook: Arc<dyn ConsequenceHook>) {
        let index = self
            .hooks
            .partition_point(|h| h.priority() <= hook.priority());
        self.hooks.insert(index, hook);
    }

    /// Runs every hook that triggers for the context.
    ///
    /// # Error Handling
    ///
    /// - `Critical`: returns the error immediately
    /// - `Important`: logs the error and continues (default)
    /// - `Optional`: logs at debug level and continues
    pub fn run(&self, ctx: &mut HookContext<'_>) -> Result<(), HookError> {
        for hook in &self.hooks {
            if !hook.should_trigger(ctx) {
                continue;
            }
            debug!(target: "combat::hooks", hook = hook.name(), "hook triggered");
            if let Err(e) = hook.apply(ctx) {
                self.handle_hook_error(hook.as_ref(), e)?;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Hook names and priorities in execution order (for debugging).
    pub fn hooks(&self) -> impl Iterator<Item = (&'static str, i32)> + '_ {
        self.hooks.iter().map(|h| (h.name(), h.priority()))
    }

    fn handle_hook_error(
        &self,
        hook: &dyn ConsequenceHook,
        error: HookError,
    ) -> Result<(), HookError> {
        match hook.criticality() {
            HookCriticality::Critical => {
                error!(
                    target: "combat::hooks",
                    hook = hook.name(),
                    criticality = "critical",
                    error = %error,
                    "Critical hook failed, aborting encounter"
                );
                return Err(error);
            }
            HookCriticality::Important => error!(
                target: "combat::hooks",
                hook = hook.name(),
                criticality = "important",
                error = %error,
                "Hook failed, continuing"
            ),
            HookCriticality::Optional => debug!(
                target: "combat::hooks",
                hook = hook.name(),
                criticality = "optional",
                error = %error,
                "Optional hook failed"
            ),
        }
        Ok(())
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.hooks()).finish()
    }
}
