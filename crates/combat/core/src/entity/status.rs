//! Status effects carried by a combatant.
//!
//! Effects are keyed by name and hold a remaining duration in turns;
//! `None` means the effect lasts until explicitly removed. Names are open
//! (narration may introduce new ones), while [`StatusKind`] lists the
//! effects the rules react to.

use std::collections::BTreeMap;

use strum::{AsRefStr, Display, EnumString};

/// Status effects with mechanical meaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr, EnumString)]
pub enum StatusKind {
    // ========================================================================
    // Crowd Control
    // ========================================================================
    /// Skips its next turn (applied to the ambushed side).
    Surprised,

    /// Cannot act at all.
    Stunned,

    /// Attacks with disadvantage.
    Blinded,

    // ========================================================================
    // Buffs
    // ========================================================================
    /// Raised defense until its next turn.
    Defending,

    /// Advantage on attacks, easier escapes.
    Hasted,

    /// HP recovery every turn.
    Regenerating,

    // ========================================================================
    // Debuffs
    // ========================================================================
    /// HP loss every turn.
    Poisoned,

    /// Fire damage every turn.
    Burning,

    /// Harder escapes.
    Slowed,

    /// Harder escapes.
    Encumbered,
}

impl StatusKind {
    /// Whether an actor under this effect loses its turn.
    pub const fn skips_turn(&self) -> bool {
        matches!(self, Self::Surprised | Self::Stunned)
    }
}

/// Active status effects on a combatant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct StatusEffects {
    effects: BTreeMap<String, Option<u32>>,
}

impl StatusEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an effect, or refreshes it.
    ///
    /// Refreshing keeps the longer of the two durations; an indefinite
    /// duration always wins.
    pub fn add(&mut self, name: impl Into<String>, duration: Option<u32>) {
        let name = name.into();
        match self.effects.get_mut(&name) {
            Some(existing) => {
                *existing = match (*existing, duration) {
                    (None, _) | (_, None) => None,
                    (Some(a), Some(b)) => Some(a.max(b)),
                };
            }
            None => {
                self.effects.insert(name, duration);
            }
        }
    }

    /// Removes an effect; returns true if it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.effects.remove(name).is_some()
    }

    pub fn has(&self, name: &str) -> bool {
        self.effects.contains_key(name)
    }

    pub fn has_kind(&self, kind: StatusKind) -> bool {
        self.has(kind.as_ref())
    }

    /// Remaining duration (`Some(None)` for indefinite effects).
    pub fn duration(&self, name: &str) -> Option<Option<u32>> {
        self.effects.get(name).copied()
    }

    /// Decrements all finite durations by one turn.
    ///
    /// Returns the names of effects that expired during this call, in name
    /// order. An effect reaching zero is removed and reported exactly once;
    /// indefinite effects are never removed.
    pub fn decrement(&mut self) -> Vec<String> {
        let mut expired = Vec::new();
        for (name, duration) in self.effects.iter_mut() {
            if let Some(turns) = duration {
                *turns = turns.saturating_sub(1);
                if *turns == 0 {
                    expired.push(name.clone());
                }
            }
        }
        for name in &expired {
            self.effects.remove(name);
        }
        expired
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<u32>)> {
        self.effects.iter().map(|(name, d)| (name.as_str(), *d))
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_one_expires_exactly_once() {
        let mut effects = StatusEffects::new();
        effects.add("Poisoned", Some(1));

        assert_eq!(effects.decrement(), vec!["Poisoned".to_string()]);
        assert!(!effects.has("Poisoned"));
        assert!(effects.decrement().is_empty());
    }

    #[test]
    fn indefinite_effects_never_expire() {
        let mut effects = StatusEffects::new();
        effects.add("Cursed", None);
        for _ in 0..50 {
            assert!(effects.decrement().is_empty());
        }
        assert_eq!(effects.duration("Cursed"), Some(None));
    }

    #[test]
    fn refresh_keeps_longer_duration() {
        let mut effects = StatusEffects::new();
        effects.add("Hasted", Some(3));
        effects.add("Hasted", Some(1));
        assert_eq!(effects.duration("Hasted"), Some(Some(3)));
        effects.add("Hasted", None);
        assert_eq!(effects.duration("Hasted"), Some(None));
    }

    #[test]
    fn kind_lookup_uses_display_name() {
        let mut effects = StatusEffects::new();
        effects.add(StatusKind::Defending.as_ref(), Some(1));
        assert!(effects.has_kind(StatusKind::Defending));
        assert!(StatusKind::Surprised.skips_turn());
    }
}
