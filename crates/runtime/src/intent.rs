//! NPC decision making.
//!
//! When an NPC's turn comes up the flow asks an [`IntentProvider`] what it
//! does. The answer is either a ready [`CombatAction`] or free intent text
//! that goes through the narrator like a player's would.

use std::collections::BTreeMap;
use std::sync::Arc;

use combat_content::ContentCatalog;
use combat_core::{
    Catalog, CombatAction, CombatEntity, CombatSession, DiceNotation, DiceRoller, EntityId,
    SpellRole,
};

/// Damage dice of a combatant with no weapon.
pub const UNARMED: DiceNotation = DiceNotation::new(1, 4, 0);

/// What an NPC decided to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NpcIntent {
    Action(CombatAction),
    /// Intent text resolved through the narrator.
    Narrated(String),
}

pub trait IntentProvider: Send {
    /// Decides the action of an NPC whose turn it is.
    fn npc_intent(
        &mut self,
        session: &CombatSession,
        actor: &EntityId,
        dice: &mut dyn DiceRoller,
    ) -> NpcIntent;

    /// Weapon dice used for attacks that name none.
    fn weapon(&self, session: &CombatSession, actor: &EntityId) -> Option<DiceNotation>;

    /// Attack on the first living opponent; the narration fallback.
    fn basic_attack(&self, session: &CombatSession, actor: &EntityId) -> Option<CombatAction> {
        let side = session.entity(actor)?.side;
        let target = session.living_opponents(side).next()?;
        let weapon = self.weapon(session, actor).unwrap_or(UNARMED);
        Some(CombatAction::attack(actor.clone(), target.id.clone(), weapon))
    }
}

/// Attacks the first living opponent every turn.
#[derive(Clone, Debug, Default)]
pub struct BasicIntents {
    weapons: BTreeMap<EntityId, DiceNotation>,
}

impl BasicIntents {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_weapon(mut self, entity: impl Into<EntityId>, dice: DiceNotation) -> Self {
        self.weapons.insert(entity.into(), dice);
        self
    }
}

impl IntentProvider for BasicIntents {
    fn npc_intent(
        &mut self,
        session: &CombatSession,
        actor: &EntityId,
        _dice: &mut dyn DiceRoller,
    ) -> NpcIntent {
        let action = self.basic_attack(session, actor).unwrap_or_else(|| {
            CombatAction::new(combat_core::ActionType::Wait, actor.clone())
        });
        NpcIntent::Action(action)
    }

    fn weapon(&self, _session: &CombatSession, actor: &EntityId) -> Option<DiceNotation> {
        self.weapons.get(actor).copied()
    }
}

/// Bestiary-driven tactics.
///
/// A creature heals a badly wounded ally when it knows a healing spell,
/// sometimes opens with an offensive spell it can afford, and otherwise
/// strikes the weakest opponent with its template weapon.
#[derive(Clone, Debug)]
pub struct TemplateIntents {
    content: Arc<ContentCatalog>,
    weapons: BTreeMap<EntityId, DiceNotation>,
    narrate: bool,
}

impl TemplateIntents {
    /// Percentage chance of preferring an affordable offensive spell.
    pub const SPELL_CHANCE: u32 = 50;

    pub fn new(content: Arc<ContentCatalog>) -> Self {
        Self {
            content,
            weapons: BTreeMap::new(),
            narrate: false,
        }
    }

    /// Weapon of a combatant without a template (typically the player).
    #[must_use]
    pub fn with_weapon(mut self, entity: impl Into<EntityId>, dice: DiceNotation) -> Self {
        self.weapons.insert(entity.into(), dice);
        self
    }

    /// Emit decisions as intent text for the narrator instead of actions.
    #[must_use]
    pub fn narrated(mut self, narrate: bool) -> Self {
        self.narrate = narrate;
        self
    }

    fn known_spells<'a>(&'a self, entity: &CombatEntity) -> Vec<&'a combat_core::Spell> {
        entity
            .template
            .as_deref()
            .and_then(|key| self.content.creature(key))
            .map(|creature| {
                creature
                    .spells
                    .iter()
                    .filter_map(|id| self.content.spell(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn decide(
        &self,
        session: &CombatSession,
        actor: &CombatEntity,
        dice: &mut dyn DiceRoller,
    ) -> Option<(CombatAction, String)> {
        let spells = self.known_spells(actor);
        let affordable = |role: SpellRole, heals: bool| {
            spells
                .iter()
                .find(|s| s.role == role && s.heals == heals && s.mana_cost <= actor.mp.current)
                .copied()
        };

        if let Some(heal) = affordable(SpellRole::Defensive, true)
            && let Some(ally) = session
                .living_allies(actor.side)
                .filter(|e| e.hp.current * 2 < e.hp.maximum)
                .min_by_key(|e| e.hp.current)
        {
            let action =
                CombatAction::spell(actor.id.clone(), heal.id.clone()).with_target(ally.id.clone());
            let intent = format!("cast {} on {}", heal.id, ally.combat_name);
            return Some((action, intent));
        }

        let weakest = session
            .living_opponents(actor.side)
            .min_by_key(|e| e.hp.current)?;

        if let Some(spell) = affordable(SpellRole::Offensive, false)
            && dice.roll_d100() <= Self::SPELL_CHANCE
        {
            let action = CombatAction::spell(actor.id.clone(), spell.id.clone())
                .with_target(weakest.id.clone());
            let intent = format!("cast {} on {}", spell.id, weakest.combat_name);
            return Some((action, intent));
        }

        let weapon = self.weapon(session, &actor.id).unwrap_or(UNARMED);
        let action = CombatAction::attack(actor.id.clone(), weakest.id.clone(), weapon);
        Some((action, format!("attack {}", weakest.combat_name)))
    }
}

impl IntentProvider for TemplateIntents {
    fn npc_intent(
        &mut self,
        session: &CombatSession,
        actor: &EntityId,
        dice: &mut dyn DiceRoller,
    ) -> NpcIntent {
        let decision = session
            .entity(actor)
            .and_then(|entity| self.decide(session, entity, dice));
        match decision {
            Some((_, intent)) if self.narrate => NpcIntent::Narrated(intent),
            Some((action, _)) => NpcIntent::Action(action),
            None => NpcIntent::Action(CombatAction::new(combat_core::ActionType::Wait, actor.clone())),
        }
    }

    fn weapon(&self, session: &CombatSession, actor: &EntityId) -> Option<DiceNotation> {
        if let Some(dice) = self.weapons.get(actor) {
            return Some(*dice);
        }
        session
            .entity(actor)?
            .template
            .as_deref()
            .and_then(|key| self.content.creature(key))
            .and_then(|creature| creature.weapon)
    }
}
