//! Combatants taking part in an encounter.
//!
//! A [`CombatEntity`] lives for one encounter only. Its persistent
//! counterpart (if any) belongs to an external NPC collaborator and is synced,
//! not owned, by the combat layer. The entity is the authoritative owner of
//! current resource levels during combat; the stats collaborator mirrors them.

mod resources;
mod status;

pub use resources::{ResourceKind, ResourceMeter};
pub use status::{StatusEffects, StatusKind};

use std::fmt;

/// Identifier of a combatant, stable across game sessions.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Which team a combatant fights for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Side {
    /// The controllable player character.
    Player,
    /// Companions fighting alongside the player.
    Ally,
    /// Opponents.
    Enemy,
}

impl Side {
    /// Player and allies form one team.
    pub const fn is_player_team(&self) -> bool {
        matches!(self, Self::Player | Self::Ally)
    }

    pub const fn opposes(&self, other: Side) -> bool {
        self.is_player_team() != other.is_player_team()
    }
}

/// One combatant in an encounter.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatEntity {
    pub id: EntityId,
    /// Base name before disambiguation ("Goblin").
    pub name: String,
    /// Name unique within this encounter only ("Goblin 1").
    pub combat_name: String,
    pub side: Side,
    /// Bestiary/template identifier used for loot and persistence sync.
    pub template: Option<String>,
    pub hp: ResourceMeter,
    pub mp: ResourceMeter,
    pub stamina: ResourceMeter,
    pub status_effects: StatusEffects,
    pub initiative: i32,
    /// False once fled, surrendered, or defeated and processed.
    pub is_active_in_combat: bool,
}

impl CombatEntity {
    /// Creates a combatant at full resources.
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>, side: Side) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            combat_name: name.clone(),
            name,
            side,
            template: None,
            hp: ResourceMeter::full(1),
            mp: ResourceMeter::full(0),
            stamina: ResourceMeter::full(0),
            status_effects: StatusEffects::new(),
            initiative: 0,
            is_active_in_combat: true,
        }
    }

    #[must_use]
    pub fn with_hp(mut self, current: u32, maximum: u32) -> Self {
        self.hp = ResourceMeter::new(current, maximum);
        self
    }

    #[must_use]
    pub fn with_mp(mut self, current: u32, maximum: u32) -> Self {
        self.mp = ResourceMeter::new(current, maximum);
        self
    }

    #[must_use]
    pub fn with_stamina(mut self, current: u32, maximum: u32) -> Self {
        self.stamina = ResourceMeter::new(current, maximum);
        self
    }

    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn is_alive(&self) -> bool {
        self.hp.current > 0
    }

    /// Alive and still participating.
    pub fn can_act(&self) -> bool {
        self.is_alive() && self.is_active_in_combat
    }

    /// Applies damage; returns the HP actually lost.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        self.hp.drain(amount)
    }

    /// Restores HP; returns the HP actually gained.
    pub fn heal(&mut self, amount: u32) -> u32 {
        self.hp.fill(amount)
    }

    /// Spends mana; fails closed without mutation if insufficient.
    pub fn spend_mp(&mut self, amount: u32) -> bool {
        self.mp.try_spend(amount)
    }

    /// Spends stamina; fails closed without mutation if insufficient.
    pub fn spend_stamina(&mut self, amount: u32) -> bool {
        self.stamina.try_spend(amount)
    }

    pub fn restore_mp(&mut self, amount: u32) -> u32 {
        self.mp.fill(amount)
    }

    pub fn restore_stamina(&mut self, amount: u32) -> u32 {
        self.stamina.fill(amount)
    }

    pub fn meter(&self, kind: ResourceKind) -> Option<&ResourceMeter> {
        match kind {
            ResourceKind::Health => Some(&self.hp),
            ResourceKind::Mana => Some(&self.mp),
            ResourceKind::Stamina => Some(&self.stamina),
            ResourceKind::ActionPoints => None,
        }
    }

    pub fn meter_mut(&mut self, kind: ResourceKind) -> Option<&mut ResourceMeter> {
        match kind {
            ResourceKind::Health => Some(&mut self.hp),
            ResourceKind::Mana => Some(&mut self.mp),
            ResourceKind::Stamina => Some(&mut self.stamina),
            ResourceKind::ActionPoints => None,
        }
    }

    pub fn add_status_effect(&mut self, name: impl Into<String>, duration: Option<u32>) {
        self.status_effects.add(name, duration);
    }

    pub fn remove_status_effect(&mut self, name: &str) -> bool {
        self.status_effects.remove(name)
    }

    pub fn has_status(&self, kind: StatusKind) -> bool {
        self.status_effects.has_kind(kind)
    }

    /// Ticks every finite effect down one turn; returns the ones that expired.
    pub fn decrement_status_effect_durations(&mut self) -> Vec<String> {
        self.status_effects.decrement()
    }

    /// Removes the entity from play without touching its HP.
    pub fn deactivate(&mut self) {
        self.is_active_in_combat = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::{DiceRoller, PcgDice};

    fn goblin() -> CombatEntity {
        CombatEntity::new("goblin", "Goblin", Side::Enemy)
            .with_hp(20, 20)
            .with_mp(5, 5)
            .with_stamina(10, 10)
    }

    #[test]
    fn resources_stay_within_bounds_under_random_mutation() {
        let mut dice = PcgDice::new(7);
        let mut entity = goblin();

        for _ in 0..2_000 {
            let amount = dice.roll_die(30);
            match dice.roll_die(6) {
                1 => {
                    entity.take_damage(amount);
                }
                2 => {
                    entity.heal(amount);
                }
                3 => {
                    entity.spend_mp(amount);
                }
                4 => {
                    entity.spend_stamina(amount);
                }
                5 => {
                    entity.restore_mp(amount);
                }
                _ => {
                    entity.restore_stamina(amount);
                }
            }
            assert!(entity.hp.current <= entity.hp.maximum);
            assert!(entity.mp.current <= entity.mp.maximum);
            assert!(entity.stamina.current <= entity.stamina.maximum);
        }
    }

    #[test]
    fn spend_fails_closed_when_insufficient() {
        let mut entity = goblin();
        assert!(!entity.spend_mp(6));
        assert_eq!(entity.mp.current, 5);
        assert!(!entity.spend_stamina(11));
        assert_eq!(entity.stamina.current, 10);
    }

    #[test]
    fn alive_and_active_are_distinct() {
        let mut entity = goblin();
        entity.deactivate();
        assert!(entity.is_alive());
        assert!(!entity.can_act());
    }

    #[test]
    fn sides_oppose_across_teams() {
        assert!(Side::Player.opposes(Side::Enemy));
        assert!(!Side::Player.opposes(Side::Ally));
        assert!(Side::Enemy.opposes(Side::Ally));
    }
}
