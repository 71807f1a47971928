//! Initiative, turn advancement and end-of-combat detection.

use tracing::debug;

use crate::config::ApConfig;
use crate::dice::DiceRoller;
use crate::entity::{CombatEntity, EntityId, Side};
use crate::session::{CombatSession, CombatState};
use crate::stats::{StatsError, StatsProvider};

/// Where `advance_turn` landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnAdvance {
    /// Next eligible actor selected; `new_round` when the order wrapped.
    Next { index: usize, new_round: bool },
    /// Nobody can act; the combat state has been re-evaluated.
    NoEligibleActor,
}

impl CombatSession {
    /// Rolls initiative for every combatant and fixes the turn order.
    ///
    /// initiative = dexterity modifier + 1d`die`. Ties fall back to the
    /// higher bonus, then roster position, so a fixed seed always yields the
    /// same order.
    pub fn roll_initiative(
        &mut self,
        stats: &dyn StatsProvider,
        dice: &mut dyn DiceRoller,
        die: u32,
    ) -> Result<(), StatsError> {
        let mut rolled = Vec::with_capacity(self.roster.len());
        for (position, id) in self.roster.iter().enumerate() {
            let bonus = stats.sheet(id)?.initiative_bonus();
            let value = bonus + dice.roll_die(die.max(1)) as i32;
            rolled.push((value, bonus, position, id.clone()));
        }

        rolled.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));

        for (value, _, _, id) in &rolled {
            if let Some(entity) = self.entities.get_mut(id) {
                entity.initiative = *value;
            }
        }
        self.turn_order = rolled.into_iter().map(|(_, _, _, id)| id).collect();
        self.current_turn_index = 0;
        debug!(
            target: "combat::turn",
            order = ?self.turn_order,
            "initiative rolled"
        );
        Ok(())
    }

    /// Id of the combatant whose turn it is.
    pub fn current_actor(&self) -> Option<&EntityId> {
        self.turn_order.get(self.current_turn_index)
    }

    pub fn current_actor_entity(&self) -> Option<&CombatEntity> {
        self.current_actor().and_then(|id| self.entities.get(id))
    }

    fn is_eligible(&self, index: usize) -> bool {
        self.turn_order
            .get(index)
            .and_then(|id| self.entities.get(id))
            .is_some_and(CombatEntity::can_act)
    }

    /// Points the turn index at the first eligible combatant of a round.
    pub fn select_first_actor(&mut self) -> TurnAdvance {
        match (0..self.turn_order.len()).find(|&index| self.is_eligible(index)) {
            Some(index) => {
                self.current_turn_index = index;
                TurnAdvance::Next {
                    index,
                    new_round: false,
                }
            }
            None => {
                self.check_combat_state();
                TurnAdvance::NoEligibleActor
            }
        }
    }

    /// Scans forward circularly for the next eligible combatant.
    ///
    /// Dead and inactive entries are skipped but stay in the order. Wrapping
    /// past the end starts a new round. If nobody is eligible the combat
    /// state is re-evaluated instead.
    pub fn advance_turn(&mut self) -> TurnAdvance {
        let len = self.turn_order.len();
        if len == 0 {
            self.check_combat_state();
            return TurnAdvance::NoEligibleActor;
        }

        for offset in 1..=len {
            let raw = self.current_turn_index + offset;
            let index = raw % len;
            if self.is_eligible(index) {
                let new_round = raw >= len;
                self.current_turn_index = index;
                if new_round {
                    self.round_number += 1;
                }
                return TurnAdvance::Next { index, new_round };
            }
        }

        self.check_combat_state();
        TurnAdvance::NoEligibleActor
    }

    /// Re-evaluates the outcome.
    ///
    /// The player character escaping alive ends the encounter as Fled, and
    /// surrendering as a defeat. Otherwise: defeat if no player-team
    /// combatant is alive and active, victory if no enemy is. A concluded
    /// state is never overwritten.
    pub fn check_combat_state(&mut self) -> CombatState {
        if self.state.is_concluded() {
            return self.state;
        }

        let player_left_alive = self
            .iter()
            .find(|e| e.side == Side::Player && e.is_alive() && !e.is_active_in_combat)
            .map(|e| self.fled.contains(&e.id));
        let team_standing = self
            .iter()
            .any(|e| e.side.is_player_team() && e.can_act());
        let enemies_standing = self.iter().any(|e| e.side == Side::Enemy && e.can_act());

        if let Some(fled) = player_left_alive {
            self.state = if fled {
                CombatState::Fled
            } else {
                CombatState::PlayerDefeat
            };
        } else if !team_standing {
            self.state = CombatState::PlayerDefeat;
        } else if !enemies_standing {
            self.state = CombatState::PlayerVictory;
        }

        if self.state.is_concluded() {
            debug!(target: "combat::turn", state = %self.state, "combat concluded");
        }
        self.state
    }

    /// Action points currently held by an entity (0 when untracked).
    pub fn action_points(&self, id: &EntityId) -> u32 {
        self.ap_pool.get(id).copied().unwrap_or(0)
    }

    /// Restores AP at the start of an entity's turn, capped at the maximum.
    pub fn regenerate_ap(&mut self, id: &EntityId, config: &ApConfig) -> u32 {
        let entry = self.ap_pool.entry(id.clone()).or_insert(0);
        *entry = entry.saturating_add(config.regen_per_turn).min(config.max_ap);
        *entry
    }

    /// Spends AP; fails closed without mutation if insufficient.
    pub fn spend_ap(&mut self, id: &EntityId, amount: u32) -> bool {
        let available = self.action_points(id);
        if available < amount {
            return false;
        }
        self.ap_pool.insert(id.clone(), available - amount);
        true
    }
}
