//! Loot tables rolled for defeated enemies.

use combat_core::{DiceNotation, DiceRoller, LootGrant};

/// One possible drop.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LootEntry {
    /// Item id in the item catalog.
    pub item: String,
    /// Drop chance in percent; 100 or more always drops.
    pub chance: u32,
    /// Quantity dice; a single item when absent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub quantity: Option<DiceNotation>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LootTable {
    pub id: String,
    pub entries: Vec<LootEntry>,
}

impl LootTable {
    /// Rolls every entry once, in table order.
    ///
    /// Entries are tested with a d100 (`roll <= chance`), then their quantity
    /// dice are rolled. Zero quantities are dropped from the result.
    pub fn roll(&self, source_name: &str, dice: &mut dyn DiceRoller) -> Vec<LootGrant> {
        let mut grants = Vec::new();
        for entry in &self.entries {
            if entry.chance == 0 {
                continue;
            }
            if entry.chance < 100 && dice.roll_d100() > entry.chance {
                continue;
            }
            let quantity = match entry.quantity {
                Some(notation) => notation.roll(dice).max(0) as u32,
                None => 1,
            };
            if quantity == 0 {
                continue;
            }
            grants.push(LootGrant {
                item: entry.item.clone(),
                quantity,
                source_name: source_name.to_string(),
            });
        }
        tracing::debug!(
            target: "combat::loot",
            table = %self.id,
            source = source_name,
            drops = grants.len(),
            "rolled loot table"
        );
        grants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combat_core::ScriptedDice;

    fn table() -> LootTable {
        LootTable {
            id: "goblin".into(),
            entries: vec![
                LootEntry {
                    item: "copper_coin".into(),
                    chance: 100,
                    quantity: Some(DiceNotation::new(1, 6, 0)),
                },
                LootEntry {
                    item: "rusty_dagger".into(),
                    chance: 25,
                    quantity: None,
                },
                LootEntry {
                    item: "healing_potion".into(),
                    chance: 10,
                    quantity: None,
                },
            ],
        }
    }

    #[test]
    fn guaranteed_entry_skips_chance_roll() {
        // Coins: quantity 4. Dagger: d100 = 25 drops. Potion: d100 = 11 misses.
        let mut dice = ScriptedDice::new([4, 25, 11]);
        let grants = table().roll("Goblin 1", &mut dice);

        assert_eq!(
            grants,
            vec![
                LootGrant {
                    item: "copper_coin".into(),
                    quantity: 4,
                    source_name: "Goblin 1".into(),
                },
                LootGrant {
                    item: "rusty_dagger".into(),
                    quantity: 1,
                    source_name: "Goblin 1".into(),
                },
            ]
        );
        assert_eq!(dice.remaining(), 0);
    }

    #[test]
    fn zero_chance_never_rolls() {
        let table = LootTable {
            id: "empty".into(),
            entries: vec![LootEntry {
                item: "copper_coin".into(),
                chance: 0,
                quantity: None,
            }],
        };
        let mut dice = ScriptedDice::new([1]);
        assert!(table.roll("Rat", &mut dice).is_empty());
        assert_eq!(dice.remaining(), 1);
    }
}
