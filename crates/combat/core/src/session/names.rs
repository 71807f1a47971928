use std::collections::BTreeMap;

use crate::entity::CombatEntity;

/// Gives every combatant a name unique within the encounter.
///
/// Names shared by several combatants are numbered in insertion order
/// ("Goblin 1", "Goblin 2"); unique names are kept as is.
pub fn assign_combat_names(entities: &mut [CombatEntity]) {
    let mut totals: BTreeMap<String, usize> = BTreeMap::new();
    for entity in entities.iter() {
        *totals.entry(entity.name.to_lowercase()).or_default() += 1;
    }

    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    for entity in entities.iter_mut() {
        let key = entity.name.to_lowercase();
        if totals.get(&key).copied().unwrap_or(0) > 1 {
            let counter = seen.entry(key).or_default();
            *counter += 1;
            entity.combat_name = format!("{} {}", entity.name, counter);
        } else {
            entity.combat_name = entity.name.clone();
        }
    }
}
