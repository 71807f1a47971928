//! Translation between narrator output and combat actions.
//!
//! A narrator answers an attempt with a JSON object:
//!
//! ```json
//! {
//!   "narrative": "Aria lunges at the nearest goblin.",
//!   "requests": [
//!     { "action": "request_skill_check", "kind": "attack", "target": "Goblin 1" }
//!   ]
//! }
//! ```
//!
//! Models frequently wrap that object in prose or code fences, so parsing
//! falls back to the first balanced `{...}` block before giving up.
//! Individual requests that do not match a known shape are dropped rather
//! than failing the whole answer.

use serde_json::Value;
use tracing::{debug, warn};

use combat_core::{
    ActionType, CombatAction, CombatSession, DiceNotation, EntityId, StatusApplication,
};

use super::types::{
    AttemptNarration, ModeTransitionRequest, NarrationFailure, SkillCheckRequest,
    StateChangeRequest, StructuredRequest,
};

/// Parses a narrator's answer to an attempt.
pub fn parse_attempt(raw: &str) -> Result<AttemptNarration, NarrationFailure> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NarrationFailure::Adapter("narrator returned nothing".into()));
    }

    let (object, salvaged) = match serde_json::from_str::<Value>(trimmed) {
        Ok(value @ Value::Object(_)) => (value, false),
        _ => {
            let block = extract_json_block(trimmed).ok_or_else(|| {
                NarrationFailure::Adapter("narrator output holds no JSON object".into())
            })?;
            let value = serde_json::from_str::<Value>(block).map_err(|err| {
                NarrationFailure::Adapter(format!("salvaged block is not JSON: {err}"))
            })?;
            debug!(target: "combat::narration", "salvaged JSON block from narrator prose");
            (value, true)
        }
    };

    let narrative = object
        .get("narrative")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    let raw_requests = match object.get("requests") {
        Some(Value::Array(items)) => items.clone(),
        Some(single @ Value::Object(_)) => vec![single.clone()],
        _ => Vec::new(),
    };

    let mut requests = Vec::with_capacity(raw_requests.len());
    let mut dropped = 0;
    for value in raw_requests {
        match serde_json::from_value::<StructuredRequest>(value) {
            Ok(request) => requests.push(request),
            Err(err) => {
                dropped += 1;
                warn!(target: "combat::narration", error = %err, "dropping malformed request");
            }
        }
    }

    Ok(AttemptNarration {
        narrative,
        requests,
        salvaged,
        dropped,
    })
}

/// Returns the first balanced `{...}` block of `text`.
///
/// Braces inside JSON string literals are ignored.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Resolves a combat name to an id.
///
/// Unknown names are kept verbatim so the handler can reject them with a
/// readable message.
fn resolve_name(session: &CombatSession, name: &str) -> EntityId {
    session
        .find_by_name(name)
        .cloned()
        .unwrap_or_else(|| EntityId::new(name.trim()))
}

/// Whether a request's optional actor field refers to someone else.
fn speaks_for_other(session: &CombatSession, actor: &EntityId, named: Option<&str>) -> bool {
    match named {
        Some(name) => session.find_by_name(name) != Some(actor),
        None => false,
    }
}

/// Turns narrator requests into actions for `actor`.
///
/// Requests naming a different performer are skipped: a narrator can only
/// act for the combatant whose turn it is.
pub fn to_actions(
    requests: &[StructuredRequest],
    session: &CombatSession,
    actor: &EntityId,
    weapon: Option<DiceNotation>,
) -> Vec<CombatAction> {
    let mut actions = Vec::with_capacity(requests.len());
    for request in requests {
        let action = match request {
            StructuredRequest::RequestSkillCheck(check) => {
                if speaks_for_other(session, actor, check.actor.as_deref()) {
                    warn!(target: "combat::narration", actor = ?check.actor, "request for another combatant skipped");
                    continue;
                }
                skill_check(check, session, actor, weapon)
            }
            StructuredRequest::RequestStateChange(change) => {
                if speaks_for_other(session, actor, change.actor.as_deref()) {
                    warn!(target: "combat::narration", actor = ?change.actor, "request for another combatant skipped");
                    continue;
                }
                state_change(change, session, actor)
            }
            StructuredRequest::RequestModeTransition(transition) => {
                if speaks_for_other(session, actor, transition.actor.as_deref()) {
                    warn!(target: "combat::narration", actor = ?transition.actor, "request for another combatant skipped");
                    continue;
                }
                match mode_transition(transition, session, actor) {
                    Some(action) => action,
                    None => {
                        warn!(target: "combat::narration", mode = %transition.mode, "unrecognized mode transition ignored");
                        continue;
                    }
                }
            }
        };
        actions.push(action);
    }
    actions
}

fn skill_check(
    check: &SkillCheckRequest,
    session: &CombatSession,
    actor: &EntityId,
    weapon: Option<DiceNotation>,
) -> CombatAction {
    let mut action = CombatAction::new(check.kind, actor.clone())
        .with_costs(check.cost_mp, check.cost_stamina);
    if let Some(target) = &check.target {
        action = action.with_target(resolve_name(session, target));
    }

    let dice = match check.kind {
        ActionType::Attack | ActionType::Skill => check.dice.or(weapon),
        _ => check.dice,
    };
    action.dice_notation = dice;

    let effects = &mut action.special_effects;
    effects.spell_id = check.spell.clone();
    effects.item_id = check.item.clone();
    effects.status = check.status.clone();
    effects.surrender_to = check.surrender_to.as_deref().map(|name| resolve_name(session, name));
    if let Some(mode) = check.roll_mode {
        effects.roll_mode = mode;
    }
    if let Some(skill) = &check.skill {
        effects.extra.insert("skill".into(), skill.clone());
    }
    action
}

fn state_change(change: &StateChangeRequest, session: &CombatSession, actor: &EntityId) -> CombatAction {
    let status = if change.remove {
        StatusApplication::remove(change.status.clone())
    } else {
        StatusApplication::add(change.status.clone(), change.duration)
    };
    let mut action = CombatAction::new(ActionType::Other, actor.clone()).with_status(status);
    if let Some(target) = &change.target {
        action = action.with_target(resolve_name(session, target));
    }
    action
}

fn mode_transition(
    transition: &ModeTransitionRequest,
    session: &CombatSession,
    actor: &EntityId,
) -> Option<CombatAction> {
    let action_type = match transition.mode.trim().to_ascii_lowercase().as_str() {
        "flee" | "escape" | "retreat" => ActionType::Flee,
        "surrender" | "yield" => ActionType::Surrender,
        _ => return None,
    };
    let mut action = CombatAction::new(action_type, actor.clone());
    if action_type == ActionType::Surrender {
        action.special_effects.surrender_to =
            transition.to.as_deref().map(|name| resolve_name(session, name));
    }
    if let Some(reason) = &transition.reason {
        action.special_effects.extra.insert("reason".into(), reason.clone());
    }
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use combat_core::{CombatEntity, RollMode, Side};

    fn session() -> CombatSession {
        CombatSession::prepare(
            1,
            vec![
                CombatEntity::new("hero", "Aria", Side::Player).with_hp(30, 30),
                CombatEntity::new("g1", "Goblin", Side::Enemy).with_hp(10, 10),
                CombatEntity::new("g2", "Goblin", Side::Enemy).with_hp(10, 10),
            ],
        )
        .unwrap()
    }

    #[test]
    fn parses_clean_output() {
        let raw = r#"{"narrative":"Aria swings.","requests":[{"action":"request_skill_check","kind":"attack","target":"Goblin 2","roll_mode":"advantage"}]}"#;
        let parsed = parse_attempt(raw).unwrap();
        assert_eq!(parsed.narrative, "Aria swings.");
        assert!(!parsed.salvaged);
        assert_eq!(parsed.requests.len(), 1);

        let actions = to_actions(
            &parsed.requests,
            &session(),
            &EntityId::new("hero"),
            Some(DiceNotation::new(1, 6, 0)),
        );
        assert_eq!(actions[0].action_type, ActionType::Attack);
        assert_eq!(actions[0].targets, vec![EntityId::new("g2")]);
        assert_eq!(actions[0].dice_notation, Some(DiceNotation::new(1, 6, 0)));
        assert_eq!(actions[0].special_effects.roll_mode, RollMode::Advantage);
    }

    #[test]
    fn salvages_block_wrapped_in_prose() {
        let raw = "Sure! Here you go:\n```json\n{\"narrative\": \"A {curly} grin.\", \"requests\": []}\n```\nAnything else?";
        let parsed = parse_attempt(raw).unwrap();
        assert!(parsed.salvaged);
        assert_eq!(parsed.narrative, "A {curly} grin.");
        assert!(parsed.requests.is_empty());
    }

    #[test]
    fn prose_without_json_is_a_failure() {
        assert!(matches!(
            parse_attempt("The goblin hesitates."),
            Err(NarrationFailure::Adapter(_))
        ));
        assert!(parse_attempt("   ").is_err());
    }

    #[test]
    fn unknown_requests_are_dropped_individually() {
        let raw = r#"{"narrative":"","requests":[{"action":"dance"},{"action":"request_mode_transition","mode":"flee"}]}"#;
        let parsed = parse_attempt(raw).unwrap();
        assert_eq!(parsed.dropped, 1);
        assert_eq!(parsed.requests.len(), 1);
    }

    #[test]
    fn block_extraction_respects_escaped_quotes() {
        let text = r#"noise {"a": "quote \" and } brace", "b": {"c": 1}} trailing }"#;
        assert_eq!(
            extract_json_block(text),
            Some(r#"{"a": "quote \" and } brace", "b": {"c": 1}}"#)
        );
        assert_eq!(extract_json_block("{ never closed"), None);
    }

    #[test]
    fn requests_for_other_combatants_are_skipped() {
        let requests = vec![
            StructuredRequest::RequestSkillCheck(SkillCheckRequest {
                actor: Some("Goblin 1".into()),
                ..SkillCheckRequest::new(ActionType::Attack)
            }),
            StructuredRequest::RequestSkillCheck(SkillCheckRequest::new(ActionType::Defend)),
        ];
        let actions = to_actions(&requests, &session(), &EntityId::new("hero"), None);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type, ActionType::Defend);
    }

    #[test]
    fn mode_transitions_map_to_escape_actions() {
        let requests = vec![
            StructuredRequest::RequestModeTransition(ModeTransitionRequest {
                actor: None,
                mode: "Surrender".into(),
                to: Some("goblin 1".into()),
                reason: None,
            }),
            StructuredRequest::RequestModeTransition(ModeTransitionRequest {
                actor: None,
                mode: "exploration".into(),
                to: None,
                reason: None,
            }),
        ];
        let actions = to_actions(&requests, &session(), &EntityId::new("hero"), None);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type, ActionType::Surrender);
        assert_eq!(actions[0].special_effects.surrender_to, Some(EntityId::new("g1")));
    }

    #[test]
    fn state_change_becomes_status_action() {
        let requests = vec![StructuredRequest::RequestStateChange(StateChangeRequest {
            actor: None,
            target: Some("Goblin 2".into()),
            status: "Blinded".into(),
            duration: Some(2),
            remove: false,
        })];
        let actions = to_actions(&requests, &session(), &EntityId::new("hero"), None);
        assert_eq!(actions[0].action_type, ActionType::Other);
        assert_eq!(actions[0].targets, vec![EntityId::new("g2")]);
        assert_eq!(
            actions[0].special_effects.status,
            Some(StatusApplication::add("Blinded", Some(2)))
        );
    }
}
