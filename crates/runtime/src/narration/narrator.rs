//! Narrator collaborator trait and the offline implementations.

use std::collections::VecDeque;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use combat_core::{ActionOutcome, ActionType, Side};

use super::types::{
    AttemptRequest, EncounterContext, ModeTransitionRequest, NarrationRequest, OutcomeRequest,
    SkillCheckRequest, StructuredRequest,
};

#[derive(Debug, Clone, Error)]
pub enum NarratorError {
    #[error("narrator backend unavailable: {0}")]
    Unavailable(String),

    #[error("narrator request failed: {0}")]
    Request(String),
}

/// Source of narrative text and structured requests.
///
/// Implementations talk to a language model or any other text source. They
/// are called from the narration worker, never from the flow itself.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Returns the raw answer to an attempt (see [`super::parse_attempt`]).
    async fn narrate_attempt(&self, request: &AttemptRequest) -> Result<String, NarratorError>;

    /// Describes a resolved action. Purely descriptive; an empty string
    /// means nothing to add.
    async fn narrate_outcome(&self, request: &OutcomeRequest) -> Result<String, NarratorError>;
}

/// One canned narrator answer.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Fail(String),
    /// Never answers; exercises the worker timeout.
    Hang,
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    async fn deliver(self) -> Result<String, NarratorError> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Fail(reason) => Err(NarratorError::Request(reason)),
            Self::Hang => std::future::pending().await,
        }
    }
}

/// Replays queued answers and records every request it receives.
///
/// An exhausted attempt queue fails the call; an exhausted outcome queue
/// answers with nothing.
#[derive(Debug, Default)]
pub struct ScriptedNarrator {
    attempts: Mutex<VecDeque<ScriptedReply>>,
    outcomes: Mutex<VecDeque<ScriptedReply>>,
    seen: Mutex<Vec<NarrationRequest>>,
}

impl ScriptedNarrator {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_attempts(mut self, replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        self.attempts.get_mut().extend(replies);
        self
    }

    #[must_use]
    pub fn with_outcomes(mut self, replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        self.outcomes.get_mut().extend(replies);
        self
    }

    pub async fn push_attempt(&self, reply: ScriptedReply) {
        self.attempts.lock().await.push_back(reply);
    }

    /// Requests received so far, in call order.
    pub async fn seen(&self) -> Vec<NarrationRequest> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl Narrator for ScriptedNarrator {
    async fn narrate_attempt(&self, request: &AttemptRequest) -> Result<String, NarratorError> {
        self.seen
            .lock()
            .await
            .push(NarrationRequest::Attempt(request.clone()));
        let reply = self.attempts.lock().await.pop_front();
        match reply {
            Some(reply) => reply.deliver().await,
            None => Err(NarratorError::Unavailable("script exhausted".into())),
        }
    }

    async fn narrate_outcome(&self, request: &OutcomeRequest) -> Result<String, NarratorError> {
        self.seen
            .lock()
            .await
            .push(NarrationRequest::Outcome(request.clone()));
        let reply = self.outcomes.lock().await.pop_front();
        match reply {
            Some(reply) => reply.deliver().await,
            None => Ok(String::new()),
        }
    }
}

#[derive(Serialize)]
struct Answer {
    narrative: String,
    requests: Vec<StructuredRequest>,
}

/// Keyword-driven narrator for running without a language model.
///
/// Understands "flee", "surrender", "defend", "wait", "cast <spell> on
/// <target>", "use <item> on <target>" and otherwise attacks the named (or
/// first standing) opponent.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateNarrator;

impl TemplateNarrator {
    /// Builds the JSON answer for an intent.
    pub fn answer(&self, request: &AttemptRequest) -> String {
        let intent = request.intent.trim().to_ascii_lowercase();
        let actor = &request.actor;
        let context = &request.context;
        let has = |words: &[&str]| words.iter().any(|w| intent.contains(w));

        let (narrative, requests) = if has(&["ponder", "hesitate", "think"]) {
            (format!("{actor} hesitates, weighing the options."), Vec::new())
        } else if has(&["flee", "run away", "escape", "retreat"]) {
            (
                format!("{actor} looks for a way out."),
                vec![StructuredRequest::RequestModeTransition(ModeTransitionRequest {
                    actor: None,
                    mode: "flee".into(),
                    to: None,
                    reason: None,
                })],
            )
        } else if has(&["surrender", "yield"]) {
            (
                format!("{actor} lowers their weapon."),
                vec![StructuredRequest::RequestModeTransition(ModeTransitionRequest {
                    actor: None,
                    mode: "surrender".into(),
                    to: named_participant(context, &intent, actor),
                    reason: None,
                })],
            )
        } else if has(&["defend", "guard", "block"]) {
            (
                format!("{actor} braces for the next blow."),
                vec![check(ActionType::Defend, None)],
            )
        } else if has(&["wait"]) {
            (format!("{actor} holds position."), vec![check(ActionType::Wait, None)])
        } else if let Some(rest) = after_word(&intent, "cast") {
            let (spell, target) = split_on_target(rest);
            let mut request = SkillCheckRequest::new(ActionType::Spell);
            request.spell = Some(spell.to_string());
            request.target = target.and_then(|t| named_participant(context, t, ""));
            (
                format!("{actor} begins an incantation."),
                vec![StructuredRequest::RequestSkillCheck(request)],
            )
        } else if let Some(rest) = after_word(&intent, "use") {
            let (item, target) = split_on_target(rest);
            let mut request = SkillCheckRequest::new(ActionType::Item);
            request.item = Some(item.to_string());
            request.target = target.and_then(|t| named_participant(context, t, ""));
            (
                format!("{actor} reaches for their pack."),
                vec![StructuredRequest::RequestSkillCheck(request)],
            )
        } else {
            let target = named_participant(context, &intent, actor)
                .or_else(|| first_opponent(context, actor));
            let line = match &target {
                Some(target) => format!("{actor} attacks {target}."),
                None => format!("{actor} attacks."),
            };
            (line, vec![check(ActionType::Attack, target)])
        };

        let answer = Answer {
            narrative,
            requests,
        };
        serde_json::to_string(&answer).unwrap_or_default()
    }
}

fn check(kind: ActionType, target: Option<String>) -> StructuredRequest {
    let mut request = SkillCheckRequest::new(kind);
    request.target = target;
    StructuredRequest::RequestSkillCheck(request)
}

/// Text following `word` when it appears as a whole word.
fn after_word<'a>(intent: &'a str, word: &str) -> Option<&'a str> {
    let mut offset = 0;
    for token in intent.split(' ') {
        if token == word {
            let rest = intent[offset + token.len()..].trim();
            return (!rest.is_empty()).then_some(rest);
        }
        offset += token.len() + 1;
    }
    None
}

fn split_on_target(rest: &str) -> (&str, Option<&str>) {
    match rest.split_once(" on ") {
        Some((what, target)) => (what.trim(), Some(target.trim())),
        None => (rest, None),
    }
}

/// Longest participant name mentioned in `text`, other than `exclude`.
fn named_participant(context: &EncounterContext, text: &str, exclude: &str) -> Option<String> {
    let text = text.to_ascii_lowercase();
    context
        .participants
        .iter()
        .filter(|p| p.alive && p.active && !p.name.eq_ignore_ascii_case(exclude))
        .filter(|p| text.contains(&p.name.to_ascii_lowercase()))
        .max_by_key(|p| p.name.len())
        .map(|p| p.name.clone())
}

fn first_opponent(context: &EncounterContext, actor: &str) -> Option<String> {
    let side = context.participant(actor).map(|p| p.side).unwrap_or(Side::Player);
    context
        .participants
        .iter()
        .find(|p| p.alive && p.active && p.side.opposes(side))
        .map(|p| p.name.clone())
}

#[async_trait]
impl Narrator for TemplateNarrator {
    async fn narrate_attempt(&self, request: &AttemptRequest) -> Result<String, NarratorError> {
        Ok(self.answer(request))
    }

    async fn narrate_outcome(&self, request: &OutcomeRequest) -> Result<String, NarratorError> {
        let text = match &request.result.outcome {
            ActionOutcome::Attack(attack) if attack.roll.critical => {
                format!("A devastating blow lands on {}.", attack.target_name)
            }
            ActionOutcome::Attack(attack) if attack.roll.fumble => {
                "The swing goes wide, badly off balance.".to_string()
            }
            ActionOutcome::Spell(spell) if spell.target_defeated => {
                format!("{} collapses under the spell.", spell.target_name)
            }
            _ => String::new(),
        };
        Ok(text)
    }
}
