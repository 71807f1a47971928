#![allow(dead_code)]

use combat_core::{
    Attribute, CombatEntity, CombatSession, EntityId, Side, StatSheet, StatsRegistry,
};
use combat_runtime::narration::{NarrationFailure, NarrationReply, NarrationRequest};
use combat_runtime::{CombatFlow, ProcessOutcome, TemplateNarrator, WaitReason};

pub fn hero() -> CombatEntity {
    CombatEntity::new("hero", "Aria", Side::Player).with_hp(30, 30)
}

/// STR 15: +2 to hit and damage.
pub fn hero_sheet() -> StatSheet {
    StatSheet::new(1).with_attribute(Attribute::Strength, 15)
}

pub fn goblin(id: &str, hp: u32) -> CombatEntity {
    CombatEntity::new(id, "Goblin", Side::Enemy).with_hp(hp, hp)
}

/// Aria against one goblin per entry of `goblin_hp`, ids `g1`, `g2`, ...
pub fn arena(goblin_hp: &[u32]) -> (CombatSession, StatsRegistry) {
    let mut entities = vec![hero()];
    let mut stats = StatsRegistry::new();
    stats.insert("hero".into(), hero_sheet());
    for (index, hp) in goblin_hp.iter().enumerate() {
        let id = format!("g{}", index + 1);
        stats.insert(EntityId::new(id.as_str()), StatSheet::new(1));
        entities.push(goblin(&id, *hp));
    }
    let session = CombatSession::prepare(1, entities).expect("valid roster");
    (session, stats)
}

/// Answers attempts through the keyword narrator, outcomes with nothing.
pub fn template(request: &NarrationRequest) -> Result<String, NarrationFailure> {
    match request {
        NarrationRequest::Attempt(attempt) => Ok(TemplateNarrator.answer(attempt)),
        NarrationRequest::Outcome(_) => Ok(String::new()),
    }
}

/// Acknowledges every queued display event.
pub fn show_all(flow: &mut CombatFlow) {
    if let Some(last) = flow.drain_display().last() {
        flow.on_display_idle(last.seq);
    }
}

/// Processes until the flow needs input or finishes, playing both the
/// display orchestrator and the narration worker synchronously.
pub fn drive(
    flow: &mut CombatFlow,
    mut answer: impl FnMut(&NarrationRequest) -> Result<String, NarrationFailure>,
) -> ProcessOutcome {
    for _ in 0..1_000 {
        match flow.process() {
            ProcessOutcome::Waiting(WaitReason::Display) => show_all(flow),
            ProcessOutcome::Waiting(WaitReason::Narration) => {
                for job in flow.take_narration_jobs() {
                    let result = answer(&job.request);
                    flow.on_narration_reply(NarrationReply {
                        ticket: job.ticket,
                        result,
                    });
                }
            }
            done => {
                show_all(flow);
                return done;
            }
        }
    }
    panic!("flow did not settle: {flow:?}");
}

/// Processes until the flow stops waiting on display.
pub fn settle_display(flow: &mut CombatFlow) -> ProcessOutcome {
    loop {
        match flow.process() {
            ProcessOutcome::Waiting(WaitReason::Display) => show_all(flow),
            other => return other,
        }
    }
}

pub fn hp(flow: &CombatFlow, id: &str) -> u32 {
    flow.session()
        .entity(&EntityId::new(id))
        .map(|e| e.hp.current)
        .unwrap_or_default()
}

pub fn has_line(flow: &CombatFlow, needle: &str) -> bool {
    flow.session()
        .combat_log
        .iter()
        .any(|entry| entry.content.contains(needle))
}
