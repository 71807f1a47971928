mod common;

use combat_core::{CombatAction, CombatStep, DiceNotation, ScriptedDice};
use combat_runtime::narration::NarrationRequest;
use combat_runtime::{
    CombatFlow, ProcessOutcome, WaitReason, load_session, read_from_path, save_session,
    write_to_path,
};

use common::{arena, drive, has_line, hp, settle_display, template};

#[test]
fn save_text_restores_the_same_session() {
    let (session, stats) = arena(&[20, 20]);
    let mut flow = CombatFlow::builder(session)
        .stats(stats)
        .seed(11)
        .build()
        .unwrap();
    drive(&mut flow, template);

    let saved = save_session(&flow).unwrap();
    let record = load_session(&saved).unwrap();
    assert_eq!(record, flow.session().to_record());
    assert!(load_session("{ not a save").is_err());
}

#[test]
fn restored_flow_resumes_at_player_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("saves").join("encounter.json");

    let (session, stats) = arena(&[20]);
    let mut flow = CombatFlow::builder(session)
        .stats(stats)
        .dice(ScriptedDice::new([20, 1]))
        .build()
        .unwrap();
    assert_eq!(drive(&mut flow, template), ProcessOutcome::AwaitingInput);
    write_to_path(&flow, &path).unwrap();
    drop(flow);

    let record = read_from_path(&path).unwrap();
    let (_, stats) = arena(&[20]);
    let mut restored = CombatFlow::restore(record)
        .unwrap()
        .stats(stats)
        .dice(ScriptedDice::new([18, 6]))
        .build()
        .unwrap();
    assert_eq!(restored.current_step(), CombatStep::AwaitingPlayerInput);
    assert!(has_line(&restored, "Aria, what do you do?"));

    let sword = CombatAction::attack("hero".into(), "g1".into(), DiceNotation::new(1, 6, 0));
    assert!(restored.submit_player_action(sword));
    drive(&mut restored, template);
    assert_eq!(hp(&restored, "g1"), 12);
}

#[test]
fn interrupted_narration_is_requested_again() {
    let (session, stats) = arena(&[20]);
    let mut flow = CombatFlow::builder(session)
        .stats(stats)
        .dice(ScriptedDice::new([20, 1]))
        .build()
        .unwrap();
    drive(&mut flow, template);
    flow.submit_player_input("I stab the Goblin");
    assert_eq!(
        settle_display(&mut flow),
        ProcessOutcome::Waiting(WaitReason::Narration)
    );
    // The reply never arrives before the save.
    let saved = save_session(&flow).unwrap();
    drop(flow);

    let (_, stats) = arena(&[20]);
    let mut restored = CombatFlow::restore(load_session(&saved).unwrap())
        .unwrap()
        .stats(stats)
        .dice(ScriptedDice::new([18, 4]))
        .build()
        .unwrap();
    assert_eq!(restored.current_step(), CombatStep::ProcessingPlayerAction);
    assert_eq!(
        restored.process(),
        ProcessOutcome::Waiting(WaitReason::Narration)
    );
    let jobs = restored.take_narration_jobs();
    assert_eq!(jobs.len(), 1);
    let NarrationRequest::Attempt(attempt) = &jobs[0].request else {
        panic!("expected an attempt request");
    };
    assert_eq!(attempt.intent, "I stab the Goblin");

    restored.on_narration_reply(combat_runtime::narration::NarrationReply {
        ticket: jobs[0].ticket,
        result: template(&jobs[0].request),
    });
    drive(&mut restored, template);
    assert_eq!(hp(&restored, "g1"), 14);
}
