use std::sync::Arc;
use std::time::Duration;

use combat_core::{
    Attribute, CombatEntity, CombatSession, CombatState, DisplayEventKind, Side, StatSheet,
    StatsRegistry,
};
use combat_runtime::{
    CombatEvent, CombatFlow, EncounterHost, RecordingBackend, RuntimeConfig, ScriptedNarrator,
    ScriptedReply, TemplateNarrator, Topic,
};

fn duel(goblin_hp: u32) -> (CombatSession, StatsRegistry) {
    let session = CombatSession::prepare(
        3,
        vec![
            CombatEntity::new("hero", "Aria", Side::Player).with_hp(100, 100),
            CombatEntity::new("g1", "Goblin", Side::Enemy).with_hp(goblin_hp, goblin_hp),
        ],
    )
    .unwrap();
    let mut stats = StatsRegistry::new();
    stats.insert("hero".into(), StatSheet::new(3).with_attribute(Attribute::Strength, 18));
    stats.insert("g1".into(), StatSheet::new(1));
    (session, stats)
}

fn seeded() -> RuntimeConfig {
    RuntimeConfig {
        seed: Some(5),
        ..RuntimeConfig::default()
    }
}

#[tokio::test]
async fn hosted_encounter_runs_to_victory() {
    let config = seeded();
    let (session, stats) = duel(1);
    let flow = CombatFlow::builder(session)
        .stats(stats)
        .runtime_config(&config)
        .build()
        .unwrap();
    let (host, handle) = EncounterHost::new(
        flow,
        Arc::new(TemplateNarrator),
        RecordingBackend::new(),
        &config,
    );
    let mut lifecycle = handle.subscribe(Topic::Encounter);

    let player = handle.clone();
    let typist = tokio::spawn(async move {
        while player.say("I attack the Goblin").await.is_ok() {}
    });

    let outcome = tokio::time::timeout(Duration::from_secs(10), host.run())
        .await
        .expect("encounter should finish")
        .unwrap();
    typist.await.unwrap();

    assert_eq!(outcome.summary.state, CombatState::PlayerVictory);
    assert_eq!(outcome.summary.fatal_error, None);
    assert!(outcome.flow.is_finished());

    let lines = outcome.backend.lines();
    assert!(lines.contains(&"I attack the Goblin"));
    assert_eq!(lines.last(), Some(&"Victory! No enemy is left standing."));
    // Bars are committed through the non-visual half of each change.
    assert!(outcome
        .backend
        .applied
        .iter()
        .all(|e| matches!(e.kind, DisplayEventKind::ResourceFinalize { .. })));
    assert!(!outcome.backend.applied.is_empty());

    let mut events = Vec::new();
    while let Ok(event) = lifecycle.try_recv() {
        events.push(event);
    }
    assert!(matches!(events.first(), Some(CombatEvent::Started { encounter_id: 3, .. })));
    assert!(matches!(
        events.last(),
        Some(CombatEvent::Ended {
            state: CombatState::PlayerVictory,
            ..
        })
    ));
}

#[tokio::test]
async fn hanging_narrator_times_out_into_the_fallback() {
    let mut config = seeded();
    config.narration.timeout = Duration::from_millis(20);
    config.narration.narrate_outcomes = false;
    let (session, stats) = duel(1);
    let flow = CombatFlow::builder(session)
        .stats(stats)
        .runtime_config(&config)
        .build()
        .unwrap();
    let narrator = ScriptedNarrator::new().with_attempts(std::iter::repeat_n(ScriptedReply::Hang, 64));
    let (host, handle) =
        EncounterHost::new(flow, Arc::new(narrator), RecordingBackend::new(), &config);

    let player = handle.clone();
    let typist = tokio::spawn(async move {
        while player.say("something unexpected").await.is_ok() {}
    });

    let outcome = tokio::time::timeout(Duration::from_secs(10), host.run())
        .await
        .expect("encounter should finish")
        .unwrap();
    typist.await.unwrap();

    assert_eq!(outcome.summary.state, CombatState::PlayerVictory);
    assert!(outcome
        .backend
        .lines()
        .contains(&"Aria hesitates, then lashes out on instinct."));
}
