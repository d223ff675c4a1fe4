//! Turn-flow tests driven through the scripted transport.
//!
//! No network access: every model reply is queued up front.
//! Run with: `cargo test -p janus-core --test turn_flow`

use janus_core::engine::IDLE_ACTION;
use janus_core::narrator::ConnectivityError;
use janus_core::testing::{assert_depth, assert_has_artifact, expect_narrated, TestHarness};
use janus_core::{PsychProfile, ScriptedReply, StateStore, TurnOutcome, WorldState};
use tempfile::TempDir;

// =============================================================================
// EXIT AND IDLE INPUT
// =============================================================================

#[tokio::test]
async fn test_exit_saves_without_calling_model() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("world.json");
    let mut harness = TestHarness::new(&path);

    for word in ["exit", "QUIT", " Save ", "выход", "Сохранить"] {
        assert_eq!(harness.input(word).await, TurnOutcome::Terminate, "{word}");
    }

    assert_eq!(harness.transport.call_count(), 0);
    assert!(path.exists(), "exit should write the state file");
    assert_eq!(StateStore::new(&path).load().await, WorldState::new());
}

#[tokio::test]
async fn test_blank_input_is_idle_action() {
    let dir = TempDir::new().unwrap();
    let mut harness = TestHarness::new(dir.path().join("world.json"));
    harness.expect_narrative("Time passes.").expect_narrative("More time passes.");

    harness.input("").await;
    let blank_prompt = harness.last_prompt().unwrap();
    harness.input("   ").await;

    assert!(blank_prompt.contains(&format!("Action: \"{IDLE_ACTION}\"")));
    assert!(harness.last_prompt().unwrap().contains(&format!("Action: \"{IDLE_ACTION}\"")));
    assert_depth(&harness, 3);
}

// =============================================================================
// PROGRESSION
// =============================================================================

#[tokio::test]
async fn test_successful_turn_advances_world() {
    let dir = TempDir::new().unwrap();
    let mut harness = TestHarness::new(dir.path().join("world.json"));
    harness.expect_narrative("The hallway stretches.");

    let payload = expect_narrated(harness.input("I walk forward").await);

    assert_eq!(payload.depth, 2);
    assert!((payload.entropy - 0.15).abs() < 1e-9);
    assert_depth(&harness, 2);
    assert_eq!(harness.world().last_context, "The hallway stretches.");
}

#[tokio::test]
async fn test_entropy_tracks_depth_over_many_turns() {
    let dir = TempDir::new().unwrap();
    let mut harness = TestHarness::new(dir.path().join("world.json"));

    for turn in 0..20 {
        harness.expect_narrative(&format!("Beat {turn}"));
        expect_narrated(harness.input("wait").await);
    }

    assert_depth(&harness, 21);
    // Entropy is not capped.
    assert!(harness.world().entropy > 1.0);
}

#[tokio::test]
async fn test_artifact_found_at_depth_three() {
    let dir = TempDir::new().unwrap();
    let mut world = WorldState::new();
    world.depth = 3;
    world.entropy = 0.2;
    let mut harness = TestHarness::with_world(dir.path().join("world.json"), world);
    harness.expect_reply(ScriptedReply::Text(
        r#"{"narrative": "Something glints in the ash.", "choices": ["Take it"],
            "visual_clue": "🗝️", "artifact_found": "Bone Key"}"#
            .to_string(),
    ));

    let payload = expect_narrated(harness.input("I dig through the ash").await);

    assert_eq!(payload.artifact_found.as_deref(), Some("Bone Key"));
    assert_has_artifact(&harness, "Bone Key");
    assert_eq!(harness.world().depth, 4);
    assert!((harness.world().entropy - 0.25).abs() < 1e-9);
}

#[tokio::test]
async fn test_inventory_reaches_next_prompt() {
    let dir = TempDir::new().unwrap();
    let mut harness = TestHarness::new(dir.path().join("world.json"));
    harness
        .expect_reply(ScriptedReply::Text(
            r#"{"narrative": "A lantern.", "artifact_found": {"name": "Lantern", "ability": "burns cold"}}"#
                .to_string(),
        ))
        .expect_narrative("It lights nothing.");

    harness.input("take it").await;
    harness.input("light the lantern").await;

    let prompt = harness.last_prompt().unwrap();
    assert!(prompt.contains("Inventory: Lantern (burns cold)"));
    assert!(prompt.contains("Previous Context: A lantern."));
    assert!(prompt.contains("Depth: 2\n"));
}

// =============================================================================
// DISPOSITION
// =============================================================================

#[tokio::test]
async fn test_russian_fear_sets_anxious() {
    let dir = TempDir::new().unwrap();
    let mut harness = TestHarness::new(dir.path().join("world.json"));
    harness.expect_narrative("Тени сгущаются.");

    let payload = expect_narrated(harness.input("Я боюсь, здесь темно").await);

    assert_eq!(payload.psych_profile, PsychProfile::Anxious);
    assert_eq!(harness.world().action_history.anxious, 1);
    assert!(harness
        .last_prompt()
        .unwrap()
        .contains("Psych Profile: Anxious/Cautious"));
}

#[tokio::test]
async fn test_dominant_trait_accumulates() {
    let dir = TempDir::new().unwrap();
    let mut harness = TestHarness::new(dir.path().join("world.json"));
    for _ in 0..3 {
        harness.expect_narrative("The wall cracks.");
    }

    harness.input("I smash the wall").await;
    harness.input("I punch it again").await;
    harness.input("I hide behind the rubble").await;

    let world = harness.world();
    assert_eq!(world.action_history.aggressive, 2);
    assert_eq!(world.action_history.anxious, 1);
    assert_eq!(world.action_history.dominant(), Some(PsychProfile::Aggressive));
    assert_eq!(world.psych_profile, PsychProfile::Anxious);
    assert!(harness
        .last_prompt()
        .unwrap()
        .contains("Dominant Trait: Aggressive/Dominant (2 turns)"));
}

// =============================================================================
// FAILURE
// =============================================================================

#[tokio::test]
async fn test_failed_turn_leaves_world_unchanged() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("world.json");
    let mut harness = TestHarness::new(&path);
    harness.expect_narrative("First light.");
    harness.input("look").await;
    let before = harness.world().clone();
    let saved_before = std::fs::read_to_string(&path).unwrap();

    harness.expect_outage();
    let outcome = harness.input("I attack the door").await;

    assert_eq!(
        outcome,
        TurnOutcome::Failed(ConnectivityError::AllModelsExhausted { attempts: 3 })
    );
    assert_eq!(*harness.world(), before);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), saved_before);

    // The player can simply try again.
    harness.expect_narrative("The door gives way.");
    expect_narrated(harness.input("I attack the door").await);
    assert_depth(&harness, 3);
    assert_eq!(harness.world().psych_profile, PsychProfile::Aggressive);
}

#[tokio::test]
async fn test_fallback_recovers_within_turn() {
    let dir = TempDir::new().unwrap();
    let mut harness = TestHarness::new(dir.path().join("world.json"));
    harness
        .expect_reply(ScriptedReply::Timeout)
        .expect_reply(ScriptedReply::Text("not json at all".to_string()))
        .expect_narrative("Third model answers.");

    let payload = expect_narrated(harness.input("wait").await);

    assert_eq!(payload.narrative, "Third model answers.");
    let models: Vec<_> = harness.transport.calls().into_iter().map(|c| c.model).collect();
    assert_eq!(models, vec!["model-a", "model-b", "model-c"]);
}

#[tokio::test]
async fn test_no_credentials_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut harness = TestHarness::with_credentials(dir.path().join("world.json"), &[]);

    let outcome = harness.input("hello").await;

    let TurnOutcome::Failed(err) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(err.is_fatal());
    assert_eq!(harness.transport.call_count(), 0);
    assert_depth(&harness, 1);
}
