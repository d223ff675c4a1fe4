//! Testing utilities for the turn engine.
//!
//! This module provides tools for integration testing:
//! - `ScriptedTransport` for deterministic narration without API calls
//! - `TestHarness` for scripted play sessions
//! - Assertion helpers for verifying world state

use crate::engine::{TurnEngine, TurnOutcome};
use crate::narrator::{AttemptPolicy, Narrator, Transport};
use crate::persist::StateStore;
use crate::world::WorldState;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Models used by [`TestHarness`], in fallback order.
pub const TEST_MODELS: &[&str] = &["model-a", "model-b", "model-c"];

/// One scripted reply from the transport.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Raw candidate text, as the model would return it.
    Text(String),
    /// An HTTP error status.
    Status(u16),
    /// A connection-level failure.
    Network(String),
    /// The request outlived its timeout.
    Timeout,
}

/// A request the transport received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportCall {
    pub credential: String,
    pub model: String,
    pub prompt: String,
}

/// A transport that answers from a queue of scripted replies.
///
/// Clones share the queue and the call log, so a test can keep one handle
/// while the narrator owns another. When the queue runs dry every request
/// fails with a network error.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    calls: Arc<Mutex<Vec<TransportCall>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply.
    pub fn push(&self, reply: ScriptedReply) {
        lock(&self.replies).push_back(reply);
    }

    /// Every request received so far, oldest first.
    pub fn calls(&self) -> Vec<TransportCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Replies still queued.
    pub fn pending(&self) -> usize {
        lock(&self.replies).len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        credential: &str,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, gemini::Error> {
        lock(&self.calls).push(TransportCall {
            credential: credential.to_string(),
            model: model.to_string(),
            prompt: prompt.to_string(),
        });

        match lock(&self.replies).pop_front() {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Status(status)) => Err(gemini::Error::Api {
                status,
                message: "scripted failure".to_string(),
            }),
            Some(ScriptedReply::Network(message)) => Err(gemini::Error::Network(message)),
            Some(ScriptedReply::Timeout) => Err(gemini::Error::Timeout(timeout)),
            None => Err(gemini::Error::Network("no scripted reply left".to_string())),
        }
    }
}

// A panicking test poisons the lock; later readers still want the data.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A minimal well-formed reply carrying `narrative`.
pub fn narrative_json(narrative: &str) -> String {
    serde_json::json!({
        "narrative": narrative,
        "choices": ["Go on", "Turn back"],
        "visual_clue": "🕯️",
    })
    .to_string()
}

/// Test harness for running scripted sessions.
pub struct TestHarness {
    /// The engine under test.
    pub engine: TurnEngine<ScriptedTransport>,
    /// Shared handle on the engine's transport.
    pub transport: ScriptedTransport,
}

impl TestHarness {
    /// Create a harness with a fresh world that saves to `state_path`.
    pub fn new(state_path: impl Into<PathBuf>) -> Self {
        Self::with_world(state_path, WorldState::new())
    }

    /// Create a harness around an existing world.
    pub fn with_world(state_path: impl Into<PathBuf>, world: WorldState) -> Self {
        Self::build(state_path.into(), world, vec!["test-key".to_string()])
    }

    /// Create a harness with a specific credential pool.
    pub fn with_credentials(state_path: impl Into<PathBuf>, credentials: &[&str]) -> Self {
        let credentials = credentials.iter().map(|c| c.to_string()).collect();
        Self::build(state_path.into(), WorldState::new(), credentials)
    }

    /// Create a harness that loads its world from `state_path`.
    pub async fn resume(state_path: impl Into<PathBuf>) -> Self {
        let transport = ScriptedTransport::new();
        let narrator = Self::narrator(&transport, vec!["test-key".to_string()]);
        let engine = TurnEngine::start(narrator, StateStore::new(state_path)).await;
        Self { engine, transport }
    }

    fn build(state_path: PathBuf, world: WorldState, credentials: Vec<String>) -> Self {
        let transport = ScriptedTransport::new();
        let narrator = Self::narrator(&transport, credentials);
        let engine = TurnEngine::with_world(narrator, StateStore::new(state_path), world);
        Self { engine, transport }
    }

    fn narrator(transport: &ScriptedTransport, credentials: Vec<String>) -> Narrator<ScriptedTransport> {
        let policy = AttemptPolicy::new(TEST_MODELS.iter().copied())
            .with_timeout(Duration::from_secs(5));
        Narrator::new(transport.clone(), credentials, policy).with_seed(7)
    }

    /// Queue a well-formed narrative reply.
    pub fn expect_narrative(&mut self, text: &str) -> &mut Self {
        self.transport.push(ScriptedReply::Text(narrative_json(text)));
        self
    }

    /// Queue an arbitrary reply.
    pub fn expect_reply(&mut self, reply: ScriptedReply) -> &mut Self {
        self.transport.push(reply);
        self
    }

    /// Queue one failure per model so the next turn fails.
    pub fn expect_outage(&mut self) -> &mut Self {
        for _ in TEST_MODELS {
            self.transport.push(ScriptedReply::Status(503));
        }
        self
    }

    /// Send player input through the engine.
    pub async fn input(&mut self, text: &str) -> TurnOutcome {
        self.engine.process_turn(text).await
    }

    pub fn world(&self) -> &WorldState {
        self.engine.world()
    }

    /// The prompt sent with the most recent request.
    pub fn last_prompt(&self) -> Option<String> {
        self.transport.calls().pop().map(|call| call.prompt)
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert a world that started fresh is at `depth`, with exactly the entropy
/// that many steps produce.
#[track_caller]
pub fn assert_depth(harness: &TestHarness, depth: u32) {
    let world = harness.world();
    assert_eq!(world.depth, depth, "Expected depth {depth}, got {}", world.depth);

    let expected = entropy_at(depth);
    assert_eq!(
        world.entropy.to_bits(),
        expected.to_bits(),
        "Expected entropy {expected} at depth {depth}, got {}",
        world.entropy
    );
}

/// Entropy of a fresh world after advancing to `depth`.
pub fn entropy_at(depth: u32) -> f64 {
    let mut world = WorldState::new();
    while world.depth < depth {
        world.advance();
    }
    world.entropy
}

/// Assert the inventory holds `item`.
#[track_caller]
pub fn assert_has_artifact(harness: &TestHarness, item: &str) {
    assert!(
        harness.world().inventory.iter().any(|i| i == item),
        "Expected '{item}' in inventory {:?}",
        harness.world().inventory
    );
}

/// Assert the outcome is a narration and return its payload.
#[track_caller]
pub fn expect_narrated(outcome: TurnOutcome) -> crate::engine::DisplayPayload {
    match outcome {
        TurnOutcome::Narrated(payload) => payload,
        other => panic!("Expected narration, got {other:?}"),
    }
}
