//! TurnEngine - one player input in, one outcome out.
//!
//! The engine owns the world, the narrator, and the state store. A turn
//! classifies the input, asks the narrator for the next beat, and only on
//! success folds the reply into the world and saves it. A failed turn leaves
//! the world exactly as it was.

use crate::config::SessionConfig;
use crate::narrator::{ConnectivityError, NarrativeResponse, Narrator, Transport};
use crate::persist::{PersistError, StateStore};
use crate::sentiment;
use crate::world::{PsychProfile, WorldState};
use gemini::Gemini;
use tracing::{debug, info, warn};

/// Action substituted for empty input.
pub const IDLE_ACTION: &str = "look around and wait";

/// Inputs that save and end the session, compared case-insensitively.
pub const EXIT_KEYWORDS: &[&str] = &["exit", "quit", "save", "выход", "выйти", "сохранить"];

/// What a raw line of input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Save and end the session.
    Terminate,
    /// Play this action.
    Act(String),
}

/// Interpret raw input: blank becomes the idle action, exit words terminate.
pub fn interpret(raw_input: &str) -> Command {
    let trimmed = raw_input.trim();
    if trimmed.is_empty() {
        return Command::Act(IDLE_ACTION.to_string());
    }

    let lowered = trimmed.to_lowercase();
    if EXIT_KEYWORDS.contains(&lowered.as_str()) {
        Command::Terminate
    } else {
        Command::Act(trimmed.to_string())
    }
}

/// Where the engine is in a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    AwaitingResponse,
}

/// Everything the driver needs to render a successful turn.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayPayload {
    pub narrative: String,
    pub choices: Vec<String>,
    pub visual_clue: String,
    pub ambience_color: Option<String>,
    pub artifact_found: Option<String>,
    pub lore_unlocked: Option<String>,
    pub depth: u32,
    pub entropy: f64,
    pub psych_profile: PsychProfile,
}

/// Result of one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Narrated(DisplayPayload),
    Terminate,
    Failed(ConnectivityError),
}

/// Drives a session one turn at a time.
pub struct TurnEngine<T: Transport> {
    narrator: Narrator<T>,
    store: StateStore,
    world: WorldState,
    phase: TurnPhase,
}

impl TurnEngine<Gemini> {
    /// Build an engine talking to Gemini and load the saved world.
    pub async fn from_config(
        config: &SessionConfig,
        credentials: Vec<String>,
    ) -> Result<Self, gemini::Error> {
        let mut client = Gemini::new()?.with_timeout(config.request_timeout);
        if let Some(base) = &config.api_base {
            client = client.with_base_url(base.as_str());
        }

        let narrator = Narrator::new(client, credentials, config.attempt_policy());
        Ok(Self::start(narrator, config.state_store()).await)
    }
}

impl<T: Transport> TurnEngine<T> {
    /// Create an engine, loading the world from `store`.
    pub async fn start(narrator: Narrator<T>, store: StateStore) -> Self {
        let world = store.load().await;
        info!(
            depth = world.depth,
            entropy = world.entropy,
            profile = %world.psych_profile,
            "session started"
        );
        Self::with_world(narrator, store, world)
    }

    /// Create an engine around an existing world.
    pub fn with_world(narrator: Narrator<T>, store: StateStore, world: WorldState) -> Self {
        Self {
            narrator,
            store,
            world,
            phase: TurnPhase::Idle,
        }
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn narrator(&self) -> &Narrator<T> {
        &self.narrator
    }

    /// Give a fresh world its opening context.
    pub fn seed_context(&mut self, text: impl Into<String>) {
        self.world.seed_context(text);
    }

    /// Process one line of player input.
    pub async fn process_turn(&mut self, raw_input: &str) -> TurnOutcome {
        let action = match interpret(raw_input) {
            Command::Terminate => {
                self.persist().await;
                info!(depth = self.world.depth, "session terminated by player");
                return TurnOutcome::Terminate;
            }
            Command::Act(action) => action,
        };

        // Work on a copy so a failed request leaves no trace.
        let mut next = self.world.clone();
        next.psych_profile = sentiment::classify(&action, next.psych_profile);
        let signal = sentiment::detect(&action);

        self.phase = TurnPhase::AwaitingResponse;
        let result = self.narrator.generate(&next, &action).await;
        self.phase = TurnPhase::Idle;

        match result {
            Ok(response) => {
                let payload = self.commit(next, signal, response);
                self.persist().await;
                TurnOutcome::Narrated(payload)
            }
            Err(e) => {
                warn!(error = %e, fatal = e.is_fatal(), "turn failed, world unchanged");
                TurnOutcome::Failed(e)
            }
        }
    }

    /// Save the world explicitly, e.g. when input ends without an exit word.
    pub async fn shutdown(&self) -> Result<(), PersistError> {
        self.store.save(&self.world).await
    }

    fn commit(
        &mut self,
        mut next: WorldState,
        signal: Option<PsychProfile>,
        response: NarrativeResponse,
    ) -> DisplayPayload {
        if let Some(artifact) = &response.artifact_found {
            info!(artifact = %artifact, "artifact found");
            next.add_artifact(artifact.clone());
        }
        if let Some(lore) = &response.lore_unlocked {
            info!("lore unlocked");
            next.add_lore(lore.clone());
        }
        if let Some(profile) = signal {
            next.action_history.record(profile);
        }

        // Every successful reply advances, even a purely descriptive one.
        next.last_context = response.narrative.clone();
        next.advance();
        self.world = next;

        debug!(
            depth = self.world.depth,
            entropy = self.world.entropy,
            profile = %self.world.psych_profile,
            "turn committed"
        );

        DisplayPayload {
            narrative: response.narrative,
            choices: response.choices,
            visual_clue: response.visual_clue,
            ambience_color: response.ambience_color,
            artifact_found: response.artifact_found,
            lore_unlocked: response.lore_unlocked,
            depth: self.world.depth,
            entropy: self.world.entropy,
            psych_profile: self.world.psych_profile,
        }
    }

    async fn persist(&self) {
        if let Err(e) = self.store.save(&self.world).await {
            warn!(path = %self.store.path().display(), error = %e, "failed to save world");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{narrative_json, ScriptedReply, TestHarness};
    use crate::world::ActionHistory;
    use tempfile::TempDir;

    #[test]
    fn test_interpret() {
        assert_eq!(interpret(""), Command::Act(IDLE_ACTION.to_string()));
        assert_eq!(interpret("  \t "), Command::Act(IDLE_ACTION.to_string()));
        assert_eq!(interpret("EXIT"), Command::Terminate);
        assert_eq!(interpret(" save "), Command::Terminate);
        assert_eq!(interpret("Выход"), Command::Terminate);
        assert_eq!(interpret("сохранить"), Command::Terminate);
        assert_eq!(
            interpret("  exit the room  "),
            Command::Act("exit the room".to_string())
        );
    }

    #[tokio::test]
    async fn test_phase_returns_to_idle() {
        let dir = TempDir::new().unwrap();
        let mut harness = TestHarness::new(dir.path().join("world.json"));
        harness.expect_narrative("Dust settles.");

        assert_eq!(harness.engine.phase(), TurnPhase::Idle);
        harness.input("wait").await;
        assert_eq!(harness.engine.phase(), TurnPhase::Idle);
    }

    #[tokio::test]
    async fn test_success_payload() {
        let dir = TempDir::new().unwrap();
        let mut harness = TestHarness::new(dir.path().join("world.json"));
        harness.expect_reply(ScriptedReply::Text(
            r#"{"narrative": "A lamp flickers.", "choices": ["Touch it"], "visual_clue": "💡",
                "ambience_color": "amber", "lore_unlocked": "Light remembers."}"#
                .to_string(),
        ));

        let outcome = harness.input("I examine the lamp").await;
        let TurnOutcome::Narrated(payload) = outcome else {
            panic!("expected narration, got {outcome:?}");
        };

        assert_eq!(payload.narrative, "A lamp flickers.");
        assert_eq!(payload.choices, vec!["Touch it"]);
        assert_eq!(payload.visual_clue, "💡");
        assert_eq!(payload.ambience_color.as_deref(), Some("amber"));
        assert_eq!(payload.depth, 2);
        assert_eq!(payload.psych_profile, PsychProfile::Analytic);

        let world = harness.world();
        assert_eq!(world.lore, vec!["Light remembers."]);
        assert_eq!(world.last_context, "A lamp flickers.");
        assert_eq!(world.action_history.analytic, 1);
    }

    #[tokio::test]
    async fn test_unmatched_input_keeps_profile_and_history() {
        let dir = TempDir::new().unwrap();
        let mut world = WorldState::new();
        world.psych_profile = PsychProfile::Anxious;
        let mut harness = TestHarness::with_world(dir.path().join("world.json"), world);
        harness.expect_narrative("Nothing changes.");

        harness.input("I sit down").await;

        assert_eq!(harness.world().psych_profile, PsychProfile::Anxious);
        assert_eq!(harness.world().action_history, ActionHistory::default());
    }

    #[tokio::test]
    async fn test_profile_classified_before_request() {
        let dir = TempDir::new().unwrap();
        let mut world = WorldState::new();
        world.psych_profile = PsychProfile::Anxious;
        let mut harness = TestHarness::with_world(dir.path().join("world.json"), world);
        harness
            .expect_narrative("The mirror resists.")
            .expect_narrative("Silence.");

        harness.input("I smash the mirror").await;
        let prompt = harness.last_prompt().unwrap();
        assert!(prompt.contains("Psych Profile: Aggressive/Dominant"), "{prompt}");

        harness.input("I sit down").await;
        let prompt = harness.last_prompt().unwrap();
        assert!(prompt.contains("Psych Profile: Aggressive/Dominant"), "{prompt}");

        let world = harness.world();
        assert_eq!(world.psych_profile, PsychProfile::Aggressive);
        assert_eq!(world.action_history.aggressive, 1);
        assert_eq!(world.action_history.anxious, 0);
        assert_eq!(world.action_history.analytic, 0);
    }

    #[tokio::test]
    async fn test_failed_save_still_narrates() {
        let dir = TempDir::new().unwrap();
        let unwritable = dir.path().join("missing-dir").join("world.json");
        let mut harness = TestHarness::new(unwritable);
        harness.expect_reply(ScriptedReply::Text(narrative_json("Still here.")));

        let outcome = harness.input("wait").await;
        assert!(matches!(outcome, TurnOutcome::Narrated(_)));
        assert_eq!(harness.world().depth, 2);
    }

    #[tokio::test]
    async fn test_shutdown_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("world.json");
        let mut harness = TestHarness::new(&path);
        harness.expect_narrative("Quiet.");
        harness.input("wait").await;

        std::fs::remove_file(&path).unwrap();
        harness.engine.shutdown().await.unwrap();

        assert_eq!(StateStore::new(&path).load().await, *harness.world());
    }
}
