//! Narrative requests against the remote text generator.
//!
//! The narrator owns the credential pool and the model fallback policy. One
//! credential is drawn at random per call and reused for every model tried
//! in that call; a bad key is only avoided by chance on the next call.

mod parse;
mod policy;
pub mod prompt;
mod transport;

pub use parse::{parse_narrative, NarrativeResponse, ParseOutcome};
pub use policy::{AttemptFailure, AttemptPolicy, Backoff, DEFAULT_ATTEMPT_TIMEOUT};
pub use transport::Transport;

use crate::world::WorldState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, warn};

/// Why no narrative could be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectivityError {
    /// No credentials were configured; nothing can ever succeed.
    #[error("no API credentials configured")]
    NoCredentials,

    /// Every model in the policy failed for this call.
    #[error("all {attempts} model attempts failed")]
    AllModelsExhausted { attempts: usize },
}

impl ConnectivityError {
    /// Whether the session cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConnectivityError::NoCredentials)
    }
}

/// Failure of a single model attempt.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("transport: {0}")]
    Transport(#[from] gemini::Error),

    #[error("unparseable reply: {0}")]
    Unparseable(String),
}

/// Builds prompts and delivers them across the credential pool and model list.
pub struct Narrator<T: Transport> {
    transport: T,
    credentials: Vec<String>,
    policy: AttemptPolicy,
    rng: StdRng,
}

impl<T: Transport> Narrator<T> {
    /// Blank credentials are dropped; an all-blank pool counts as empty.
    pub fn new(transport: T, credentials: Vec<String>, policy: AttemptPolicy) -> Self {
        let credentials = credentials
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        Self {
            transport,
            credentials,
            policy,
            rng: StdRng::from_entropy(),
        }
    }

    /// Make credential selection reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn credentials(&self) -> &[String] {
        &self.credentials
    }

    pub fn policy(&self) -> &AttemptPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Request the next narrative for `action` in `world`.
    pub async fn generate(
        &mut self,
        world: &WorldState,
        action: &str,
    ) -> Result<NarrativeResponse, ConnectivityError> {
        if self.credentials.is_empty() {
            warn!("narrative requested without credentials");
            return Err(ConnectivityError::NoCredentials);
        }

        let index = self.rng.gen_range(0..self.credentials.len());
        let credential = self.credentials[index].as_str();
        let prompt_text = prompt::render_prompt(world, action);
        let prompt = prompt_text.as_str();
        let transport = &self.transport;

        debug!(
            credential = index,
            models = self.policy.models().len(),
            prompt_len = prompt.len(),
            "requesting narrative"
        );

        let result = self
            .policy
            .run(move |model, timeout| async move {
                let reply = transport.send(credential, &model, prompt, timeout).await;
                match reply.map(|text| parse_narrative(&text)) {
                    Ok(ParseOutcome::Parsed(response)) => Ok(response),
                    Ok(ParseOutcome::Unparseable(reason)) => Err(AttemptError::Unparseable(reason)),
                    Err(e) => Err(AttemptError::Transport(e)),
                }
            })
            .await;

        match result {
            Ok(response) => {
                if let Some(reasoning) = &response.reasoning {
                    debug!(reasoning = %reasoning, "narrator reasoning");
                }
                Ok(response)
            }
            Err(failures) => {
                warn!(attempts = failures.len(), "all models exhausted");
                Err(ConnectivityError::AllModelsExhausted {
                    attempts: failures.len(),
                })
            }
        }
    }
}
