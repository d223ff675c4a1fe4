//! Session configuration.
//!
//! Values are fixed for the lifetime of a session. They can be built in code
//! with the `with_*` methods or read from the environment:
//!
//! - `JANUS_STATE_FILE` -- path of the world file (default `janus_world_state.json`)
//! - `JANUS_MODELS` -- comma-separated model identifiers, tried in order
//! - `JANUS_TIMEOUT_SECS` -- per-attempt timeout in seconds (default 15)
//! - `JANUS_BACKOFF_MS` -- base of an exponential wait between attempts (default none)
//! - `GEMINI_API_BASE` -- alternative API root

use crate::narrator::{AttemptPolicy, Backoff, DEFAULT_ATTEMPT_TIMEOUT};
use crate::persist::{StateStore, DEFAULT_STATE_FILE};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Models tried in order: fast and cheap first, heavier after.
pub const DEFAULT_MODELS: &[&str] = &["gemini-2.5-flash-lite", "gemini-2.5-flash", "gemini-2.5-pro"];

/// Errors from reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Configuration for one play session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Where the world is saved.
    pub state_path: PathBuf,

    /// Model identifiers in fallback order.
    pub models: Vec<String>,

    /// Bound on each model attempt.
    pub request_timeout: Duration,

    /// Wait between failed attempts.
    pub backoff: Backoff,

    /// Alternative API root, if any.
    pub api_base: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from(DEFAULT_STATE_FILE),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            request_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            backoff: Backoff::None,
            api_base: None,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(path) = value("JANUS_STATE_FILE") {
            config.state_path = PathBuf::from(path.trim());
        }

        if let Some(models) = value("JANUS_MODELS") {
            let models: Vec<String> = models
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
            if models.is_empty() {
                return Err(ConfigError::Invalid {
                    name: "JANUS_MODELS",
                    reason: "no model identifiers".to_string(),
                });
            }
            config.models = models;
        }

        if let Some(secs) = value("JANUS_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|e| ConfigError::Invalid {
                name: "JANUS_TIMEOUT_SECS",
                reason: format!("{e}"),
            })?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    name: "JANUS_TIMEOUT_SECS",
                    reason: "must be at least 1".to_string(),
                });
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(ms) = value("JANUS_BACKOFF_MS") {
            let ms: u64 = ms.trim().parse().map_err(|e| ConfigError::Invalid {
                name: "JANUS_BACKOFF_MS",
                reason: format!("{e}"),
            })?;
            config.backoff = if ms == 0 {
                Backoff::None
            } else {
                Backoff::Exponential {
                    base: Duration::from_millis(ms),
                }
            };
        }

        config.api_base = value("GEMINI_API_BASE").map(|b| b.trim().to_string());

        Ok(config)
    }

    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = path.into();
        self
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// The fallback policy these settings describe.
    pub fn attempt_policy(&self) -> AttemptPolicy {
        AttemptPolicy::new(self.models.iter().cloned())
            .with_timeout(self.request_timeout)
            .with_backoff(self.backoff)
    }

    pub fn state_store(&self) -> StateStore {
        StateStore::new(self.state_path.clone())
    }
}
