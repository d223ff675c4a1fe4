//! Ordered fallback across model identifiers.
//!
//! An [`AttemptPolicy`] walks its model list in declared order, bounds each
//! attempt with a timeout, optionally waits between attempts, and stops at
//! the first success.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Default bound on a single model attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(15);

/// Wait inserted between a failed attempt and the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Move to the next model immediately.
    #[default]
    None,
    /// Wait the same amount after every failure.
    Fixed(Duration),
    /// Wait `base`, then `2 * base`, then `4 * base`, ...
    Exponential { base: Duration },
}

impl Backoff {
    /// Delay after the failure of attempt number `failed` (zero-based).
    pub fn delay(&self, failed: usize) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base } => {
                let factor = 1u32.checked_shl(failed as u32).unwrap_or(u32::MAX);
                base.saturating_mul(factor)
            }
        }
    }
}

/// Why one attempt did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub model: String,
    pub reason: String,
}

/// Ordered list of models plus the rules for walking it.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptPolicy {
    models: Vec<String>,
    timeout: Duration,
    backoff: Backoff,
}

impl AttemptPolicy {
    pub fn new<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            models: models.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_ATTEMPT_TIMEOUT,
            backoff: Backoff::None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Run `attempt` once per model until one succeeds.
    ///
    /// `attempt` receives the model identifier and the per-attempt timeout.
    /// An attempt that outlives the timeout counts as a failure even if the
    /// underlying future would eventually finish. Returns every failure, in
    /// order, when no model succeeds.
    pub async fn run<T, E, F, Fut>(&self, mut attempt: F) -> Result<T, Vec<AttemptFailure>>
    where
        F: FnMut(String, Duration) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut failures = Vec::with_capacity(self.models.len());

        for (index, model) in self.models.iter().enumerate() {
            if index > 0 {
                let delay = self.backoff.delay(index - 1);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }

            let outcome = tokio::time::timeout(self.timeout, attempt(model.clone(), self.timeout)).await;
            let reason = match outcome {
                Ok(Ok(value)) => {
                    info!(model = %model, attempt = index + 1, "model attempt succeeded");
                    return Ok(value);
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("timed out after {:?}", self.timeout),
            };

            warn!(model = %model, attempt = index + 1, reason = %reason, "model attempt failed");
            failures.push(AttemptFailure {
                model: model.clone(),
                reason,
            });
        }

        Err(failures)
    }
}
