//! World persistence.
//!
//! The world lives in a single pretty-printed JSON file. Loading never fails:
//! a missing, unreadable, or corrupt file yields a fresh world and a log
//! notice. Saving writes a sibling temporary file and renames it into place.

use crate::world::WorldState;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

/// Default location of the state file.
pub const DEFAULT_STATE_FILE: &str = "janus_world_state.json";

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk shape: the world record plus the save time.
#[derive(Serialize)]
struct SavedWorld<'a> {
    #[serde(flatten)]
    world: &'a WorldState,
    timestamp: String,
}

/// Loads and saves the world record at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the world, falling back to a fresh one on any failure.
    pub async fn load(&self) -> WorldState {
        match self.try_load().await {
            Ok(world) => {
                debug!(path = %self.path.display(), depth = world.depth, "world loaded");
                world
            }
            Err(PersistError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no saved world, starting fresh");
                WorldState::default()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "saved world unreadable, starting fresh");
                WorldState::default()
            }
        }
    }

    /// Load the world, reporting why it could not be read.
    pub async fn try_load(&self) -> Result<WorldState, PersistError> {
        let content = fs::read_to_string(&self.path).await?;
        let world: WorldState = serde_json::from_str(&content)?;
        Ok(world.sanitized())
    }

    /// Write the full record, stamped with the current time.
    pub async fn save(&self, world: &WorldState) -> Result<(), PersistError> {
        let saved = SavedWorld {
            world,
            timestamp: chrono::Local::now().to_rfc3339(),
        };
        let content = serde_json::to_string_pretty(&saved)?;

        let staging = self.staging_path();
        fs::write(&staging, content).await?;
        fs::rename(&staging, &self.path).await?;

        debug!(path = %self.path.display(), depth = world.depth, "world saved");
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_FILE)
    }
}
