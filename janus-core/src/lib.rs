//! Turn engine for JANUS, an AI-narrated text adventure.
//!
//! This crate provides:
//! - The persistent world model (depth, entropy, inventory, lore, disposition)
//! - Keyword-based disposition detection in English and Russian
//! - A narrator that walks a model fallback list over a pool of API keys
//! - Lenient parsing of model replies
//! - Atomic JSON persistence of the world between sessions
//!
//! # Quick Start
//!
//! ```ignore
//! use janus_core::{SessionConfig, TurnEngine, TurnOutcome};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::from_env()?;
//!     let keys = vec![std::env::var("GEMINI_API_KEY")?];
//!
//!     let mut engine = TurnEngine::from_config(&config, keys).await?;
//!
//!     if let TurnOutcome::Narrated(payload) = engine.process_turn("I look around").await {
//!         println!("{}", payload.narrative);
//!     }
//!
//!     engine.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod narrator;
pub mod persist;
pub mod sentiment;
pub mod testing;
pub mod world;

// Primary public API
pub use config::{ConfigError, SessionConfig};
pub use engine::{interpret, Command, DisplayPayload, TurnEngine, TurnOutcome, TurnPhase};
pub use narrator::{ConnectivityError, NarrativeResponse, Narrator, Transport};
pub use persist::{PersistError, StateStore};
pub use testing::{ScriptedReply, ScriptedTransport, TestHarness};
pub use world::{ActionHistory, EntropyBand, PsychProfile, WorldState};
