//! JANUS console driver.
//!
//! Reads one line of player input at a time, hands it to the turn engine,
//! and renders the result. Logs go to a file so the console stays reserved
//! for the story.
//!
//! ```bash
//! GEMINI_API_KEYS=key1,key2 cargo run -p janus -- --state my_world.json
//! ```

mod credentials;
mod render;

use janus_core::{interpret, Command, SessionConfig, TurnEngine, TurnOutcome};
use std::fs::OpenOptions;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Opening context for a world nobody has played yet.
const INTRO: &str = "System rebooted. Kernel version updated. You feel a new level of awareness.";

const DEFAULT_LOG_FILE: &str = "janus_log.txt";

#[derive(Debug, Clone, PartialEq)]
struct Args {
    state: Option<PathBuf>,
    keys: PathBuf,
    log: PathBuf,
    help: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            state: None,
            keys: PathBuf::from(credentials::DEFAULT_KEYS_FILE),
            log: PathBuf::from(DEFAULT_LOG_FILE),
            help: false,
        }
    }
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .map(PathBuf::from)
                .ok_or_else(|| format!("{flag} requires a path"))
        };
        match arg.as_str() {
            "-h" | "--help" => parsed.help = true,
            "--state" => parsed.state = Some(value("--state")?),
            "--keys" => parsed.keys = value("--keys")?,
            "--log" => parsed.log = value("--log")?,
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    Ok(parsed)
}

fn init_logging(path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("Error: {message}");
            eprintln!("Run with --help for usage.");
            std::process::exit(2);
        }
    };
    if args.help {
        print_help();
        return Ok(());
    }

    init_logging(&args.log)?;
    info!("janus starting");

    let mut config = SessionConfig::from_env()?;
    if let Some(state) = &args.state {
        config = config.with_state_path(state);
    }
    info!(
        state = %config.state_path.display(),
        models = ?config.models,
        timeout_secs = config.request_timeout.as_secs(),
        "configuration loaded"
    );

    let keys = credentials::resolve(&args.keys)?;
    let mut engine = TurnEngine::from_config(&config, keys).await?;

    let mut out = io::stdout();
    if engine.world().is_fresh() {
        engine.seed_context(INTRO);
        render::intro(&mut out, INTRO)?;
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        render::status(&mut out, engine.world())?;
        render::prompt(&mut out)?;

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                warn!(error = %e, "failed to read input");
                engine.shutdown().await?;
                break;
            }
            None => {
                info!("input closed");
                engine.shutdown().await?;
                render::farewell(&mut out)?;
                break;
            }
        };

        let waits = needs_narration(&line);
        if waits {
            render::thinking(&mut out)?;
        }
        let outcome = engine.process_turn(&line).await;
        if waits {
            render::clear_line(&mut out)?;
        }

        match outcome {
            TurnOutcome::Narrated(payload) => render::payload(&mut out, &payload)?,
            TurnOutcome::Terminate => {
                render::farewell(&mut out)?;
                break;
            }
            TurnOutcome::Failed(e) if e.is_fatal() => {
                render::failure(&mut out, &e)?;
                engine.shutdown().await?;
                return Err(e.into());
            }
            TurnOutcome::Failed(e) => render::failure(&mut out, &e)?,
        }
    }

    info!(depth = engine.world().depth, "janus stopped");
    Ok(())
}

/// Whether `line` goes to the narrator rather than ending the session.
fn needs_narration(line: &str) -> bool {
    matches!(interpret(line), Command::Act(_))
}

fn print_help() {
    println!("JANUS - an AI-narrated descent through a shifting world");
    println!();
    println!("USAGE:");
    println!("  janus [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help        Show this help message");
    println!("  --state <PATH>    World file (default: janus_world_state.json)");
    println!("  --keys <PATH>     API keys file (default: janus_keys.json)");
    println!("  --log <PATH>      Log file (default: janus_log.txt)");
    println!();
    println!("ENVIRONMENT:");
    println!("  GEMINI_API_KEYS      Comma-separated API keys (overrides the keys file)");
    println!("  JANUS_STATE_FILE     World file, overridden by --state");
    println!("  JANUS_MODELS         Comma-separated models, tried in order");
    println!("  JANUS_TIMEOUT_SECS   Per-attempt timeout in seconds (default: 15)");
    println!("  JANUS_BACKOFF_MS     Exponential wait between attempts (default: none)");
    println!("  GEMINI_API_BASE      Alternative API root");
    println!("  RUST_LOG             Log filter (default: info)");
    println!();
    println!("IN GAME:");
    println!("  Type an action and press Enter. An empty line waits.");
    println!("  exit, quit, save, выход or сохранить saves and leaves.");
}
