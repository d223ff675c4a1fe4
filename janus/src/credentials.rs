//! API key bootstrap.
//!
//! Keys come from `GEMINI_API_KEYS` (comma separated) first, then the keys
//! file, then an interactive prompt whose answers are written back to the
//! keys file for next time.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Default keys file, a JSON array of strings.
pub const DEFAULT_KEYS_FILE: &str = "janus_keys.json";

/// Environment variable holding comma-separated keys.
pub const KEYS_ENV: &str = "GEMINI_API_KEYS";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("keys file is not a JSON array of strings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Resolve the credential pool. An empty result means none were configured.
pub fn resolve(keys_path: &Path) -> Result<Vec<String>, CredentialError> {
    let from_env = split_keys(&std::env::var(KEYS_ENV).unwrap_or_default());
    if !from_env.is_empty() {
        info!(count = from_env.len(), "credentials from environment");
        return Ok(from_env);
    }

    match read_keys_file(keys_path) {
        Ok(keys) if !keys.is_empty() => {
            info!(count = keys.len(), path = %keys_path.display(), "credentials from keys file");
            return Ok(keys);
        }
        Ok(_) => {}
        Err(CredentialError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %keys_path.display(), error = %e, "ignoring unreadable keys file"),
    }

    if !io::stdin().is_terminal() {
        return Ok(Vec::new());
    }

    let keys = prompt_for_keys(io::stdin().lock(), io::stdout())?;
    if !keys.is_empty() {
        write_keys_file(keys_path, &keys)?;
        info!(count = keys.len(), path = %keys_path.display(), "credentials saved");
    }
    Ok(keys)
}

/// Split a comma-separated list, dropping blanks.
pub fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn read_keys_file(path: &Path) -> Result<Vec<String>, CredentialError> {
    let content = std::fs::read_to_string(path)?;
    let keys: Vec<String> = serde_json::from_str(&content)?;
    Ok(keys
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect())
}

pub fn write_keys_file(path: &Path, keys: &[String]) -> Result<(), CredentialError> {
    let json = serde_json::to_string_pretty(keys)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Ask for keys one per line until an empty line after at least one key, or EOF.
pub fn prompt_for_keys(input: impl BufRead, mut output: impl Write) -> io::Result<Vec<String>> {
    writeln!(output)?;
    writeln!(
        output,
        "[SETUP] Enter Google Gemini API keys (one per line, empty line to finish):"
    )?;

    let mut keys = Vec::new();
    let mut lines = input.lines();
    loop {
        write!(output, "Key #{}: ", keys.len() + 1)?;
        output.flush()?;

        let Some(line) = lines.next() else { break };
        let key = line?.trim().to_string();
        if key.is_empty() {
            if keys.is_empty() {
                continue;
            }
            break;
        }
        keys.push(key);
    }

    writeln!(output)?;
    Ok(keys)
}
