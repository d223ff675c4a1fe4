//! Console rendering.

use crossterm::style::{Color, Stylize};
use janus_core::{ConnectivityError, DisplayPayload, EntropyBand, WorldState};
use std::io::{self, Write};

/// Column at which narrative text wraps.
pub const WRAP_WIDTH: usize = 70;

const RULE: &str = "────────────────────────────────────────";

pub fn band_color(band: EntropyBand) -> Color {
    match band {
        EntropyBand::Stable => Color::Green,
        EntropyBand::Unstable => Color::Yellow,
        EntropyBand::Critical => Color::Red,
    }
}

/// Map a model-supplied color name onto a terminal color.
pub fn ambience_color(name: Option<&str>) -> Color {
    let Some(name) = name else {
        return Color::White;
    };

    match name.trim().to_lowercase().as_str() {
        "red" | "crimson" | "scarlet" | "blood" => Color::Red,
        "green" | "emerald" => Color::Green,
        "yellow" | "gold" | "golden" | "amber" => Color::Yellow,
        "blue" | "azure" | "navy" => Color::Blue,
        "purple" | "violet" | "magenta" => Color::Magenta,
        "cyan" | "teal" | "turquoise" => Color::Cyan,
        "grey" | "gray" | "ash" | "silver" => Color::Grey,
        "black" | "void" => Color::DarkGrey,
        _ => Color::White,
    }
}

pub fn intro(out: &mut impl Write, text: &str) -> io::Result<()> {
    writeln!(out, "{}", "J A N U S".cyan().bold())?;
    writeln!(out, "{}", wrap(text, WRAP_WIDTH).grey())
}

pub fn status(out: &mut impl Write, world: &WorldState) -> io::Result<()> {
    let line = format!(
        "[DEPTH: {} | ENTROPY: {:.2} | PSYCH: {}]",
        world.depth, world.entropy, world.psych_profile
    );
    writeln!(out)?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "{}", line.with(band_color(world.entropy_band())))
}

pub fn prompt(out: &mut impl Write) -> io::Result<()> {
    write!(out, "\n{} ", ">".yellow())?;
    out.flush()
}

pub fn thinking(out: &mut impl Write) -> io::Result<()> {
    write!(out, "{}\r", "(thinking...)".dark_grey())?;
    out.flush()
}

pub fn clear_line(out: &mut impl Write) -> io::Result<()> {
    write!(out, "\r{:13}\r", "")?;
    out.flush()
}

pub fn payload(out: &mut impl Write, payload: &DisplayPayload) -> io::Result<()> {
    let color = ambience_color(payload.ambience_color.as_deref());
    let clue = if payload.visual_clue.is_empty() {
        "·"
    } else {
        payload.visual_clue.as_str()
    };

    writeln!(out)?;
    writeln!(out, "{clue} {}", wrap(&payload.narrative, WRAP_WIDTH).with(color))?;
    writeln!(out)?;

    if let Some(artifact) = &payload.artifact_found {
        writeln!(out, "{}", format!("[!] ARTIFACT: {artifact}").green())?;
    }
    if let Some(lore) = &payload.lore_unlocked {
        writeln!(out, "{}", format!("[?] LORE UNLOCKED: {lore}").magenta())?;
    }
    writeln!(out, "{}", format!(">>> DEPTH INCREASED TO {}", payload.depth).cyan())?;

    if !payload.choices.is_empty() {
        writeln!(out, "{}", "Possibilities:".blue())?;
        for (i, choice) in payload.choices.iter().enumerate() {
            writeln!(out, "{}. {choice}", i + 1)?;
        }
    }
    Ok(())
}

pub fn failure(out: &mut impl Write, error: &ConnectivityError) -> io::Result<()> {
    let message = match error {
        ConnectivityError::NoCredentials => {
            "CRITICAL ERROR: no API keys configured. Set GEMINI_API_KEYS or fill the keys file.".to_string()
        }
        ConnectivityError::AllModelsExhausted { attempts } => format!(
            "Neuro-link unstable: {attempts} attempts failed. Nothing changed; try again. Details in the log."
        ),
    };
    writeln!(out, "{}", message.red())
}

pub fn farewell(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{}", "Saved.".dark_grey())
}

/// Greedy word wrap; paragraphs separated by blank lines are kept.
pub fn wrap(text: &str, width: usize) -> String {
    text.split("\n\n")
        .map(|paragraph| wrap_paragraph(paragraph, width))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn wrap_paragraph(paragraph: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in paragraph.split_whitespace() {
        let needed = current.chars().count() + word.chars().count() + usize::from(!current.is_empty());
        if !current.is_empty() && needed > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}
