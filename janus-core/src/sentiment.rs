//! Keyword-based disposition classifier.
//!
//! Input is lowercased and searched for keyword substrings. Categories are
//! checked aggression first, then fear, then curiosity, and the first hit
//! wins. When nothing matches the current profile is kept.

use crate::world::PsychProfile;

const AGGRESSION_KEYWORDS: &[&str] = &[
    "kill", "break", "smash", "punch", "destroy", "attack", "fight", "stab",
    "убить", "убей", "ударить", "ударю", "сломать", "сломаю", "бить", "атак", "драться",
];

const FEAR_KEYWORDS: &[&str] = &[
    "hide", "run away", "flee", "fear", "afraid", "scared", "dark", "help",
    "бежать", "убежать", "прятаться", "спрятаться", "страх", "боюсь", "страшно", "темно",
    "помощь", "помогите",
];

const CURIOSITY_KEYWORDS: &[&str] = &[
    "look", "scan", "why", "examine", "inspect", "analyze", "check", "study",
    "осмотреть", "осмотрюсь", "смотреть", "читать", "прочитать", "почему", "анализ",
    "изучить",
];

/// Categories in priority order.
const CATEGORIES: [(PsychProfile, &[&str]); 3] = [
    (PsychProfile::Aggressive, AGGRESSION_KEYWORDS),
    (PsychProfile::Anxious, FEAR_KEYWORDS),
    (PsychProfile::Analytic, CURIOSITY_KEYWORDS),
];

/// The disposition `text` signals, if any.
pub fn detect(text: &str) -> Option<PsychProfile> {
    let lowered = text.to_lowercase();
    CATEGORIES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(profile, _)| *profile)
}

/// Classify `text`, keeping `current` when no keyword matches.
pub fn classify(text: &str, current: PsychProfile) -> PsychProfile {
    detect(text).unwrap_or(current)
}
