//! World state for a Janus session.
//!
//! The whole world is one record. Depth and entropy only ever move upward,
//! collected artifacts and lore only accumulate, and the psych profile is
//! always one of four fixed labels.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Depth of a brand new world.
pub const INITIAL_DEPTH: u32 = 1;

/// Entropy of a brand new world.
pub const INITIAL_ENTROPY: f64 = 0.1;

/// Entropy added by every successful turn.
pub const ENTROPY_STEP: f64 = 0.05;

// ============================================================================
// Psych Profile
// ============================================================================

/// Inferred disposition of the player, used to steer narrative tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum PsychProfile {
    #[default]
    Neutral,
    #[serde(rename = "Aggressive/Dominant")]
    Aggressive,
    #[serde(rename = "Anxious/Cautious")]
    Anxious,
    #[serde(rename = "Analytic/Curious")]
    Analytic,
}

impl PsychProfile {
    pub fn label(&self) -> &'static str {
        match self {
            PsychProfile::Neutral => "Neutral",
            PsychProfile::Aggressive => "Aggressive/Dominant",
            PsychProfile::Anxious => "Anxious/Cautious",
            PsychProfile::Analytic => "Analytic/Curious",
        }
    }

    pub fn all() -> [PsychProfile; 4] {
        [
            PsychProfile::Neutral,
            PsychProfile::Aggressive,
            PsychProfile::Anxious,
            PsychProfile::Analytic,
        ]
    }

    /// Parse a stored label.
    ///
    /// Older save files wrote labels such as `"Aggressive (History: 3)"` or
    /// `"Analytical"`, so anything whose leading word names a category is
    /// accepted as that category.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if let Some(exact) = Self::all().into_iter().find(|p| p.label() == label) {
            return Some(exact);
        }

        let head: String = label
            .chars()
            .take_while(|c| c.is_alphabetic())
            .collect::<String>()
            .to_lowercase();

        match head.as_str() {
            "neutral" => Some(PsychProfile::Neutral),
            "aggressive" | "dominant" => Some(PsychProfile::Aggressive),
            "anxious" | "cautious" => Some(PsychProfile::Anxious),
            "analytic" | "analytical" | "curious" => Some(PsychProfile::Analytic),
            _ => None,
        }
    }
}

impl fmt::Display for PsychProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl<'de> Deserialize<'de> for PsychProfile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Unknown or mistyped labels collapse to Neutral instead of failing the record.
        let raw = Value::deserialize(deserializer)?;
        Ok(raw
            .as_str()
            .and_then(PsychProfile::from_label)
            .unwrap_or_default())
    }
}

// ============================================================================
// Action History
// ============================================================================

/// How often each disposition has shown up in successful turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionHistory {
    pub aggressive: u32,
    pub anxious: u32,
    #[serde(alias = "analytical")]
    pub analytic: u32,
}

impl ActionHistory {
    /// Count one more turn for `profile`. Neutral is never counted.
    pub fn record(&mut self, profile: PsychProfile) {
        match profile {
            PsychProfile::Aggressive => self.aggressive = self.aggressive.saturating_add(1),
            PsychProfile::Anxious => self.anxious = self.anxious.saturating_add(1),
            PsychProfile::Analytic => self.analytic = self.analytic.saturating_add(1),
            PsychProfile::Neutral => {}
        }
    }

    pub fn count(&self, profile: PsychProfile) -> u32 {
        match profile {
            PsychProfile::Aggressive => self.aggressive,
            PsychProfile::Anxious => self.anxious,
            PsychProfile::Analytic => self.analytic,
            PsychProfile::Neutral => 0,
        }
    }

    /// The most frequent disposition, or `None` before anything was recorded.
    ///
    /// Ties go to the earlier of aggressive, anxious, analytic.
    pub fn dominant(&self) -> Option<PsychProfile> {
        let mut best: Option<(PsychProfile, u32)> = None;
        for profile in [
            PsychProfile::Aggressive,
            PsychProfile::Anxious,
            PsychProfile::Analytic,
        ] {
            let count = self.count(profile);
            if count > 0 && best.map_or(true, |(_, top)| count > top) {
                best = Some((profile, count));
            }
        }
        best.map(|(profile, _)| profile)
    }
}

// ============================================================================
// Entropy
// ============================================================================

/// Coarse reading of the entropy scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyBand {
    /// Below 0.3: the world still behaves.
    Stable,
    /// 0.3 up to 0.7: cracks are showing.
    Unstable,
    /// 0.7 and above: abstract, glitching, non-Euclidean.
    Critical,
}

impl EntropyBand {
    pub fn from_entropy(entropy: f64) -> Self {
        if entropy < 0.3 {
            EntropyBand::Stable
        } else if entropy < 0.7 {
            EntropyBand::Unstable
        } else {
            EntropyBand::Critical
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EntropyBand::Stable => "Stable",
            EntropyBand::Unstable => "Unstable",
            EntropyBand::Critical => "Critical",
        }
    }
}

// ============================================================================
// Artifacts
// ============================================================================

/// Turn an artifact value into its inventory label.
///
/// Accepts a plain name or an object with `name` and an optional `ability`,
/// which becomes `"Name (ability)"`. Blank or otherwise shaped values yield
/// `None`.
pub fn artifact_label(value: &Value) -> Option<String> {
    match value {
        Value::String(name) => non_blank(name),
        Value::Object(fields) => {
            let name = fields.get("name").and_then(Value::as_str).and_then(non_blank)?;
            match fields.get("ability").and_then(Value::as_str).and_then(non_blank) {
                Some(ability) => Some(format!("{name} ({ability})")),
                None => Some(name),
            }
        }
        _ => None,
    }
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Stored strings load verbatim; only legacy `{name, ability}` objects are flattened.
fn deserialize_inventory<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let items = Vec::<Value>::deserialize(deserializer)?;
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(name),
            legacy => artifact_label(&legacy),
        })
        .collect())
}

// ============================================================================
// World State
// ============================================================================

/// The complete, persistent state of one world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldState {
    /// Narrative progression counter, starting at 1.
    pub depth: u32,

    /// Accumulated world instability.
    pub entropy: f64,

    /// Artifact names in the order they were found.
    #[serde(deserialize_with = "deserialize_inventory")]
    pub inventory: Vec<String>,

    /// Unlocked lore fragments in the order they were found.
    pub lore: Vec<String>,

    /// Most recent narrative, fed back as continuity context.
    pub last_context: String,

    /// Current inferred disposition of the player.
    pub psych_profile: PsychProfile,

    /// Running tally of matched dispositions.
    pub action_history: ActionHistory,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            depth: INITIAL_DEPTH,
            entropy: INITIAL_ENTROPY,
            inventory: Vec::new(),
            lore: Vec::new(),
            last_context: String::new(),
            psych_profile: PsychProfile::Neutral,
            action_history: ActionHistory::default(),
        }
    }
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True for a world nobody has played yet.
    pub fn is_fresh(&self) -> bool {
        self.depth == INITIAL_DEPTH && self.last_context.is_empty()
    }

    /// Give a fresh world its opening context. No effect once play has begun.
    pub fn seed_context(&mut self, text: impl Into<String>) {
        if self.is_fresh() {
            self.last_context = text.into();
        }
    }

    pub fn entropy_band(&self) -> EntropyBand {
        EntropyBand::from_entropy(self.entropy)
    }

    /// Inventory rendered for display or prompting.
    pub fn inventory_summary(&self) -> String {
        if self.inventory.is_empty() {
            "Empty".to_string()
        } else {
            self.inventory.join(", ")
        }
    }

    pub fn add_artifact(&mut self, artifact: impl Into<String>) {
        self.inventory.push(artifact.into());
    }

    pub fn add_lore(&mut self, fragment: impl Into<String>) {
        self.lore.push(fragment.into());
    }

    /// Advance one step: depth by one, entropy by [`ENTROPY_STEP`].
    pub fn advance(&mut self) {
        self.depth = self.depth.saturating_add(1);
        self.entropy += ENTROPY_STEP;
    }

    /// Clamp values a hand-edited or damaged file could carry.
    pub(crate) fn sanitized(mut self) -> Self {
        self.depth = self.depth.max(INITIAL_DEPTH);
        if !self.entropy.is_finite() || self.entropy < 0.0 {
            self.entropy = INITIAL_ENTROPY;
        }
        self
    }
}
