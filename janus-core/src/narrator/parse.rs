//! Best-effort extraction of a narrative reply from model text.
//!
//! Models wrap their JSON in markdown fences, prepend chatter, or get field
//! types wrong. Parsing only demands a JSON object; every field inside it is
//! optional and a field of the wrong type is treated as absent.

use crate::world::artifact_label;
use serde_json::{Map, Value};

/// One turn's worth of generated content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NarrativeResponse {
    pub narrative: String,
    pub choices: Vec<String>,
    pub visual_clue: String,
    pub artifact_found: Option<String>,
    pub lore_unlocked: Option<String>,
    pub ambience_color: Option<String>,
    /// The model's own explanation. Logged, never shown.
    pub reasoning: Option<String>,
}

impl NarrativeResponse {
    fn from_object(fields: &Map<String, Value>) -> Self {
        Self {
            narrative: text_field(fields, "narrative").unwrap_or_default(),
            choices: fields.get("choices").map(choice_list).unwrap_or_default(),
            visual_clue: text_field(fields, "visual_clue").unwrap_or_default(),
            artifact_found: fields.get("artifact_found").and_then(artifact_label),
            lore_unlocked: text_field(fields, "lore_unlocked"),
            ambience_color: text_field(fields, "ambience_color"),
            reasoning: text_field(fields, "reasoning"),
        }
    }
}

/// Result of the parsing stage.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(NarrativeResponse),
    Unparseable(String),
}

/// Parse raw candidate text into a [`NarrativeResponse`].
pub fn parse_narrative(raw: &str) -> ParseOutcome {
    let cleaned = strip_fences(raw);
    if cleaned.is_empty() {
        return ParseOutcome::Unparseable("empty reply".to_string());
    }

    let first_error = match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => return from_value(value),
        Err(e) => e,
    };

    // Prose around the object: retry on the outermost braces.
    if let Some(inner) = outer_object(&cleaned) {
        if let Ok(value) = serde_json::from_str::<Value>(inner) {
            return from_value(value);
        }
    }

    ParseOutcome::Unparseable(format!("invalid JSON: {first_error}"))
}

fn from_value(value: Value) -> ParseOutcome {
    match value {
        Value::Object(fields) => ParseOutcome::Parsed(NarrativeResponse::from_object(&fields)),
        other => ParseOutcome::Unparseable(format!("expected a JSON object, found {}", kind(&other))),
    }
}

/// Remove markdown code-fence markers and surrounding whitespace.
fn strip_fences(raw: &str) -> String {
    raw.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    let text = fields.get(key)?.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn choice_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(choice_text).collect(),
        single => choice_text(single).into_iter().collect(),
    }
}

fn choice_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
