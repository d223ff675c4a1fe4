//! Prompt rendering.

use crate::world::WorldState;

/// Persona and tone guidance sent ahead of every turn.
pub const SYSTEM_PROMPT: &str = "\
You are JANUS, architect of a cognitive sandbox. You guide the Traveler \
through a surreal world shaped by their own subconscious.

Before you write:
1. Read the Traveler's action against their psych profile and dominant trait.
2. Decide whether they are attacking, exploring, or afraid.
3. Let the current entropy decide how strange the world is allowed to be.

Tone by entropy:
- Below 0.30: grounded and realistic.
- 0.30 to 0.70: unsettling; details slip when looked at twice.
- 0.70 and above: abstract, glitching, non-Euclidean.

Aggression meets resistance: the world pushes back. Caution is offered \
shelter that is not quite safe. Curiosity finds patterns that reward \
attention.

Examples:
Input: \"I smash the mirror with a rock.\" (Aggressive)
Tone: dark and resistant; the world fights back. \"The mirror screams as it \
shatters, and every shard turns to look at you...\"

Input: \"I look closely at the symbols.\" (Analytic)
Tone: mysterious and detailed. \"The symbols shift under your gaze, settling \
into something close to a formula...\"

Artifacts and lore are rare. Offer at most one of each, and most turns \
offer neither.";

/// Output contract appended after the turn context.
pub const RESPONSE_FORMAT: &str = r#"Reply with one JSON object and nothing else:
{
  "narrative": "story text",
  "choices": ["option 1", "option 2", "option 3"],
  "visual_clue": "a single emoji",
  "artifact_found": {"name": "item name", "ability": "what it does"} or null,
  "lore_unlocked": "story fragment" or null,
  "ambience_color": "a color name" or null,
  "reasoning": "one sentence on why you answered this way"
}"#;

/// Render the full prompt for one turn.
pub fn render_prompt(world: &WorldState, action: &str) -> String {
    let dominant = world
        .action_history
        .dominant()
        .map(|profile| {
            format!(
                "{} ({} turns)",
                profile.label(),
                world.action_history.count(profile)
            )
        })
        .unwrap_or_else(|| "Undetermined".to_string());

    let context = if world.last_context.is_empty() {
        "(none)"
    } else {
        world.last_context.as_str()
    };

    format!(
        "{SYSTEM_PROMPT}\n\n\
         --- WORLD STATE ---\n\
         Depth: {depth}\n\
         Entropy: {entropy:.2} ({band})\n\
         Inventory: {inventory}\n\
         Dominant Trait: {dominant}\n\
         Psych Profile: {profile}\n\
         Previous Context: {context}\n\n\
         --- TRAVELER ---\n\
         Action: \"{action}\"\n\n\
         {RESPONSE_FORMAT}\n",
        depth = world.depth,
        entropy = world.entropy,
        band = world.entropy_band().name(),
        inventory = world.inventory_summary(),
        profile = world.psych_profile.label(),
    )
}
