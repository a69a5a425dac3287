//! Prompt construction for the three model stages.
//!
//! Every builder is a pure function of its inputs: identical inputs produce
//! byte-identical output, which keeps prompts cacheable and testable.

use std::fmt::Write as _;

use crate::room::{RoomAnalysis, SuggestionText};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minimum number of suggestions requested from the text model.
pub const MIN_SUGGESTIONS: usize = 5;

/// Maximum number of suggestions requested from the text model.
pub const MAX_SUGGESTIONS: usize = 8;

/// Word cap given to the model for the image prompt paragraph.
pub const IMAGE_PROMPT_WORD_LIMIT: usize = 400;

/// Negative prompt shown to the model as the expected default.
pub const DEFAULT_NEGATIVE_PROMPT: &str =
    "blurry, unrealistic, cartoon, sketch, low quality, distorted, bad proportions";

const ANALYSIS_INSTRUCTION: &str = "\
You are a professional interior designer with 20 years of experience.

TASK: Analyze this room image and describe it in detail.

Provide:
1. Room type (bedroom, living room, kitchen, etc.)
2. Current style (modern, traditional, minimalist, etc.)
3. Existing furniture and layout
4. Lighting conditions
5. Color scheme
6. Problems or areas for improvement

Be specific and detailed. Describe only what you can see in the image.

Respond with a single JSON object in exactly this format:";

const ANALYSIS_SCHEMA_EXAMPLE: &str = r#"{
  "roomType": "living room",
  "currentStyle": "modern minimalist",
  "existingItems": ["white sofa", "wooden coffee table", "floor lamp"],
  "layout": "L-shaped seating area facing window",
  "lighting": "natural light from large window, one floor lamp",
  "colorScheme": "neutral whites and beiges with wooden accents",
  "issues": ["lacks warmth", "empty wall space", "harsh lighting"]
}"#;

const SUGGESTIONS_SCHEMA_EXAMPLE: &str = r#"{
  "suggestions": [
    {
      "title": "Specific Item Name",
      "description": "Detailed, actionable description with dimensions and placement",
      "category": "layout|lighting|color|decor",
      "impact": "high|medium|low",
      "cost": "$|$$|$$$"
    }
  ]
}"#;

// ---------------------------------------------------------------------------
// Stage 1: analysis
// ---------------------------------------------------------------------------

/// Instruction sent alongside the room photo to the vision model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionPayload {
    /// Task description for the model.
    pub instruction: &'static str,
    /// Example of the JSON object the model must answer with.
    pub schema_example: &'static str,
}

impl InstructionPayload {
    /// Instruction and schema example joined into the text part of a vision
    /// request.
    pub fn render(&self) -> String {
        format!("{}\n{}", self.instruction, self.schema_example)
    }
}

/// Build the fixed instruction for the vision (analysis) stage.
pub fn build_analysis_instruction() -> InstructionPayload {
    InstructionPayload {
        instruction: ANALYSIS_INSTRUCTION,
        schema_example: ANALYSIS_SCHEMA_EXAMPLE,
    }
}

// ---------------------------------------------------------------------------
// Stage 2: suggestions
// ---------------------------------------------------------------------------

/// Build the suggestions prompt for the text model from a room analysis.
pub fn build_suggestions_prompt(analysis: &RoomAnalysis) -> String {
    format!(
        "You are a senior interior architect.

CONTEXT:
Room Analysis: {analysis}

TASK: Suggest {MIN_SUGGESTIONS}-{MAX_SUGGESTIONS} realistic improvements to enhance this space.

RULES:
1. Be SPECIFIC (not \"add art\" but \"add a 60x40 inch abstract canvas in warm earth tones\")
2. Focus on achievable changes
3. Mix budget levels (DIY to furniture purchases)
4. Target a \"Modern Warm Minimalist\" aesthetic
5. Keep the room layout similar; do not suggest major structural changes

Output ONLY valid JSON (no markdown, no extra text):
{SUGGESTIONS_SCHEMA_EXAMPLE}",
        analysis = render_analysis(analysis),
    )
}

// ---------------------------------------------------------------------------
// Stage 3: image prompt
// ---------------------------------------------------------------------------

/// Build the request asking the text model to write an image-generation
/// prompt that applies `suggestions` to the analysed room.
pub fn build_image_prompt_request<S: SuggestionText>(
    analysis: &RoomAnalysis,
    suggestions: &[S],
) -> String {
    format!(
        "You are an architectural visualization expert.

Create a detailed prompt for an AI image generator (Stable Diffusion / DALL-E).

ORIGINAL ROOM:
{analysis}

CHANGES TO APPLY:
{changes}

TASK: Write a single paragraph describing the NEW room design.

REQUIREMENTS:
- Maintain the same room layout and structure
- Incorporate ALL selected changes naturally
- Use photorealistic keywords: \"8k, architectural photography, professional interior design, soft natural lighting, highly detailed textures, realistic materials\"
- Describe a camera angle matching the original
- Keep the description under {IMAGE_PROMPT_WORD_LIMIT} words

Output format:
{{
  \"imagePrompt\": \"Your detailed prompt here\",
  \"negativePrompt\": \"{DEFAULT_NEGATIVE_PROMPT}\"
}}",
        analysis = render_analysis(analysis),
        changes = render_numbered_suggestions(suggestions),
    )
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pretty-print an analysis with a fixed key order.
///
/// Serializing a plain struct cannot fail; the fallback only exists so this
/// stays infallible.
fn render_analysis(analysis: &RoomAnalysis) -> String {
    serde_json::to_string_pretty(analysis).unwrap_or_default()
}

/// Render suggestions as `1. Title: Description` lines.
fn render_numbered_suggestions<S: SuggestionText>(suggestions: &[S]) -> String {
    let mut out = String::new();
    for (i, suggestion) in suggestions.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(
            out,
            "{}. {}: {}",
            i + 1,
            suggestion.title(),
            suggestion.description()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::{CostTier, SuggestionCategory, SuggestionDraft, SuggestionImpact};

    fn analysis() -> RoomAnalysis {
        RoomAnalysis {
            room_type: "living room".into(),
            current_style: "modern".into(),
            existing_items: vec!["grey sofa".into(), "glass table".into()],
            layout: "L-shaped".into(),
            lighting: "natural".into(),
            color_scheme: "neutral".into(),
            issues: vec!["bare walls".into()],
        }
    }

    fn draft(title: &str, description: &str) -> SuggestionDraft {
        SuggestionDraft {
            title: title.into(),
            description: description.into(),
            category: SuggestionCategory::Decor,
            impact: SuggestionImpact::Medium,
            cost: CostTier::Low,
        }
    }

    // -- analysis instruction --

    #[test]
    fn analysis_instruction_contains_schema_example() {
        let rendered = build_analysis_instruction().render();
        assert!(rendered.contains("\"roomType\""));
        assert!(rendered.contains("\"issues\""));
        assert!(rendered.starts_with("You are a professional interior designer"));
    }

    // -- suggestions prompt --

    #[test]
    fn suggestions_prompt_is_deterministic() {
        let first = build_suggestions_prompt(&analysis());
        let second = build_suggestions_prompt(&analysis().clone());
        assert_eq!(first, second);
    }

    #[test]
    fn suggestions_prompt_keeps_declared_key_order() {
        let prompt = build_suggestions_prompt(&analysis());
        let room_type = prompt.find("\"roomType\"").unwrap();
        let style = prompt.find("\"currentStyle\"").unwrap();
        let issues = prompt.find("\"issues\": [").unwrap();
        assert!(room_type < style);
        assert!(style < issues);
    }

    #[test]
    fn suggestions_prompt_requests_five_to_eight() {
        let prompt = build_suggestions_prompt(&analysis());
        assert!(prompt.contains("Suggest 5-8 realistic improvements"));
        assert!(prompt.contains("\"category\": \"layout|lighting|color|decor\""));
    }

    // -- image prompt request --

    #[test]
    fn image_prompt_request_numbers_suggestions() {
        let suggestions = vec![
            draft("Warm rug", "Add a 200x300 cm wool rug"),
            draft("Pendant light", "Hang a brass pendant over the table"),
        ];
        let prompt = build_image_prompt_request(&analysis(), &suggestions);
        assert!(prompt.contains("1. Warm rug: Add a 200x300 cm wool rug\n2. Pendant light:"));
        assert!(prompt.contains("under 400 words"));
        assert!(prompt.contains("\"negativePrompt\""));
    }

    #[test]
    fn image_prompt_request_is_idempotent() {
        let suggestions = vec![draft("Plants", "Add two tall plants by the window")];
        let first = build_image_prompt_request(&analysis(), &suggestions);
        let second = build_image_prompt_request(&analysis(), &suggestions);
        assert_eq!(first, second);
    }

    #[test]
    fn image_prompt_request_with_single_suggestion_has_no_trailing_newline() {
        let suggestions = vec![draft("Plants", "Add plants")];
        let prompt = build_image_prompt_request(&analysis(), &suggestions);
        assert!(prompt.contains("CHANGES TO APPLY:\n1. Plants: Add plants\n\nTASK:"));
    }
}
