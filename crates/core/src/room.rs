//! Room analysis and redesign suggestion value types.
//!
//! These are the shapes the text and vision models are asked to produce.
//! Field names on the wire are camelCase because that is what the prompts
//! show the models; the Rust side stays snake_case.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Room analysis
// ---------------------------------------------------------------------------

/// Structured description of a room, produced by the vision stage.
///
/// Never persisted. Field declaration order is the serialization order, which
/// keeps prompts built from an analysis byte-for-byte reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAnalysis {
    pub room_type: String,
    pub current_style: String,
    pub existing_items: Vec<String>,
    pub layout: String,
    pub lighting: String,
    pub color_scheme: String,
    pub issues: Vec<String>,
}

// ---------------------------------------------------------------------------
// Suggestion enums
// ---------------------------------------------------------------------------

/// What aspect of the room a suggestion changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionCategory {
    Layout,
    Lighting,
    Color,
    Decor,
}

impl SuggestionCategory {
    /// Accepted wire values, in prompt order.
    pub const VALUES: &'static [&'static str] = &["layout", "lighting", "color", "decor"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Layout => "layout",
            Self::Lighting => "lighting",
            Self::Color => "color",
            Self::Decor => "decor",
        }
    }
}

impl TryFrom<String> for SuggestionCategory {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "layout" => Ok(Self::Layout),
            "lighting" => Ok(Self::Lighting),
            "color" => Ok(Self::Color),
            "decor" => Ok(Self::Decor),
            other => Err(CoreError::Validation(format!(
                "Unknown suggestion category '{other}'"
            ))),
        }
    }
}

/// Expected visual impact of a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionImpact {
    High,
    Medium,
    Low,
}

impl SuggestionImpact {
    pub const VALUES: &'static [&'static str] = &["high", "medium", "low"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl TryFrom<String> for SuggestionImpact {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(CoreError::Validation(format!(
                "Unknown suggestion impact '{other}'"
            ))),
        }
    }
}

/// Rough budget bracket, rendered as dollar signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CostTier {
    #[serde(rename = "$")]
    Low,
    #[serde(rename = "$$")]
    Medium,
    #[serde(rename = "$$$")]
    High,
}

impl CostTier {
    pub const VALUES: &'static [&'static str] = &["$", "$$", "$$$"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "$",
            Self::Medium => "$$",
            Self::High => "$$$",
        }
    }
}

impl TryFrom<String> for CostTier {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "$" => Ok(Self::Low),
            "$$" => Ok(Self::Medium),
            "$$$" => Ok(Self::High),
            other => Err(CoreError::Validation(format!("Unknown cost tier '{other}'"))),
        }
    }
}

impl fmt::Display for CostTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Suggestion drafts
// ---------------------------------------------------------------------------

/// A suggestion as produced by the text model, before it has a row id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionDraft {
    pub title: String,
    pub description: String,
    pub category: SuggestionCategory,
    pub impact: SuggestionImpact,
    pub cost: CostTier,
}

/// Top-level object of the suggestions stage reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SuggestionSet {
    pub suggestions: Vec<SuggestionDraft>,
}

/// Minimal view of a suggestion needed to describe it to the image-prompt
/// stage. Implemented by persisted suggestion rows and by drafts.
pub trait SuggestionText {
    fn title(&self) -> &str;
    fn description(&self) -> &str;
}

impl SuggestionText for SuggestionDraft {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }
}

// ---------------------------------------------------------------------------
// Image prompt
// ---------------------------------------------------------------------------

/// Reply of the image-prompt stage: the text handed to the image model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePrompt {
    pub image_prompt: String,
    pub negative_prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_analysis_uses_camel_case_keys() {
        let analysis = RoomAnalysis {
            room_type: "bedroom".into(),
            current_style: "rustic".into(),
            existing_items: vec!["bed".into()],
            layout: "square".into(),
            lighting: "dim".into(),
            color_scheme: "brown".into(),
            issues: vec![],
        };
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["roomType"], "bedroom");
        assert_eq!(json["colorScheme"], "brown");
        assert!(json.get("room_type").is_none());
    }

    #[test]
    fn cost_tier_round_trips_dollar_signs() {
        let tier: CostTier = serde_json::from_str("\"$$\"").unwrap();
        assert_eq!(tier, CostTier::Medium);
        assert_eq!(serde_json::to_string(&CostTier::High).unwrap(), "\"$$$\"");
    }

    #[test]
    fn enum_try_from_rejects_unknown_values() {
        assert!(SuggestionCategory::try_from("furniture".to_string()).is_err());
        assert!(SuggestionImpact::try_from("HIGH".to_string()).is_err());
        assert!(CostTier::try_from("$$$$".to_string()).is_err());
    }

    #[test]
    fn enum_values_match_as_str() {
        for value in SuggestionCategory::VALUES {
            let parsed = SuggestionCategory::try_from(value.to_string()).unwrap();
            assert_eq!(parsed.as_str(), *value);
        }
        for value in CostTier::VALUES {
            let parsed = CostTier::try_from(value.to_string()).unwrap();
            assert_eq!(parsed.as_str(), *value);
        }
    }
}
