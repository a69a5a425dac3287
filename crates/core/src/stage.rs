//! Pipeline stage names and the per-project lifecycle state.

use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Pipeline step
// ---------------------------------------------------------------------------

/// One step of the redesign pipeline. Attached to every failure so the
/// boundary layer and the logs can tell which step broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Vision model describes the uploaded room photo.
    Analysis,
    /// Text model proposes redesign suggestions from the analysis.
    Suggestions,
    /// Text model turns analysis + selected suggestions into an image prompt.
    ImagePrompt,
    /// Image model renders the redesigned room.
    ImageSynthesis,
    /// Rows are written to the project store.
    Persistence,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Suggestions => "suggestions",
            Self::ImagePrompt => "image_prompt",
            Self::ImageSynthesis => "image_synthesis",
            Self::Persistence => "persistence",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Project lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of a project.
///
/// Transitions only move forward: `Created -> Analyzed -> Designed`. A failed
/// pipeline run leaves the project where it was, so the state is derived from
/// the rows that actually exist rather than stored separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStage {
    /// Image stored, no suggestions yet.
    Created,
    /// A suggestion batch has been persisted.
    Analyzed,
    /// At least one generated design has been persisted.
    Designed,
}

impl ProjectStage {
    /// Derive the stage from the number of persisted suggestions and designs.
    pub fn derive(suggestion_count: usize, design_count: usize) -> Self {
        if design_count > 0 {
            Self::Designed
        } else if suggestion_count > 0 {
            Self::Analyzed
        } else {
            Self::Created
        }
    }
}
