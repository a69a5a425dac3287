//! Project entity model and DTOs.

use roomcraft_core::stage::ProjectStage;
use roomcraft_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::generated_design::GeneratedDesign;
use crate::models::suggestion::Suggestion;

/// A project row from the `projects` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub image_url: String,
    /// `None` for projects created without an authenticated caller.
    pub user_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// DTO for creating a new project.
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub image_url: String,
    pub user_id: Option<DbId>,
}

/// A project together with its owned collections.
///
/// `designs` are ordered newest-first. `suggestions` may be the full set or
/// a subset, depending on how the detail was loaded.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub stage: ProjectStage,
    pub suggestions: Vec<Suggestion>,
    pub designs: Vec<GeneratedDesign>,
}

impl ProjectDetail {
    /// Assemble a detail view, deriving the lifecycle stage from the rows.
    pub fn new(
        project: Project,
        suggestions: Vec<Suggestion>,
        designs: Vec<GeneratedDesign>,
    ) -> Self {
        let stage = ProjectStage::derive(suggestions.len(), designs.len());
        Self {
            project,
            stage,
            suggestions,
            designs,
        }
    }
}
