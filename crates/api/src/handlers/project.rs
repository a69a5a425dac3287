//! Handlers for the `/projects` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use roomcraft_core::room::RoomAnalysis;
use roomcraft_core::types::DbId;
use roomcraft_db::models::generated_design::GeneratedDesign;
use roomcraft_db::models::project::{Project, ProjectDetail};
use roomcraft_pipeline::DesignRequest;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

/// Body of `POST /projects`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[validate(url(message = "imageUrl must be a valid URL"))]
    pub image_url: String,
}

/// Body of `POST /projects/{id}/designs`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateDesignRequest {
    #[validate(length(min = 1, message = "at least one suggestion must be selected"))]
    pub selected_suggestion_ids: Vec<DbId>,
    /// Image re-analysed to ground the design; usually the project's upload.
    #[serde(alias = "imageUrlinput")]
    #[validate(url(message = "imageUrl must be a valid URL"))]
    pub image_url: String,
}

/// Response of `POST /projects`.
#[derive(Debug, Serialize)]
pub struct CreatedProject {
    pub project: ProjectDetail,
    /// The analysis the suggestions came from; not stored.
    pub analysis: RoomAnalysis,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/projects
///
/// Create a project from an uploaded image, analyse it and return the
/// suggested changes.
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<CreatedProject>>)> {
    input.validate()?;

    let outcome = state
        .orchestrator
        .run_analysis_and_suggest(&input.image_url, Some(user.user_id))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CreatedProject {
                project: outcome.project,
                analysis: outcome.analysis,
            },
        }),
    ))
}

/// POST /api/v1/projects/{id}/designs
pub async fn generate_design(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<GenerateDesignRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<GeneratedDesign>>)> {
    input.validate()?;

    let design = state
        .orchestrator
        .run_design_synthesis(DesignRequest {
            project_id: id,
            selected_suggestion_ids: input.selected_suggestion_ids,
            image_url_for_analysis: input.image_url,
            user_id: Some(user.user_id),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: design })))
}

/// GET /api/v1/projects/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProjectDetail>>> {
    let detail = state
        .orchestrator
        .get_project_detail(id, user.user_id)
        .await?;
    Ok(Json(DataResponse { data: detail }))
}

/// GET /api/v1/projects
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Project>>>> {
    let projects = state.orchestrator.list_projects(user.user_id).await?;
    Ok(Json(DataResponse { data: projects }))
}
