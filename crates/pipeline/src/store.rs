//! Persistence seam of the pipeline.

use async_trait::async_trait;
use roomcraft_core::room::SuggestionDraft;
use roomcraft_core::types::DbId;
use roomcraft_db::models::generated_design::GeneratedDesign;
use roomcraft_db::models::project::{CreateProject, Project, ProjectDetail};
use roomcraft_db::models::suggestion::Suggestion;
use roomcraft_db::repositories::{BatchInsert, GeneratedDesignRepo, ProjectRepo, SuggestionRepo};
use roomcraft_db::DbPool;

use crate::error::StoreError;

/// Storage operations the orchestrator depends on.
///
/// Every multi-row write is atomic: it either fully happens or leaves no
/// trace.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create_project(
        &self,
        image_url: &str,
        user_id: Option<DbId>,
    ) -> Result<Project, StoreError>;

    /// Persist a project's suggestion batch. A project gets at most one
    /// batch; a second one fails with [`StoreError::Conflict`].
    async fn insert_suggestion_batch(
        &self,
        project_id: DbId,
        drafts: &[SuggestionDraft],
    ) -> Result<Vec<Suggestion>, StoreError>;

    /// Load a project with all suggestions and designs (newest first).
    /// With `user_id`, projects owned by someone else are treated as absent.
    async fn find_project(
        &self,
        id: DbId,
        user_id: Option<DbId>,
    ) -> Result<Option<ProjectDetail>, StoreError>;

    /// Load a project with only the suggestions whose ids are listed.
    /// Ids of other projects' suggestions are left out of the result.
    async fn find_project_with_suggestion_subset(
        &self,
        id: DbId,
        suggestion_ids: &[DbId],
    ) -> Result<Option<ProjectDetail>, StoreError>;

    async fn insert_generated_design(
        &self,
        project_id: DbId,
        image_url: &str,
        prompt: &str,
    ) -> Result<GeneratedDesign, StoreError>;

    /// Flag the given suggestions of a project as selected. Returns the
    /// number of suggestions matched.
    async fn mark_suggestions_selected(
        &self,
        project_id: DbId,
        suggestion_ids: &[DbId],
    ) -> Result<u64, StoreError>;

    /// [`Self::insert_generated_design`] and
    /// [`Self::mark_suggestions_selected`] as one atomic write.
    async fn record_design(
        &self,
        project_id: DbId,
        image_url: &str,
        prompt: &str,
        suggestion_ids: &[DbId],
    ) -> Result<GeneratedDesign, StoreError>;

    /// A user's projects, newest first.
    async fn list_projects_for_user(&self, user_id: DbId) -> Result<Vec<Project>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// [`ProjectStore`] over the Postgres repositories.
#[derive(Clone)]
pub struct PgProjectStore {
    pool: DbPool,
}

impl PgProjectStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn detail_with(
        &self,
        project: Project,
        suggestions: Vec<Suggestion>,
    ) -> Result<ProjectDetail, StoreError> {
        let designs = GeneratedDesignRepo::list_by_project(&self.pool, project.id).await?;
        Ok(ProjectDetail::new(project, suggestions, designs))
    }
}

#[async_trait]
impl ProjectStore for PgProjectStore {
    async fn create_project(
        &self,
        image_url: &str,
        user_id: Option<DbId>,
    ) -> Result<Project, StoreError> {
        let input = CreateProject {
            image_url: image_url.to_string(),
            user_id,
        };
        Ok(ProjectRepo::create(&self.pool, &input).await?)
    }

    async fn insert_suggestion_batch(
        &self,
        project_id: DbId,
        drafts: &[SuggestionDraft],
    ) -> Result<Vec<Suggestion>, StoreError> {
        match SuggestionRepo::insert_batch(&self.pool, project_id, drafts).await? {
            BatchInsert::Inserted(rows) => Ok(rows),
            BatchInsert::AlreadyPresent => Err(StoreError::Conflict(format!(
                "Project {project_id} already has suggestions"
            ))),
            BatchInsert::ProjectMissing => Err(StoreError::ProjectMissing(project_id)),
        }
    }

    async fn find_project(
        &self,
        id: DbId,
        user_id: Option<DbId>,
    ) -> Result<Option<ProjectDetail>, StoreError> {
        let project = match user_id {
            Some(user_id) => ProjectRepo::find_owned(&self.pool, id, user_id).await?,
            None => ProjectRepo::find_by_id(&self.pool, id).await?,
        };
        let Some(project) = project else {
            return Ok(None);
        };
        let suggestions = SuggestionRepo::list_by_project(&self.pool, id).await?;
        self.detail_with(project, suggestions).await.map(Some)
    }

    async fn find_project_with_suggestion_subset(
        &self,
        id: DbId,
        suggestion_ids: &[DbId],
    ) -> Result<Option<ProjectDetail>, StoreError> {
        let Some(project) = ProjectRepo::find_by_id(&self.pool, id).await? else {
            return Ok(None);
        };
        let suggestions = SuggestionRepo::list_subset(&self.pool, id, suggestion_ids).await?;
        self.detail_with(project, suggestions).await.map(Some)
    }

    async fn insert_generated_design(
        &self,
        project_id: DbId,
        image_url: &str,
        prompt: &str,
    ) -> Result<GeneratedDesign, StoreError> {
        Ok(GeneratedDesignRepo::create(&self.pool, project_id, image_url, prompt).await?)
    }

    async fn mark_suggestions_selected(
        &self,
        project_id: DbId,
        suggestion_ids: &[DbId],
    ) -> Result<u64, StoreError> {
        Ok(SuggestionRepo::mark_selected(&self.pool, project_id, suggestion_ids).await?)
    }

    async fn record_design(
        &self,
        project_id: DbId,
        image_url: &str,
        prompt: &str,
        suggestion_ids: &[DbId],
    ) -> Result<GeneratedDesign, StoreError> {
        Ok(GeneratedDesignRepo::create_with_selection(
            &self.pool,
            project_id,
            image_url,
            prompt,
            suggestion_ids,
        )
        .await?)
    }

    async fn list_projects_for_user(&self, user_id: DbId) -> Result<Vec<Project>, StoreError> {
        Ok(ProjectRepo::list_for_user(&self.pool, user_id).await?)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(roomcraft_db::health_check(&self.pool).await?)
    }
}
