//! Sequencing of the analysis, suggestion and design-synthesis stages.
//!
//! Each stage is one model call followed by extraction of that stage's
//! structured value. Stages within a run are strictly sequential and all
//! writes happen in single store operations after the external calls they
//! depend on have succeeded.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use roomcraft_core::extraction::extract;
use roomcraft_core::prompts::{
    build_analysis_instruction, build_image_prompt_request, build_suggestions_prompt,
};
use roomcraft_core::room::{ImagePrompt, RoomAnalysis, SuggestionSet};
use roomcraft_core::stage::Stage;
use roomcraft_core::types::DbId;
use roomcraft_db::models::generated_design::GeneratedDesign;
use roomcraft_db::models::project::{Project, ProjectDetail};
use roomcraft_gateway::{ImageOptions, ImageRequest, ModelGateway, ProviderError};

use crate::error::PipelineError;
use crate::retry::RetryPolicy;
use crate::store::ProjectStore;

/// Most sequential model calls any single run makes (design synthesis:
/// analysis, image prompt, image).
pub const MAX_MODEL_CALLS_PER_RUN: u32 = 3;

/// Result of [`PipelineOrchestrator::run_analysis_and_suggest`].
#[derive(Debug)]
pub struct AnalysisOutcome {
    /// The new project with its persisted suggestions.
    pub project: ProjectDetail,
    /// The analysis the suggestions were derived from. Not persisted.
    pub analysis: RoomAnalysis,
}

/// Input of [`PipelineOrchestrator::run_design_synthesis`].
#[derive(Debug, Clone)]
pub struct DesignRequest {
    pub project_id: DbId,
    pub selected_suggestion_ids: Vec<DbId>,
    /// Image re-analysed to ground the design prompt.
    pub image_url_for_analysis: String,
    /// When set, the project must belong to this user.
    pub user_id: Option<DbId>,
}

/// Drives pipeline runs against a [`ModelGateway`] and a [`ProjectStore`].
pub struct PipelineOrchestrator {
    gateway: Arc<dyn ModelGateway>,
    store: Arc<dyn ProjectStore>,
    retry: RetryPolicy,
    image_options: ImageOptions,
}

impl PipelineOrchestrator {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        store: Arc<dyn ProjectStore>,
        retry: RetryPolicy,
        image_options: ImageOptions,
    ) -> Self {
        Self {
            gateway,
            store,
            retry,
            image_options,
        }
    }

    /// Longest a run can take when every call times out and is retried to
    /// the policy's limit.
    pub fn worst_case_run(retry: &RetryPolicy, call_timeout: Duration) -> Duration {
        retry.worst_case(call_timeout) * MAX_MODEL_CALLS_PER_RUN
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Create a project for `image_url`, analyse the image and persist the
    /// suggested changes.
    ///
    /// On failure after creation the project stays in the `created` stage
    /// with no suggestions.
    pub async fn run_analysis_and_suggest(
        &self,
        image_url: &str,
        user_id: Option<DbId>,
    ) -> Result<AnalysisOutcome, PipelineError> {
        let project = self
            .store
            .create_project(image_url, user_id)
            .await
            .map_err(PipelineError::store(Stage::Persistence))?;
        let project_id = project.id;
        tracing::info!(project_id, "Project created");

        let analysis = self.analyze_room(project_id, image_url).await?;

        let prompt = build_suggestions_prompt(&analysis);
        let reply = self
            .call_model(project_id, Stage::Suggestions, move |gateway| {
                let prompt = prompt.clone();
                async move { gateway.text_to_text(&prompt).await }
            })
            .await?;
        let set: SuggestionSet = extract(&reply)?;
        tracing::debug!(
            project_id,
            suggestion_count = set.suggestions.len(),
            "Suggestions extracted",
        );

        let suggestions = self
            .store
            .insert_suggestion_batch(project_id, &set.suggestions)
            .await
            .map_err(PipelineError::store(Stage::Persistence))?;
        tracing::info!(
            project_id,
            suggestion_count = suggestions.len(),
            "Project analysed",
        );

        Ok(AnalysisOutcome {
            project: ProjectDetail::new(project, suggestions, Vec::new()),
            analysis,
        })
    }

    /// Render a redesign applying the selected suggestions and record it.
    ///
    /// The selection is checked before any model call: it must be
    /// non-empty and every id must be a suggestion of the project.
    pub async fn run_design_synthesis(
        &self,
        request: DesignRequest,
    ) -> Result<GeneratedDesign, PipelineError> {
        let project_id = request.project_id;
        let ids = dedup_ids(&request.selected_suggestion_ids);
        if ids.is_empty() {
            return Err(PipelineError::Input(
                "at least one suggestion must be selected".to_string(),
            ));
        }
        if request.image_url_for_analysis.trim().is_empty() {
            return Err(PipelineError::Input(
                "an image reference is required".to_string(),
            ));
        }

        let detail = self
            .store
            .find_project_with_suggestion_subset(project_id, &ids)
            .await
            .map_err(PipelineError::store(Stage::Persistence))?
            .filter(|d| request.user_id.is_none() || d.project.user_id == request.user_id)
            .ok_or(PipelineError::NotFound {
                entity: "Project",
                id: project_id,
            })?;

        let found: HashSet<DbId> = detail.suggestions.iter().map(|s| s.id).collect();
        if let Some(&missing) = ids.iter().find(|id| !found.contains(id)) {
            return Err(PipelineError::NotFound {
                entity: "Suggestion",
                id: missing,
            });
        }

        let analysis = self
            .analyze_room(project_id, &request.image_url_for_analysis)
            .await?;

        let prompt = build_image_prompt_request(&analysis, &detail.suggestions);
        let reply = self
            .call_model(project_id, Stage::ImagePrompt, move |gateway| {
                let prompt = prompt.clone();
                async move { gateway.text_to_text(&prompt).await }
            })
            .await?;
        let image_prompt: ImagePrompt = extract(&reply)?;

        let image_request = ImageRequest {
            prompt: image_prompt.image_prompt.clone(),
            negative_prompt: image_prompt.negative_prompt,
            options: self.image_options.clone(),
        };
        let images = self
            .call_model(project_id, Stage::ImageSynthesis, move |gateway| {
                let request = image_request.clone();
                async move { gateway.text_to_image(&request).await }
            })
            .await?;
        let image_url = images
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::Provider {
                stage: Stage::ImageSynthesis,
                source: ProviderError::Malformed {
                    provider: "gateway",
                    detail: "image model returned no images".to_string(),
                },
            })?;

        let design = self
            .store
            .record_design(project_id, &image_url, &image_prompt.image_prompt, &ids)
            .await
            .map_err(PipelineError::store(Stage::Persistence))?;
        tracing::info!(
            project_id,
            design_id = design.id,
            suggestion_count = ids.len(),
            "Design generated",
        );
        Ok(design)
    }

    /// A project with all its suggestions and its designs newest first.
    pub async fn get_project_detail(
        &self,
        project_id: DbId,
        user_id: DbId,
    ) -> Result<ProjectDetail, PipelineError> {
        self.store
            .find_project(project_id, Some(user_id))
            .await
            .map_err(PipelineError::store(Stage::Persistence))?
            .ok_or(PipelineError::NotFound {
                entity: "Project",
                id: project_id,
            })
    }

    /// A user's projects, newest first.
    pub async fn list_projects(&self, user_id: DbId) -> Result<Vec<Project>, PipelineError> {
        self.store
            .list_projects_for_user(user_id)
            .await
            .map_err(PipelineError::store(Stage::Persistence))
    }

    /// Whether the backing store answers.
    pub async fn store_healthy(&self) -> bool {
        match self.store.health_check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Store health check failed");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    async fn analyze_room(
        &self,
        project_id: DbId,
        image_url: &str,
    ) -> Result<RoomAnalysis, PipelineError> {
        let instruction = build_analysis_instruction().render();
        let image_url = image_url.to_string();
        let reply = self
            .call_model(project_id, Stage::Analysis, move |gateway| {
                let image_url = image_url.clone();
                let instruction = instruction.clone();
                async move { gateway.vision_to_text(&image_url, &instruction).await }
            })
            .await?;
        let analysis: RoomAnalysis = extract(&reply)?;
        tracing::debug!(project_id, room_type = %analysis.room_type, "Room analysed");
        Ok(analysis)
    }

    /// Run one model call under the retry policy.
    ///
    /// Every attempt is spawned as its own task, so dropping the caller's
    /// future lets an in-flight provider call finish; its result is then
    /// discarded.
    async fn call_model<T, F, Fut>(
        &self,
        project_id: DbId,
        stage: Stage,
        make_call: F,
    ) -> Result<T, PipelineError>
    where
        F: Fn(Arc<dyn ModelGateway>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>> + Send + 'static,
        T: Send + 'static,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let handle = tokio::spawn(make_call(Arc::clone(&self.gateway)));
            let result = handle.await.map_err(|e| PipelineError::Task {
                stage,
                detail: e.to_string(),
            })?;

            match result {
                Ok(value) => return Ok(value),
                Err(e) if self.retry.should_retry(attempt, &e) => {
                    let delay = self.retry.delay_after(attempt);
                    tracing::warn!(
                        project_id,
                        %stage,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Model call failed, retrying",
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(source) => {
                    tracing::error!(project_id, %stage, attempt, error = %source, "Model call failed");
                    return Err(PipelineError::Provider { stage, source });
                }
            }
        }
    }
}

/// Drop repeated ids, keeping first occurrences in order.
fn dedup_ids(ids: &[DbId]) -> Vec<DbId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
