//! In-process stand-ins for the store and the gateway, for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use roomcraft_core::room::SuggestionDraft;
use roomcraft_core::types::DbId;
use roomcraft_db::models::generated_design::GeneratedDesign;
use roomcraft_db::models::project::{Project, ProjectDetail};
use roomcraft_db::models::suggestion::Suggestion;
use roomcraft_gateway::{ImageRequest, ModelGateway, ProviderError};

use crate::error::StoreError;
use crate::store::ProjectStore;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryState {
    next_id: DbId,
    projects: Vec<Project>,
    batched: Vec<DbId>,
    suggestions: Vec<Suggestion>,
    designs: Vec<GeneratedDesign>,
    healthy_override: Option<bool>,
}

impl MemoryState {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn project(&self, id: DbId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    fn designs_newest_first(&self, project_id: DbId) -> Vec<GeneratedDesign> {
        let mut designs: Vec<_> = self
            .designs
            .iter()
            .filter(|d| d.project_id == project_id)
            .cloned()
            .collect();
        designs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        designs
    }

    fn insert_design(&mut self, project_id: DbId, image_url: &str, prompt: &str) -> GeneratedDesign {
        let design = GeneratedDesign {
            id: self.next_id(),
            project_id,
            image_url: image_url.to_string(),
            prompt: prompt.to_string(),
            created_at: Utc::now(),
        };
        self.designs.push(design.clone());
        design
    }

    fn mark_selected(&mut self, project_id: DbId, ids: &[DbId]) -> u64 {
        let mut matched = 0;
        for s in self
            .suggestions
            .iter_mut()
            .filter(|s| s.project_id == project_id && ids.contains(&s.id))
        {
            s.is_selected = true;
            matched += 1;
        }
        matched
    }
}

/// [`ProjectStore`] held in memory, with the same atomicity and ordering
/// guarantees as the Postgres store.
#[derive(Default)]
pub struct InMemoryProjectStore {
    state: Mutex<MemoryState>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every suggestion of a project, in insertion order.
    pub fn suggestions_of(&self, project_id: DbId) -> Vec<Suggestion> {
        let state = self.state.lock().unwrap();
        state
            .suggestions
            .iter()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect()
    }

    /// Every design of a project, newest first.
    pub fn designs_of(&self, project_id: DbId) -> Vec<GeneratedDesign> {
        self.state.lock().unwrap().designs_newest_first(project_id)
    }

    /// Make [`ProjectStore::health_check`] fail.
    pub fn set_unhealthy(&self) {
        self.state.lock().unwrap().healthy_override = Some(false);
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn create_project(
        &self,
        image_url: &str,
        user_id: Option<DbId>,
    ) -> Result<Project, StoreError> {
        let mut state = self.state.lock().unwrap();
        let project = Project {
            id: state.next_id(),
            image_url: image_url.to_string(),
            user_id,
            created_at: Utc::now(),
        };
        state.projects.push(project.clone());
        Ok(project)
    }

    async fn insert_suggestion_batch(
        &self,
        project_id: DbId,
        drafts: &[SuggestionDraft],
    ) -> Result<Vec<Suggestion>, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.project(project_id).is_none() {
            return Err(StoreError::ProjectMissing(project_id));
        }
        if state.batched.contains(&project_id) {
            return Err(StoreError::Conflict(format!(
                "Project {project_id} already has suggestions"
            )));
        }
        state.batched.push(project_id);

        let mut rows = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let row = Suggestion {
                id: state.next_id(),
                project_id,
                title: draft.title.clone(),
                description: draft.description.clone(),
                category: draft.category,
                impact: draft.impact,
                cost: draft.cost,
                is_selected: false,
                created_at: Utc::now(),
            };
            state.suggestions.push(row.clone());
            rows.push(row);
        }
        Ok(rows)
    }

    async fn find_project(
        &self,
        id: DbId,
        user_id: Option<DbId>,
    ) -> Result<Option<ProjectDetail>, StoreError> {
        let state = self.state.lock().unwrap();
        let Some(project) = state
            .project(id)
            .filter(|p| user_id.is_none() || p.user_id == user_id)
            .cloned()
        else {
            return Ok(None);
        };
        let suggestions = state
            .suggestions
            .iter()
            .filter(|s| s.project_id == id)
            .cloned()
            .collect();
        let designs = state.designs_newest_first(id);
        Ok(Some(ProjectDetail::new(project, suggestions, designs)))
    }

    async fn find_project_with_suggestion_subset(
        &self,
        id: DbId,
        suggestion_ids: &[DbId],
    ) -> Result<Option<ProjectDetail>, StoreError> {
        let state = self.state.lock().unwrap();
        let Some(project) = state.project(id).cloned() else {
            return Ok(None);
        };
        let suggestions = state
            .suggestions
            .iter()
            .filter(|s| s.project_id == id && suggestion_ids.contains(&s.id))
            .cloned()
            .collect();
        let designs = state.designs_newest_first(id);
        Ok(Some(ProjectDetail::new(project, suggestions, designs)))
    }

    async fn insert_generated_design(
        &self,
        project_id: DbId,
        image_url: &str,
        prompt: &str,
    ) -> Result<GeneratedDesign, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.project(project_id).is_none() {
            return Err(StoreError::ProjectMissing(project_id));
        }
        Ok(state.insert_design(project_id, image_url, prompt))
    }

    async fn mark_suggestions_selected(
        &self,
        project_id: DbId,
        suggestion_ids: &[DbId],
    ) -> Result<u64, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .mark_selected(project_id, suggestion_ids))
    }

    async fn record_design(
        &self,
        project_id: DbId,
        image_url: &str,
        prompt: &str,
        suggestion_ids: &[DbId],
    ) -> Result<GeneratedDesign, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.project(project_id).is_none() {
            return Err(StoreError::ProjectMissing(project_id));
        }
        let design = state.insert_design(project_id, image_url, prompt);
        state.mark_selected(project_id, suggestion_ids);
        Ok(design)
    }

    async fn list_projects_for_user(&self, user_id: DbId) -> Result<Vec<Project>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut projects: Vec<_> = state
            .projects
            .iter()
            .filter(|p| p.user_id == Some(user_id))
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(projects)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        match self.state.lock().unwrap().healthy_override {
            Some(false) => Err(StoreError::Database(sqlx::Error::PoolClosed)),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Script {
    vision: VecDeque<Result<String, ProviderError>>,
    text: VecDeque<Result<String, ProviderError>>,
    image: VecDeque<Result<Vec<String>, ProviderError>>,
    vision_calls: Vec<(String, String)>,
    text_calls: Vec<String>,
    image_calls: Vec<ImageRequest>,
}

/// [`ModelGateway`] that answers from queued replies and records every call.
///
/// A call with nothing queued for its role fails with
/// [`ProviderError::Malformed`], which is never retried.
#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<Script>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_vision(&self, reply: Result<String, ProviderError>) -> &Self {
        self.script.lock().unwrap().vision.push_back(reply);
        self
    }

    pub fn push_text(&self, reply: Result<String, ProviderError>) -> &Self {
        self.script.lock().unwrap().text.push_back(reply);
        self
    }

    pub fn push_image(&self, reply: Result<Vec<String>, ProviderError>) -> &Self {
        self.script.lock().unwrap().image.push_back(reply);
        self
    }

    /// Total calls made across all three roles.
    pub fn call_count(&self) -> usize {
        let script = self.script.lock().unwrap();
        script.vision_calls.len() + script.text_calls.len() + script.image_calls.len()
    }

    /// `(image_url, instruction)` of every vision call.
    pub fn vision_calls(&self) -> Vec<(String, String)> {
        self.script.lock().unwrap().vision_calls.clone()
    }

    pub fn text_calls(&self) -> Vec<String> {
        self.script.lock().unwrap().text_calls.clone()
    }

    pub fn image_calls(&self) -> Vec<ImageRequest> {
        self.script.lock().unwrap().image_calls.clone()
    }
}

fn unscripted(role: &str) -> ProviderError {
    ProviderError::Malformed {
        provider: "scripted",
        detail: format!("no scripted {role} reply"),
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn vision_to_text(
        &self,
        image_url: &str,
        instruction: &str,
    ) -> Result<String, ProviderError> {
        let mut script = self.script.lock().unwrap();
        script
            .vision_calls
            .push((image_url.to_string(), instruction.to_string()));
        script
            .vision
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("vision")))
    }

    async fn text_to_text(&self, prompt: &str) -> Result<String, ProviderError> {
        let mut script = self.script.lock().unwrap();
        script.text_calls.push(prompt.to_string());
        script
            .text
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("text")))
    }

    async fn text_to_image(&self, request: &ImageRequest) -> Result<Vec<String>, ProviderError> {
        let mut script = self.script.lock().unwrap();
        script.image_calls.push(request.clone());
        script
            .image
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("image")))
    }
}
