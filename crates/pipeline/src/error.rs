use roomcraft_core::extraction::ExtractError;
use roomcraft_core::stage::Stage;
use roomcraft_core::types::DbId;
use roomcraft_gateway::ProviderError;

/// Failure of a [`ProjectStore`](crate::store::ProjectStore) operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The write would violate a once-only rule (e.g. a second suggestion
    /// batch for the same project).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The project a write refers to does not exist.
    #[error("Project {0} does not exist")]
    ProjectMissing(DbId),
}

/// Failure of a pipeline run, tagged with the stage it happened in where
/// one applies.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The request was rejected before any external call.
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// A model reply held no usable JSON object, or one that failed the
    /// stage's schema.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("{stage}: {source}")]
    Provider {
        stage: Stage,
        #[source]
        source: ProviderError,
    },

    #[error("{stage}: {source}")]
    Store {
        stage: Stage,
        #[source]
        source: StoreError,
    },

    /// A spawned model call could not be joined.
    #[error("{stage}: model call task failed: {detail}")]
    Task { stage: Stage, detail: String },
}

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    NotFound,
    Extraction,
    Validation,
    Provider,
    Conflict,
    Store,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(_) => ErrorKind::Input,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Extract(ExtractError::Extraction { .. }) => ErrorKind::Extraction,
            Self::Extract(ExtractError::Validation { .. }) => ErrorKind::Validation,
            Self::Provider { .. } | Self::Task { .. } => ErrorKind::Provider,
            Self::Store {
                source: StoreError::Conflict(_),
                ..
            } => ErrorKind::Conflict,
            Self::Store { .. } => ErrorKind::Store,
        }
    }

    /// The stage the failure occurred in. `None` for failures raised before
    /// any stage ran.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Input(_) | Self::NotFound { .. } => None,
            Self::Extract(e) => Some(e.stage()),
            Self::Provider { stage, .. } | Self::Store { stage, .. } | Self::Task { stage, .. } => {
                Some(*stage)
            }
        }
    }

    /// Map a store failure, turning a missing project into [`Self::NotFound`].
    pub(crate) fn store(stage: Stage) -> impl FnOnce(StoreError) -> Self {
        move |source| match source {
            StoreError::ProjectMissing(id) => Self::NotFound {
                entity: "Project",
                id,
            },
            source => Self::Store { stage, source },
        }
    }
}
