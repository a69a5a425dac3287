//! The room-redesign pipeline: analysis, suggestions and design synthesis.
//!
//! [`PipelineOrchestrator`] sequences the model calls, extracts each stage's
//! structured result and persists through a [`ProjectStore`]. It owns no
//! mutable state of its own; concurrent runs coordinate through the store.

pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{PipelineError, StoreError};
pub use orchestrator::{
    AnalysisOutcome, DesignRequest, PipelineOrchestrator, MAX_MODEL_CALLS_PER_RUN,
};
pub use retry::RetryPolicy;
pub use store::{PgProjectStore, ProjectStore};
