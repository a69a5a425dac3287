use std::sync::Arc;

use roomcraft_pipeline::PipelineOrchestrator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Runs the pipeline stages; also owns the store used for reads.
    pub orchestrator: Arc<PipelineOrchestrator>,
}
