use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use roomcraft_core::error::CoreError;
use roomcraft_gateway::ProviderError;
use roomcraft_pipeline::error::ErrorKind;
use roomcraft_pipeline::{PipelineError, StoreError};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`], [`PipelineError`] and request-body validation
/// failures. Implements [`IntoResponse`] to produce consistent JSON error
/// responses; details of upstream and storage failures are logged, never
/// returned.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `roomcraft_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failed pipeline run or store lookup.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A request body that failed field validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type Classified = (StatusCode, &'static str, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Pipeline(err) => classify_pipeline_error(err),
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                errors.to_string(),
            ),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> Classified {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn classify_core_error(err: &CoreError) -> Classified {
    match err {
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
    }
}

/// Map a pipeline failure to a response.
///
/// Caller faults keep their message. Model and provider failures become a
/// generic 502 whose code names the failure kind.
fn classify_pipeline_error(err: &PipelineError) -> Classified {
    let stage = err.stage().map(|s| s.as_str()).unwrap_or("none");
    match err.kind() {
        ErrorKind::Input => (StatusCode::BAD_REQUEST, "INVALID_INPUT", input_message(err)),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT", conflict_message(err)),
        ErrorKind::Extraction => {
            tracing::warn!(stage, error = %err, "Model reply held no usable JSON");
            bad_gateway("EXTRACTION_FAILED", "The model reply could not be interpreted")
        }
        ErrorKind::Validation => {
            tracing::warn!(stage, error = %err, "Model reply failed schema validation");
            bad_gateway("MODEL_OUTPUT_INVALID", "The model reply had an unexpected shape")
        }
        ErrorKind::Provider => {
            tracing::error!(stage, error = %err, "Model provider call failed");
            match err {
                PipelineError::Provider {
                    source: ProviderError::ContentPolicy { .. },
                    ..
                } => bad_gateway(
                    "CONTENT_REJECTED",
                    "The model provider rejected the request under its content policy",
                ),
                _ => bad_gateway("UPSTREAM_ERROR", "A model provider call failed"),
            }
        }
        ErrorKind::Store => match err {
            PipelineError::Store {
                source: StoreError::Database(db_err),
                ..
            } => classify_sqlx_error(db_err),
            _ => {
                tracing::error!(stage, error = %err, "Store operation failed");
                internal()
            }
        },
    }
}

fn bad_gateway(code: &'static str, message: &str) -> Classified {
    (StatusCode::BAD_GATEWAY, code, message.to_string())
}

fn input_message(err: &PipelineError) -> String {
    match err {
        PipelineError::Input(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn conflict_message(err: &PipelineError) -> String {
    match err {
        PipelineError::Store {
            source: StoreError::Conflict(msg),
            ..
        } => msg.clone(),
        other => other.to_string(),
    }
}

/// Database failures carry driver detail; only the log sees it.
fn classify_sqlx_error(err: &sqlx::Error) -> Classified {
    match err {
        sqlx::Error::Database(db_err) => {
            tracing::error!(
                error = %db_err,
                constraint = db_err.constraint().unwrap_or("none"),
                "Database error"
            );
        }
        other => tracing::error!(error = %other, "Database error"),
    }
    internal()
}
