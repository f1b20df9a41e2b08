use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use casewatch::PipelineError;
use serde_json::json;
use tracing::error;

/// A custom error type for the server application.
///
/// This enum encapsulates the errors a handler can produce, so they can be
/// converted into HTTP responses of the shape `{"error": ..., "kind": ...}`.
#[derive(Debug)]
pub enum AppError {
    /// Errors raised by the pipeline workflows.
    Pipeline(PipelineError),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Pipeline(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

/// The HTTP status a pipeline error is reported with.
pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
        PipelineError::ExtractionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::EmbeddingUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::IndexWriteFailed { .. } => StatusCode::BAD_GATEWAY,
        PipelineError::SearchUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
        PipelineError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
        PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
        PipelineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_message, kind) = match self {
            AppError::Pipeline(err) => {
                error!(kind = err.kind(), "PipelineError: {err}");
                let status = status_for(&err);
                let message = match &err {
                    // Storage internals are not reported to clients.
                    PipelineError::Store(_) => "A storage error occurred.".to_string(),
                    other => other.to_string(),
                };
                (status, message, err.kind())
            }
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                    "internal",
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
            "kind": kind,
        }));

        (status_code, body).into_response()
    }
}
