//! # Case File Handlers
//!
//! Uploading the monitored case file and reporting the monitoring status.

use super::{AppError, AppState};
use crate::{auth::middleware::AuthenticatedUser, types::UploadCaseRequest};
use axum::{extract::State, Json};
use casewatch::types::{PipelineStatus, UploadOutcome};
use tracing::info;

/// Handler for `/api/v1/upload-case-file`.
///
/// Extracts search terms, indexes the chunks and publishes the terms to the
/// caller's profile. A failed upload leaves no chunks behind and does not use up
/// the caller's upload quota.
pub async fn upload_case_file_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(payload): Json<UploadCaseRequest>,
) -> Result<Json<UploadOutcome>, AppError> {
    info!(
        %user_id,
        doc_name = %payload.doc_name,
        "Received case file upload ({} chars)",
        payload.text.chars().count()
    );
    let outcome = app_state
        .pipeline
        .upload(&user_id, &payload.doc_name, &payload.text)
        .await?;
    Ok(Json(outcome))
}

/// Handler for `/api/v1/status`.
pub async fn status_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<PipelineStatus>, AppError> {
    let status = app_state.pipeline.status(&user_id).await?;
    Ok(Json(status))
}
