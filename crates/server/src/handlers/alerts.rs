//! # Alert Inbox Handlers

use super::{AppError, AppState};
use crate::{
    auth::middleware::AuthenticatedUser,
    types::{AlertsQuery, AlertsResponse},
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use casewatch::{
    types::{Alert, AlertStatus},
    PipelineError,
};

/// Handler for `GET /api/v1/alerts`, newest first.
pub async fn list_alerts_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Query(params): Query<AlertsQuery>,
) -> Result<Json<AlertsResponse>, AppError> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<AlertStatus>)
        .transpose()
        .map_err(PipelineError::ValidationFailed)?;
    let alerts = app_state
        .pipeline
        .alerts(&user_id, status, params.limit)
        .await?;
    Ok(Json(AlertsResponse { alerts }))
}

/// Handler for `POST /api/v1/alerts/{alert_id}/read`.
pub async fn mark_alert_read_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(alert_id): Path<String>,
) -> Result<Json<Alert>, AppError> {
    let alert = app_state
        .pipeline
        .mark_alert_read(&user_id, &alert_id)
        .await?;
    Ok(Json(alert))
}
