//! # Monitoring Handlers
//!
//! Searching for new legal developments and matching them against the caller's
//! case file. Per-article failures are part of a successful response.

use super::{AppError, AppState};
use crate::{
    auth::middleware::AuthenticatedUser,
    types::{AnalyzeArticlesRequest, MonitorRequest},
};
use axum::{extract::State, Json};
use casewatch::types::{AnalyzeOutcome, ScanOutcome, SearchOutcome};
use tracing::info;

/// Handler for `/api/v1/search-articles`.
pub async fn search_articles_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(payload): Json<MonitorRequest>,
) -> Result<Json<SearchOutcome>, AppError> {
    info!(%user_id, ?payload, "Received article search request");
    let outcome = app_state
        .pipeline
        .search(&user_id, payload.days_back, payload.max_results)
        .await?;
    Ok(Json(outcome))
}

/// Handler for `/api/v1/analyze-articles`.
pub async fn analyze_articles_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(payload): Json<AnalyzeArticlesRequest>,
) -> Result<Json<AnalyzeOutcome>, AppError> {
    info!(
        %user_id,
        "Received analyze request for {} articles",
        payload.articles.len()
    );
    let outcome = app_state
        .pipeline
        .analyze(&user_id, payload.articles)
        .await?;
    Ok(Json(outcome))
}

/// Handler for `/api/v1/scan`: a search followed by an analysis of its results.
pub async fn scan_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(payload): Json<MonitorRequest>,
) -> Result<Json<ScanOutcome>, AppError> {
    info!(%user_id, ?payload, "Received scan request");
    let outcome = app_state
        .pipeline
        .scan(&user_id, payload.days_back, payload.max_results)
        .await?;
    info!(
        %user_id,
        "Scan finished: {} found, {} created, {} updated, {} failed",
        outcome.search.articles_found,
        outcome.analysis.alerts_created,
        outcome.analysis.alerts_updated,
        outcome.analysis.failures.len()
    );
    Ok(Json(outcome))
}
