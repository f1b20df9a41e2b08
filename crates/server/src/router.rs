use super::{handlers, state::AppState};
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Upper bound for an uploaded case file request body.
pub const UPLOAD_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/upload-case-file",
            post(handlers::upload_case_file_handler).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/search-articles", post(handlers::search_articles_handler))
        .route("/analyze-articles", post(handlers::analyze_articles_handler))
        .route("/scan", post(handlers::scan_handler))
        .route("/status", get(handlers::status_handler))
        .route("/alerts", get(handlers::list_alerts_handler))
        .route(
            "/alerts/{alert_id}/read",
            post(handlers::mark_alert_read_handler),
        );

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
