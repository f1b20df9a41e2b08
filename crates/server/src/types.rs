//! Request and response payloads of the HTTP API.

use casewatch::types::{Alert, Article};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct UploadCaseRequest {
    pub doc_name: String,
    pub text: String,
}

/// Body of `/search-articles` and `/scan`. Both fields fall back to the configured defaults.
#[derive(Debug, Deserialize, Default)]
pub struct MonitorRequest {
    #[serde(default)]
    pub days_back: Option<u32>,
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeArticlesRequest {
    pub articles: Vec<Article>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AlertsQuery {
    /// `unread` or `read`.
    pub status: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlertsResponse {
    pub alerts: Vec<Alert>,
}
