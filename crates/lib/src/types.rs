//! # Domain Types
//!
//! Records that flow between the pipeline stages and the stores: case documents,
//! chunks, articles, alerts and user profiles, plus the outcome shapes returned
//! by the workflows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of an uploaded case document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploaded,
    Indexed,
    Failed,
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Indexed => "indexed",
            DocumentStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(DocumentStatus::Uploaded),
            "indexed" => Ok(DocumentStatus::Indexed),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(format!("unknown document status '{other}'")),
        }
    }
}

/// A user's monitored case file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDocument {
    pub doc_id: String,
    pub user_id: String,
    pub doc_name: String,
    /// MD5 of the raw text; the text itself belongs to the external document store.
    pub full_text_ref: String,
    pub extracted_terms: Vec<String>,
    pub status: DocumentStatus,
    pub error: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata stored next to every chunk vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub user_id: String,
    pub doc_id: String,
    /// The document name, shown to the generator as the chunk's source.
    pub source: String,
    pub sequence_index: usize,
    /// Chunk text, truncated for storage.
    pub text: String,
}

/// A single write into the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub chunk_id: String,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A ranked hit returned by a namespace-scoped index query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexMatch {
    pub chunk_id: String,
    pub doc_id: String,
    pub source: String,
    pub sequence_index: usize,
    pub text: String,
    pub score: f32,
}

/// A candidate external article. Transient until it produces an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub link: String,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Unread,
    Read,
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlertStatus::Unread => "unread",
            AlertStatus::Read => "read",
        })
    }
}

impl FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unread" => Ok(AlertStatus::Unread),
            "read" => Ok(AlertStatus::Read),
            other => Err(format!("unknown alert status '{other}'")),
        }
    }
}

/// A persisted alert. Unique per `(user_id, article_url)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: String,
    pub user_id: String,
    /// Canonical form of the article URL, used as the dedup key.
    pub article_url: String,
    /// The link exactly as it was received.
    pub link: String,
    pub title: String,
    pub snippet: String,
    pub priority: Priority,
    pub rationale: String,
    pub matched_chunk_ids: Vec<String>,
    pub related_docs_count: usize,
    /// Best similarity among the matched chunks.
    pub score: f32,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// The result of an atomic alert upsert.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertWrite {
    Created(Alert),
    Updated(Alert),
    /// An existing alert had an equal or better score; the stored one is returned.
    Unchanged(Alert),
}

/// Per-user profile fields the pipeline reads and enforces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub doc_upload_count: i64,
    pub doc_upload_limit: i64,
    pub extracted_search_terms: Vec<String>,
    pub monitored_doc_name: Option<String>,
    pub terms_updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn new(user_id: &str, doc_upload_limit: i64) -> Self {
        Self {
            user_id: user_id.to_string(),
            doc_upload_count: 0,
            doc_upload_limit,
            extracted_search_terms: Vec::new(),
            monitored_doc_name: None,
            terms_updated_at: None,
        }
    }
}

/// Result of an atomic check-then-increment against the upload quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaReservation {
    Reserved { used: i64, limit: i64 },
    Exceeded { used: i64, limit: i64 },
}

// --- Workflow outcomes ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadOutcome {
    pub doc_id: String,
    pub doc_name: String,
    pub extracted_terms_count: usize,
    pub chunks_indexed: usize,
    pub entity_count: usize,
    pub concept_count: usize,
    pub ner_degraded: bool,
}

/// An article as reported back from a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

impl From<&Article> for ArticleSummary {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            link: article.link.clone(),
            snippet: article.snippet.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub articles_found: usize,
    pub articles: Vec<ArticleSummary>,
    pub search_query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertSummary {
    pub alert_id: String,
    pub title: String,
    pub priority: Priority,
    pub related_docs_count: usize,
}

impl From<&Alert> for AlertSummary {
    fn from(alert: &Alert) -> Self {
        Self {
            alert_id: alert.alert_id.clone(),
            title: alert.title.clone(),
            priority: alert.priority,
            related_docs_count: alert.related_docs_count,
        }
    }
}

/// A per-article failure, reported alongside the successes of the same run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleFailure {
    pub link: String,
    pub stage: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyzeOutcome {
    pub articles_analyzed: usize,
    pub alerts_created: usize,
    pub alerts_updated: usize,
    pub duplicates: usize,
    pub dismissed: usize,
    pub below_threshold: usize,
    pub alerts: Vec<AlertSummary>,
    pub failures: Vec<ArticleFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanOutcome {
    pub search: SearchOutcome,
    pub analysis: AnalyzeOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStatus {
    pub has_uploaded_case: bool,
    pub monitored_doc_name: Option<String>,
    pub document_status: Option<DocumentStatus>,
    pub extracted_terms_count: usize,
    pub chunks_indexed: usize,
    pub doc_upload_count: i64,
    pub doc_upload_limit: i64,
    pub unread_alerts: usize,
    pub total_alerts: usize,
}
