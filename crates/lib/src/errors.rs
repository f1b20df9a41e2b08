use std::time::Duration;
use thiserror::Error;

/// Errors raised by the HTTP adapters behind the capability ports
/// (generation, embedding, entity recognition and web search).
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Request to external provider failed: {0}")]
    Request(reqwest::Error),
    #[error("Failed to deserialize provider response: {0}")]
    Deserialization(reqwest::Error),
    #[error("Provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Provider returned an unusable response: {0}")]
    InvalidResponse(String),
    #[error("Call to {operation} timed out after {elapsed:?}")]
    Timeout {
        operation: String,
        elapsed: Duration,
    },
    #[error("Provider is not configured: {0}")]
    MissingConfig(String),
}

impl ProviderError {
    /// Whether a retry of the same call has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Request(e) => !e.is_builder() && !e.is_decode(),
            ProviderError::Timeout { .. } => true,
            ProviderError::Api { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            ProviderError::ReqwestClientBuild(_)
            | ProviderError::Deserialization(_)
            | ProviderError::InvalidResponse(_)
            | ProviderError::MissingConfig(_) => false,
        }
    }
}

/// Errors raised by the persistence layer (profiles, documents, alerts, chunks).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] turso::Error),
    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
    #[error("Failed to prepare storage: {0}")]
    Io(#[from] std::io::Error),
}

/// The error taxonomy surfaced by the pipeline workflows.
///
/// Every variant carries enough context (stage, identifier) for a caller to
/// retry just the failed unit of work.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Upload quota exceeded: {used} of {limit} documents already uploaded")]
    QuotaExceeded { used: i64, limit: i64 },
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("Embedding unavailable during {stage}: {failed} of {total} items failed ({reason})")]
    EmbeddingUnavailable {
        stage: String,
        failed: usize,
        total: usize,
        reason: String,
    },
    #[error("Index write failed for document {doc_id}: {reason}")]
    IndexWriteFailed { doc_id: String, reason: String },
    #[error("Search unavailable: {0}")]
    SearchUnavailable(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// A stable, machine-readable name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::QuotaExceeded { .. } => "quota_exceeded",
            PipelineError::ExtractionFailed(_) => "extraction_failed",
            PipelineError::EmbeddingUnavailable { .. } => "embedding_unavailable",
            PipelineError::IndexWriteFailed { .. } => "index_write_failed",
            PipelineError::SearchUnavailable(_) => "search_unavailable",
            PipelineError::AuthenticationFailed(_) => "authentication_failed",
            PipelineError::ValidationFailed(_) => "validation_failed",
            PipelineError::NotFound(_) => "not_found",
            PipelineError::Store(_) => "storage_error",
        }
    }
}
