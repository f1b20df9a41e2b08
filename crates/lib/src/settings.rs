//! # Pipeline Settings
//!
//! Tunable knobs for every stage of the pipeline. The struct deserializes from the
//! `pipeline` section of the server configuration; any omitted field keeps its default.

use serde::Deserialize;
use std::time::Duration;

/// How an article is turned into text before it is embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleRepresentation {
    /// A short legal briefing written by the generator, falling back to title and snippet.
    Summary,
    /// Title and snippet as received.
    TitleSnippet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Maximum number of search terms kept per document.
    pub max_terms: usize,
    /// Uploaded text shorter than this is rejected.
    pub min_text_chars: usize,
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// Items per embedding request (capped at 100).
    pub embed_batch_size: usize,
    /// Expected embedding dimension. When unset, the first vector of a batch decides.
    pub embedding_dimension: Option<usize>,
    /// Minimum cosine similarity for a chunk to count as a match.
    pub relevance_floor: f32,
    /// Nearest chunks retrieved per article.
    pub top_k: usize,
    pub high_priority_score: f32,
    pub high_priority_matches: usize,
    pub medium_priority_score: f32,
    /// Generated rationales shorter than this are treated as "no impact".
    pub min_rationale_chars: usize,
    /// Maximum number of terms OR-ed into one search query.
    pub max_query_terms: usize,
    /// Maximum length of the search query string.
    pub max_query_chars: usize,
    pub default_days_back: u32,
    pub default_max_results: usize,
    /// Maximum number of articles accepted by one analyze request.
    pub max_analyze_articles: usize,
    /// Upload limit given to a profile created on first use.
    pub default_upload_limit: i64,
    pub article_representation: ArticleRepresentation,
    /// Maximum number of in-flight calls to external capabilities.
    pub max_concurrency: usize,
    pub call_timeout_ms: u64,
    /// Attempts per retryable call (embedding and search).
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_terms: 15,
            min_text_chars: 100,
            chunk_size: 1000,
            chunk_overlap: 200,
            embed_batch_size: 100,
            embedding_dimension: None,
            relevance_floor: 0.75,
            top_k: 3,
            high_priority_score: 0.90,
            high_priority_matches: 3,
            medium_priority_score: 0.80,
            min_rationale_chars: 50,
            max_query_terms: 10,
            max_query_chars: 1900,
            default_days_back: 7,
            default_max_results: 20,
            max_analyze_articles: 20,
            default_upload_limit: 1,
            article_representation: ArticleRepresentation::Summary,
            max_concurrency: 4,
            call_timeout_ms: 30_000,
            max_attempts: 3,
            backoff_base_ms: 500,
        }
    }
}

impl PipelineSettings {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}
