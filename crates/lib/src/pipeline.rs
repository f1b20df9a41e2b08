//! # Pipeline Orchestrator
//!
//! The user-facing workflows: uploading a case file, searching for new articles,
//! analyzing articles against the indexed case, and the read side (status and the
//! alert inbox). A [`Pipeline`] is assembled from capability ports and stores with
//! [`PipelineBuilder`] and is cheap to clone.
//!
//! Upload publishes its results only after the chunk upsert succeeded: the profile's
//! search terms and the document's `indexed` status are written last. A failure at any
//! later stage removes the document's chunks, marks it `failed` and returns the
//! reserved quota slot.

use crate::{
    alerts::{AlertDecision, AlertSynthesizer},
    call::CallPolicy,
    canonical::canonicalize_url,
    chunk::chunk_document,
    constants::{
        CHUNK_METADATA_TEXT_CHARS, DEFAULT_ALERTS_PAGE, MAX_ALERTS_PAGE, MAX_DAYS_BACK,
        MAX_DOC_NAME_CHARS, MAX_SEARCH_RESULTS,
    },
    embedding::EmbeddingGateway,
    errors::{PipelineError, ProviderError},
    extract::{truncate_chars, Extractor},
    index::VectorIndex,
    matcher::Matcher,
    prompts::PromptTemplates,
    providers::{
        ai::AiProvider, embedding::Embedder, ner::EntityRecognizer, search::WebSearch,
    },
    scanner::{build_search_query, Scanner},
    settings::PipelineSettings,
    store::{AlertStore, DocumentStore, ProfileStore},
    types::{
        Alert, AlertStatus, AlertSummary, AlertWrite, AnalyzeOutcome, Article, ArticleFailure,
        ArticleSummary, CaseDocument, ChunkMetadata, DocumentStatus, IndexRecord,
        PipelineStatus, QuotaReservation, ScanOutcome, SearchOutcome, UploadOutcome,
    },
};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The identifier of a user's document, stable across re-uploads of the same name.
pub fn document_id(user_id: &str, doc_name: &str) -> String {
    Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("{user_id}/{doc_name}").as_bytes(),
    )
    .to_string()
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    generator: Box<dyn AiProvider>,
    recognizer: Option<Box<dyn EntityRecognizer>>,
    gateway: EmbeddingGateway,
    search: Box<dyn WebSearch>,
    profiles: Box<dyn ProfileStore>,
    documents: Box<dyn DocumentStore>,
    alerts: Box<dyn AlertStore>,
    index: Box<dyn VectorIndex>,
    settings: PipelineSettings,
    prompts: PromptTemplates,
    policy: CallPolicy,
}

#[derive(Debug, Default)]
pub struct PipelineBuilder {
    generator: Option<Box<dyn AiProvider>>,
    recognizer: Option<Box<dyn EntityRecognizer>>,
    embedder: Option<Box<dyn Embedder>>,
    search: Option<Box<dyn WebSearch>>,
    profiles: Option<Box<dyn ProfileStore>>,
    documents: Option<Box<dyn DocumentStore>>,
    alerts: Option<Box<dyn AlertStore>>,
    index: Option<Box<dyn VectorIndex>>,
    settings: PipelineSettings,
    prompts: PromptTemplates,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generator(mut self, generator: Box<dyn AiProvider>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Optional. Without a recognizer, terms come from concept generation alone.
    pub fn recognizer(mut self, recognizer: Option<Box<dyn EntityRecognizer>>) -> Self {
        self.recognizer = recognizer;
        self
    }

    pub fn embedder(mut self, embedder: Box<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn search(mut self, search: Box<dyn WebSearch>) -> Self {
        self.search = Some(search);
        self
    }

    /// Uses one backend for every store and the vector index.
    pub fn store<S>(mut self, store: S) -> Self
    where
        S: ProfileStore + DocumentStore + AlertStore + VectorIndex + Clone + 'static,
    {
        self.profiles = Some(Box::new(store.clone()));
        self.documents = Some(Box::new(store.clone()));
        self.alerts = Some(Box::new(store.clone()));
        self.index = Some(Box::new(store));
        self
    }

    pub fn profiles(mut self, profiles: Box<dyn ProfileStore>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn documents(mut self, documents: Box<dyn DocumentStore>) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn alerts(mut self, alerts: Box<dyn AlertStore>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    pub fn index(mut self, index: Box<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn prompts(mut self, prompts: PromptTemplates) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn build(self) -> Result<Pipeline, ProviderError> {
        fn required<T>(component: Option<T>, name: &str) -> Result<T, ProviderError> {
            component.ok_or_else(|| {
                ProviderError::MissingConfig(format!("pipeline component '{name}' is not set"))
            })
        }

        let policy = CallPolicy::from_settings(&self.settings);
        let gateway = EmbeddingGateway::new(
            required(self.embedder, "embedder")?,
            policy.clone(),
            self.settings.embed_batch_size,
            self.settings.embedding_dimension,
            self.settings.max_concurrency,
        );
        Ok(Pipeline {
            generator: required(self.generator, "generator")?,
            recognizer: self.recognizer,
            gateway,
            search: required(self.search, "search")?,
            profiles: required(self.profiles, "profiles")?,
            documents: required(self.documents, "documents")?,
            alerts: required(self.alerts, "alerts")?,
            index: required(self.index, "index")?,
            settings: self.settings,
            prompts: self.prompts,
            policy,
        })
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    // --- Upload ---

    /// Extracts search terms from a case file, indexes its chunks and publishes both.
    pub async fn upload(
        &self,
        user_id: &str,
        doc_name: &str,
        text: &str,
    ) -> Result<UploadOutcome, PipelineError> {
        let doc_name = doc_name.trim();
        if doc_name.is_empty() {
            return Err(PipelineError::ValidationFailed(
                "doc_name must not be empty".to_string(),
            ));
        }
        if doc_name.chars().count() > MAX_DOC_NAME_CHARS {
            return Err(PipelineError::ValidationFailed(format!(
                "doc_name must be at most {MAX_DOC_NAME_CHARS} characters"
            )));
        }
        if text.trim().chars().count() < self.settings.min_text_chars {
            return Err(PipelineError::ValidationFailed(format!(
                "document text must be at least {} characters",
                self.settings.min_text_chars
            )));
        }

        if let QuotaReservation::Exceeded { used, limit } = self
            .profiles
            .try_reserve_upload(user_id, self.settings.default_upload_limit)
            .await?
        {
            warn!("User {user_id} hit the upload quota ({used}/{limit})");
            return Err(PipelineError::QuotaExceeded { used, limit });
        }

        let doc_id = document_id(user_id, doc_name);
        info!("Processing upload '{doc_name}' ({doc_id}) for user {user_id}");
        match self.ingest(user_id, &doc_id, doc_name, text).await {
            Ok(outcome) => {
                info!(
                    "Indexed '{doc_name}': {} terms, {} chunks",
                    outcome.extracted_terms_count, outcome.chunks_indexed
                );
                Ok(outcome)
            }
            Err(e) => {
                error!("Upload of '{doc_name}' for user {user_id} failed: {e}");
                self.abandon_upload(user_id, &doc_id, &e).await;
                Err(e)
            }
        }
    }

    async fn ingest(
        &self,
        user_id: &str,
        doc_id: &str,
        doc_name: &str,
        text: &str,
    ) -> Result<UploadOutcome, PipelineError> {
        let previous = self.documents.latest_document(user_id).await?;
        let now = Utc::now();
        self.documents
            .save_document(&CaseDocument {
                doc_id: doc_id.to_string(),
                user_id: user_id.to_string(),
                doc_name: doc_name.to_string(),
                full_text_ref: format!("{:x}", md5::compute(text.as_bytes())),
                extracted_terms: Vec::new(),
                status: DocumentStatus::Uploaded,
                error: None,
                uploaded_at: now,
                updated_at: now,
            })
            .await?;

        let extraction = Extractor {
            recognizer: self.recognizer.as_deref(),
            generator: self.generator.as_ref(),
            prompts: &self.prompts.concept_extraction,
            policy: &self.policy,
            max_terms: self.settings.max_terms,
        }
        .extract(text)
        .await?;

        let drafts = chunk_document(
            doc_id,
            text,
            self.settings.chunk_size,
            self.settings.chunk_overlap,
        )
        .map_err(|e| PipelineError::ValidationFailed(e.to_string()))?;
        let texts: Vec<String> = drafts.iter().map(|d| d.text.clone()).collect();
        let vectors = self
            .gateway
            .embed_batch(&texts)
            .await
            .into_complete("chunks")?;

        let records: Vec<IndexRecord> = drafts
            .into_iter()
            .zip(vectors)
            .map(|(draft, vector)| IndexRecord {
                chunk_id: draft.chunk_id,
                vector,
                metadata: ChunkMetadata {
                    user_id: user_id.to_string(),
                    doc_id: doc_id.to_string(),
                    source: doc_name.to_string(),
                    sequence_index: draft.sequence_index,
                    text: truncate_chars(&draft.text, CHUNK_METADATA_TEXT_CHARS).to_string(),
                },
            })
            .collect();

        if let Some(previous) = previous.filter(|p| p.doc_id != doc_id) {
            let removed = self.index.delete_document(user_id, &previous.doc_id).await?;
            info!("Replaced '{}': removed {removed} old chunks", previous.doc_name);
        }
        self.index.delete_document(user_id, doc_id).await?;
        self.index.upsert(user_id, &records).await?;

        // Publish only after the chunks are in place.
        self.profiles
            .publish_terms(user_id, doc_name, &extraction.terms)
            .await?;
        self.documents
            .update_document_status(
                user_id,
                doc_id,
                DocumentStatus::Indexed,
                &extraction.terms,
                None,
            )
            .await?;

        Ok(UploadOutcome {
            doc_id: doc_id.to_string(),
            doc_name: doc_name.to_string(),
            extracted_terms_count: extraction.terms.len(),
            chunks_indexed: records.len(),
            entity_count: extraction.entity_count,
            concept_count: extraction.concept_count,
            ner_degraded: extraction.ner_degraded,
        })
    }

    /// Best-effort cleanup after a failed upload; the original error is what the caller sees.
    async fn abandon_upload(&self, user_id: &str, doc_id: &str, cause: &PipelineError) {
        if let Err(e) = self.index.delete_document(user_id, doc_id).await {
            error!("Could not remove chunks of failed document {doc_id}: {e}");
        }
        if let Err(e) = self
            .documents
            .update_document_status(
                user_id,
                doc_id,
                DocumentStatus::Failed,
                &[],
                Some(&cause.to_string()),
            )
            .await
        {
            error!("Could not mark document {doc_id} as failed: {e}");
        }
        if let Err(e) = self.profiles.release_upload(user_id).await {
            error!("Could not release upload slot for user {user_id}: {e}");
        }
    }

    // --- Search and analysis ---

    /// Searches for recent articles matching the user's published terms.
    pub async fn search(
        &self,
        user_id: &str,
        days_back: Option<u32>,
        max_results: Option<usize>,
    ) -> Result<SearchOutcome, PipelineError> {
        let days_back = days_back.unwrap_or(self.settings.default_days_back);
        let max_results = max_results.unwrap_or(self.settings.default_max_results);
        if !(1..=MAX_DAYS_BACK).contains(&days_back) {
            return Err(PipelineError::ValidationFailed(format!(
                "days_back must be between 1 and {MAX_DAYS_BACK}"
            )));
        }
        if !(1..=MAX_SEARCH_RESULTS).contains(&max_results) {
            return Err(PipelineError::ValidationFailed(format!(
                "max_results must be between 1 and {MAX_SEARCH_RESULTS}"
            )));
        }

        let profile = self
            .profiles
            .get_or_create_profile(user_id, self.settings.default_upload_limit)
            .await?;
        if profile.extracted_search_terms.is_empty() {
            return Err(PipelineError::ValidationFailed(
                "no search terms found; upload a case file first".to_string(),
            ));
        }
        let query = build_search_query(
            &profile.extracted_search_terms,
            self.settings.max_query_terms,
            self.settings.max_query_chars,
        )
        .ok_or_else(|| {
            PipelineError::ValidationFailed(
                "none of the extracted terms can be used in a search query".to_string(),
            )
        })?;
        info!("Searching the last {days_back} days for user {user_id}: {query}");

        let result = Scanner {
            search: self.search.as_ref(),
            policy: &self.policy,
        }
        .scan(&query, days_back, max_results)
        .await?;

        Ok(SearchOutcome {
            articles_found: result.articles.len(),
            articles: result.articles.iter().map(ArticleSummary::from).collect(),
            search_query: result.search_query,
        })
    }

    /// Matches articles against the user's indexed case and writes alerts.
    ///
    /// A failing article is reported in `failures` and never aborts the others.
    pub async fn analyze(
        &self,
        user_id: &str,
        articles: Vec<Article>,
    ) -> Result<AnalyzeOutcome, PipelineError> {
        if articles.len() > self.settings.max_analyze_articles {
            return Err(PipelineError::ValidationFailed(format!(
                "at most {} articles can be analyzed per request",
                self.settings.max_analyze_articles
            )));
        }
        if let Some((i, _)) = articles.iter().enumerate().find(|(_, a)| {
            a.title.trim().is_empty() || a.link.trim().is_empty() || a.snippet.trim().is_empty()
        }) {
            return Err(PipelineError::ValidationFailed(format!(
                "article {i} must have a title, link and snippet"
            )));
        }
        self.require_indexed_document(user_id).await?;
        Ok(self.analyze_articles(user_id, articles).await)
    }

    /// Searches, then analyzes what was found.
    pub async fn scan(
        &self,
        user_id: &str,
        days_back: Option<u32>,
        max_results: Option<usize>,
    ) -> Result<ScanOutcome, PipelineError> {
        self.require_indexed_document(user_id).await?;
        let search = self.search(user_id, days_back, max_results).await?;
        let articles: Vec<Article> = search
            .articles
            .iter()
            .take(self.settings.max_analyze_articles)
            .map(|a| Article {
                title: a.title.clone(),
                link: a.link.clone(),
                snippet: a.snippet.clone(),
                published_at: None,
            })
            .collect();
        let analysis = self.analyze_articles(user_id, articles).await;
        info!(
            "Scan for user {user_id}: {} found, {} new alerts, {} upgraded",
            search.articles_found, analysis.alerts_created, analysis.alerts_updated
        );
        Ok(ScanOutcome { search, analysis })
    }

    async fn require_indexed_document(&self, user_id: &str) -> Result<(), PipelineError> {
        match self.documents.latest_document(user_id).await? {
            Some(doc) if doc.status == DocumentStatus::Indexed => Ok(()),
            Some(doc) => Err(PipelineError::ValidationFailed(format!(
                "case file '{}' is {}; upload it again before analyzing articles",
                doc.doc_name, doc.status
            ))),
            None => Err(PipelineError::ValidationFailed(
                "no case file uploaded; upload one before analyzing articles".to_string(),
            )),
        }
    }

    async fn analyze_articles(&self, user_id: &str, articles: Vec<Article>) -> AnalyzeOutcome {
        let mut seen = HashSet::new();
        let unique: Vec<Article> = articles
            .into_iter()
            .filter(|a| seen.insert(canonicalize_url(&a.link)))
            .collect();

        let results: Vec<Result<Option<AlertDecision>, ArticleFailure>> = stream::iter(unique)
            .map(|article| async move { self.analyze_article(user_id, &article).await })
            .buffered(self.settings.max_concurrency.max(1))
            .collect()
            .await;

        let mut outcome = AnalyzeOutcome {
            articles_analyzed: results.len(),
            ..AnalyzeOutcome::default()
        };
        for result in results {
            match result {
                Ok(None) => outcome.below_threshold += 1,
                Ok(Some(AlertDecision::Dismissed)) => outcome.dismissed += 1,
                Ok(Some(AlertDecision::Written(AlertWrite::Created(alert)))) => {
                    outcome.alerts_created += 1;
                    outcome.alerts.push(AlertSummary::from(&alert));
                }
                Ok(Some(AlertDecision::Written(AlertWrite::Updated(alert)))) => {
                    outcome.alerts_updated += 1;
                    outcome.alerts.push(AlertSummary::from(&alert));
                }
                Ok(Some(AlertDecision::Written(AlertWrite::Unchanged(_)))) => {
                    outcome.duplicates += 1
                }
                Err(failure) => {
                    warn!(
                        "Article {} failed at {}: {}",
                        failure.link, failure.stage, failure.error
                    );
                    outcome.failures.push(failure);
                }
            }
        }
        outcome
    }

    async fn analyze_article(
        &self,
        user_id: &str,
        article: &Article,
    ) -> Result<Option<AlertDecision>, ArticleFailure> {
        let matcher = Matcher {
            generator: self.generator.as_ref(),
            prompts: &self.prompts.article_summary,
            gateway: &self.gateway,
            index: self.index.as_ref(),
            policy: &self.policy,
            settings: &self.settings,
        };
        let Some(matched) = matcher.match_article(user_id, article).await? else {
            return Ok(None);
        };
        let synthesizer = AlertSynthesizer {
            generator: self.generator.as_ref(),
            prompts: &self.prompts.alert_rationale,
            store: self.alerts.as_ref(),
            policy: &self.policy,
            settings: &self.settings,
        };
        synthesizer
            .synthesize(user_id, article, matched)
            .await
            .map(Some)
    }

    // --- Read side ---

    pub async fn status(&self, user_id: &str) -> Result<PipelineStatus, PipelineError> {
        let profile = self
            .profiles
            .get_or_create_profile(user_id, self.settings.default_upload_limit)
            .await?;
        let latest = self.documents.latest_document(user_id).await?;
        let chunks_indexed = match &latest {
            Some(doc) => self.index.document_chunk_ids(user_id, &doc.doc_id).await?.len(),
            None => 0,
        };
        Ok(PipelineStatus {
            has_uploaded_case: latest.is_some(),
            monitored_doc_name: profile.monitored_doc_name,
            document_status: latest.map(|d| d.status),
            extracted_terms_count: profile.extracted_search_terms.len(),
            chunks_indexed,
            doc_upload_count: profile.doc_upload_count,
            doc_upload_limit: profile.doc_upload_limit,
            unread_alerts: self
                .alerts
                .count_alerts(user_id, Some(AlertStatus::Unread))
                .await?,
            total_alerts: self.alerts.count_alerts(user_id, None).await?,
        })
    }

    /// The user's alerts, newest first.
    pub async fn alerts(
        &self,
        user_id: &str,
        status: Option<AlertStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<Alert>, PipelineError> {
        let limit = limit.unwrap_or(DEFAULT_ALERTS_PAGE);
        if !(1..=MAX_ALERTS_PAGE).contains(&limit) {
            return Err(PipelineError::ValidationFailed(format!(
                "limit must be between 1 and {MAX_ALERTS_PAGE}"
            )));
        }
        Ok(self.alerts.list_alerts(user_id, status, limit).await?)
    }

    pub async fn mark_alert_read(&self, user_id: &str, alert_id: &str) -> Result<Alert, PipelineError> {
        self.alerts
            .mark_alert_read(user_id, alert_id, Utc::now())
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("alert '{alert_id}'")))
    }
}
