use anyhow::Result;
use async_trait::async_trait;
use casewatch::errors::ProviderError;
use casewatch::providers::{
    ai::AiProvider,
    embedding::Embedder,
    ner::{EntityRecognizer, RecognizedEntity},
    search::{SearchHit, SearchRequest, WebSearch},
};
use casewatch::SqliteStore;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn unavailable(message: &str) -> ProviderError {
    ProviderError::Api {
        status: 503,
        message: message.to_string(),
    }
}

// --- Test Setup ---

/// A file-backed store in its own temporary directory.
pub struct TestSetup {
    pub store: SqliteStore,
    pub db_path: String,
    _dir: TempDir,
}

impl TestSetup {
    pub async fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("casewatch.db").to_string_lossy().to_string();
        let store = SqliteStore::new(&db_path).await?;
        Ok(Self {
            store,
            db_path,
            _dir: dir,
        })
    }
}

// --- Mock AI Provider ---

#[derive(Clone, Debug, Default)]
pub struct MockAiProvider {
    system_responses: Arc<Mutex<Vec<(String, String)>>>,
    user_responses: Arc<Mutex<Vec<(String, String)>>>,
    failures: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockAiProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-programs a response for any call whose system prompt contains `key`.
    pub fn add_response(&self, key: &str, response: &str) {
        self.system_responses
            .lock()
            .unwrap()
            .push((key.to_string(), response.to_string()));
    }

    /// Pre-programs a response for any call whose user prompt contains `key`.
    /// Checked before the system prompt responses.
    pub fn add_user_response(&self, key: &str, response: &str) {
        self.user_responses
            .lock()
            .unwrap()
            .push((key.to_string(), response.to_string()));
    }

    /// Makes every call whose system or user prompt contains `key` fail with HTTP 503.
    pub fn fail_on(&self, key: &str) {
        self.failures.lock().unwrap().push(key.to_string());
    }

    /// Retrieves the recorded `(system, user)` prompt pairs.
    pub fn get_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose system prompt contains `key`.
    pub fn calls_matching(&self, key: &str) -> Vec<(String, String)> {
        self.get_calls()
            .into_iter()
            .filter(|(system, _)| system.contains(key))
            .collect()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));

        if self
            .failures
            .lock()
            .unwrap()
            .iter()
            .any(|k| system_prompt.contains(k) || user_prompt.contains(k))
        {
            return Err(unavailable("MockAiProvider: programmed failure"));
        }
        for (key, response) in self.user_responses.lock().unwrap().iter() {
            if user_prompt.contains(key) {
                return Ok(response.clone());
            }
        }
        for (key, response) in self.system_responses.lock().unwrap().iter() {
            if system_prompt.contains(key) {
                return Ok(response.clone());
            }
        }

        Err(ProviderError::InvalidResponse(format!(
            "MockAiProvider: No response programmed for system prompt. Got: '{system_prompt}'"
        )))
    }
}

// --- Fake Embedder ---

/// A deterministic embedder. A text maps to the vector of the first keyword it
/// contains (case-insensitive), or to the default vector.
#[derive(Clone, Debug)]
pub struct FakeEmbedder {
    rules: Arc<Mutex<Vec<(String, Vec<f32>)>>>,
    default_vector: Vec<f32>,
    transient_failures: Arc<AtomicUsize>,
    poison: Arc<Mutex<Vec<String>>>,
    batches: Arc<Mutex<Vec<usize>>>,
}

impl FakeEmbedder {
    pub const DIMENSION: usize = 4;

    pub fn new() -> Self {
        Self {
            rules: Arc::new(Mutex::new(Vec::new())),
            default_vector: vec![0.0, 0.0, 0.0, 1.0],
            transient_failures: Arc::new(AtomicUsize::new(0)),
            poison: Arc::new(Mutex::new(Vec::new())),
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The reference direction case chunks are usually mapped to.
    pub fn anchor() -> Vec<f32> {
        vec![1.0, 0.0, 0.0, 0.0]
    }

    /// A unit vector with exactly `similarity` cosine similarity to [`Self::anchor`].
    pub fn at_similarity(similarity: f32) -> Vec<f32> {
        vec![similarity, (1.0 - similarity * similarity).max(0.0).sqrt(), 0.0, 0.0]
    }

    pub fn with_rule(self, keyword: &str, vector: Vec<f32>) -> Self {
        self.add_rule(keyword, vector);
        self
    }

    pub fn add_rule(&self, keyword: &str, vector: Vec<f32>) {
        self.rules
            .lock()
            .unwrap()
            .push((keyword.to_lowercase(), vector));
    }

    /// The next `n` calls fail with HTTP 503.
    pub fn fail_next(&self, n: usize) {
        self.transient_failures.store(n, Ordering::SeqCst);
    }

    /// Any batch containing `keyword` fails permanently with HTTP 400.
    pub fn fail_on(&self, keyword: &str) {
        self.poison.lock().unwrap().push(keyword.to_lowercase());
    }

    /// Sizes of the batches received, in call order (failed calls included).
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        self.rules
            .lock()
            .unwrap()
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_vector.clone())
    }
}

impl Default for FakeEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        self.batches.lock().unwrap().push(texts.len());

        let pending = self.transient_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.transient_failures.store(pending - 1, Ordering::SeqCst);
            return Err(unavailable("FakeEmbedder: transient failure"));
        }
        let poison = self.poison.lock().unwrap().clone();
        if texts
            .iter()
            .any(|t| poison.iter().any(|p| t.to_lowercase().contains(p)))
        {
            return Err(ProviderError::Api {
                status: 400,
                message: "FakeEmbedder: rejected input".to_string(),
            });
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}

// --- Fake Entity Recognizer ---

#[derive(Clone, Debug, Default)]
pub struct FakeEntityRecognizer {
    entities: Vec<RecognizedEntity>,
    fail: bool,
}

impl FakeEntityRecognizer {
    /// Returns `(text, label)` pairs as recognized entities.
    pub fn new(entities: &[(&str, &str)]) -> Self {
        Self {
            entities: entities
                .iter()
                .map(|(text, label)| RecognizedEntity {
                    text: text.to_string(),
                    label: label.to_string(),
                    score: Some(0.99),
                })
                .collect(),
            fail: false,
        }
    }

    /// A recognizer that is always down.
    pub fn failing() -> Self {
        Self {
            entities: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl EntityRecognizer for FakeEntityRecognizer {
    async fn recognize(&self, _text: &str) -> Result<Vec<RecognizedEntity>, ProviderError> {
        if self.fail {
            return Err(unavailable("FakeEntityRecognizer: model is loading"));
        }
        Ok(self.entities.clone())
    }
}

// --- Fake Web Search ---

/// Serves a fixed result list, paged by the request's `start` and `num`.
#[derive(Clone, Debug, Default)]
pub struct FakeWebSearch {
    hits: Arc<Mutex<Vec<SearchHit>>>,
    fail_from_start: Arc<Mutex<Option<usize>>>,
    requests: Arc<Mutex<Vec<SearchRequest>>>,
}

impl FakeWebSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hit(self, title: &str, link: &str, snippet: &str) -> Self {
        self.add_hit(title, link, snippet);
        self
    }

    pub fn add_hit(&self, title: &str, link: &str, snippet: &str) {
        self.hits.lock().unwrap().push(SearchHit {
            title: title.to_string(),
            link: link.to_string(),
            snippet: snippet.to_string(),
            published_at: None,
        });
    }

    /// Every request whose `start` is at least `start` fails with HTTP 503.
    pub fn fail_from(&self, start: usize) {
        *self.fail_from_start.lock().unwrap() = Some(start);
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for FakeWebSearch {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(from) = *self.fail_from_start.lock().unwrap() {
            if request.start >= from {
                return Err(unavailable("FakeWebSearch: quota exhausted"));
            }
        }
        let hits = self.hits.lock().unwrap();
        Ok(hits
            .iter()
            .skip(request.start.saturating_sub(1))
            .take(request.num)
            .cloned()
            .collect())
    }
}
