//! # Common Test Utilities
//!
//! `TestApp` spawns the real server on a random port with a temporary SQLite
//! database and a temporary `config.yml`. A single `httpmock::MockServer` stands in
//! for every external API (generation, embeddings, entity recognition and web
//! search); the helpers below program it per test.

// Not every test file uses every helper.
#![allow(unused)]

use anyhow::Result;
use axum::serve;
use casewatch_server::{
    auth::middleware::Claims,
    config, router,
    state::{build_app_state, AppState},
};
use httpmock::{prelude::*, Mock};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::{
    fs::File,
    io::Write,
    net::SocketAddr,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};
use tempfile::{tempdir, TempDir};
use tokio::{net::TcpListener, task::JoinHandle};

pub const TEST_JWT_SECRET: &str = "casewatch-test-secret";

pub const CHAT_PATH: &str = "/v1/chat/completions";
pub const EMBEDDINGS_PATH: &str = "/v1/embeddings";
pub const NER_PATH: &str = "/ner";
pub const SEARCH_PATH: &str = "/customsearch/v1";

/// Prompt fragments that identify each generation task in a request body.
pub const CONCEPT_PROMPT_KEY: &str = "compliance strategist";
pub const SUMMARY_PROMPT_KEY: &str = "legal analyst";
pub const RATIONALE_PROMPT_KEY: &str = "senior legal advisor";

/// One chunk of case text; "matrimonial cruelty" routes it to the anchor vector.
pub const CASE_TEXT: &str = "The petitioner challenges the FIR registered under Section 498A IPC, \
alleging matrimonial cruelty and dowry demands. Ramesh Kumar seeks anticipatory bail before the \
High Court pending trial.";
pub const CHUNK_KEY: &str = "matrimonial cruelty";

pub const RATIONALE: &str = "The new arrest guidelines directly affect the pending anticipatory \
bail application because police must now issue a notice before any arrest. Cite the ruling in \
the bail hearing.";

pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub db_path: PathBuf,
    pub app_state: AppState,
    _config_dir: TempDir,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestApp {
    /// Spawns the application server and returns a `TestApp` instance.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with_pipeline("").await
    }

    /// Spawns the server with extra `pipeline` settings (YAML lines, indented by four spaces).
    pub async fn spawn_with_pipeline(pipeline_yaml: &str) -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .with_test_writer()
            .try_init();

        let mock_server = MockServer::start_async().await;
        let config_dir = tempdir()?;
        let db_path = config_dir.path().join("casewatch.db");
        let config_path = config_dir.path().join("config.yml");
        let config_content = format!(
            r#"
port: 0
db_url: "{db}"
jwt_secret: "{TEST_JWT_SECRET}"
generation:
  provider: "local"
  api_url: "{chat}"
  api_key: null
  model_name: "mock-chat-model"
embedding:
  api_url: "{embeddings}"
  model_name: "mock-embedding-model"
ner:
  api_url: "{ner}"
search:
  api_url: "{search}"
  api_key: "search-key"
  engine_id: "engine-1"
pipeline:
  max_attempts: 2
  backoff_base_ms: 1
  call_timeout_ms: 5000
{pipeline_yaml}
"#,
            db = db_path.display(),
            chat = mock_server.url(CHAT_PATH),
            embeddings = mock_server.url(EMBEDDINGS_PATH),
            ner = mock_server.url(NER_PATH),
            search = mock_server.url(SEARCH_PATH),
        );
        let mut file = File::create(&config_path)?;
        file.write_all(config_content.as_bytes())?;

        let config_path = config_path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("config path is not valid UTF-8"))?;
        let config = config::get_config(Some(config_path))?;
        let app_state = build_app_state(config).await?;
        let app_state_for_harness = app_state.clone();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server_handle = tokio::spawn(async move {
            let app = router::create_router(app_state);
            let server = serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            db_path,
            app_state: app_state_for_harness,
            _config_dir: config_dir,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// A token for `sub`, valid for an hour.
    pub fn token(&self, sub: &str) -> Result<String> {
        generate_jwt_with_expiry(sub, 3600, TEST_JWT_SECRET)
    }

    pub async fn post_json(&self, path: &str, sub: &str, body: &Value) -> Result<Response> {
        Ok(self
            .client
            .post(format!("{}{path}", self.address))
            .bearer_auth(self.token(sub)?)
            .json(body)
            .send()
            .await?)
    }

    pub async fn get(&self, path: &str, sub: &str) -> Result<Response> {
        Ok(self
            .client
            .get(format!("{}{path}", self.address))
            .bearer_auth(self.token(sub)?)
            .send()
            .await?)
    }

    pub async fn upload_case(&self, sub: &str, doc_name: &str, text: &str) -> Result<Response> {
        self.post_json(
            "/api/v1/upload-case-file",
            sub,
            &json!({ "doc_name": doc_name, "text": text }),
        )
        .await
    }

    // --- External API mocks ---

    /// Answers generation requests whose body contains every key with `content`.
    pub async fn mock_chat(&self, keys: &[&str], content: &str) -> Mock<'_> {
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        let body = chat_response(content);
        self.mock_server
            .mock_async(move |mut when, then| {
                when = when.method(POST).path(CHAT_PATH);
                for key in &keys {
                    when = when.body_contains(key.as_str());
                }
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(body);
            })
            .await
    }

    /// Answers embedding requests whose body contains `key` with `vector` per input.
    /// Every matching test request carries a single input.
    pub async fn mock_embedding(&self, key: &str, vector: &[f32]) -> Mock<'_> {
        let key = key.to_string();
        let body = json!({ "data": [{ "index": 0, "embedding": vector }] });
        self.mock_server
            .mock_async(move |when, then| {
                when.method(POST)
                    .path(EMBEDDINGS_PATH)
                    .body_contains(key.as_str());
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(body);
            })
            .await
    }

    pub async fn mock_embedding_outage(&self) -> Mock<'_> {
        self.mock_server
            .mock_async(|when, then| {
                when.method(POST).path(EMBEDDINGS_PATH);
                then.status(503).body("embedding backend overloaded");
            })
            .await
    }

    pub async fn mock_ner(&self, entities: Value) -> Mock<'_> {
        self.mock_server
            .mock_async(move |when, then| {
                when.method(POST).path(NER_PATH);
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({ "entities": entities }));
            })
            .await
    }

    pub async fn mock_ner_outage(&self) -> Mock<'_> {
        self.mock_server
            .mock_async(|when, then| {
                when.method(POST).path(NER_PATH);
                then.status(500).body("model not loaded");
            })
            .await
    }

    /// Answers the first search page with `items`.
    pub async fn mock_search(&self, items: Value) -> Mock<'_> {
        self.mock_server
            .mock_async(move |when, then| {
                when.method(GET)
                    .path(SEARCH_PATH)
                    .query_param("key", "search-key")
                    .query_param("cx", "engine-1")
                    .query_param("start", "1");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({ "items": items }));
            })
            .await
    }

    pub async fn mock_search_outage(&self) -> Mock<'_> {
        self.mock_server
            .mock_async(|when, then| {
                when.method(GET).path(SEARCH_PATH);
                then.status(503).body("quota exhausted");
            })
            .await
    }

    /// The mocks behind a successful upload of [`CASE_TEXT`]: one legal entity, two
    /// concepts and the chunk embedding.
    pub async fn mock_case_ingestion(&self) -> (Mock<'_>, Mock<'_>, Mock<'_>) {
        let ner = self
            .mock_ner(json!([
                { "text": "Section 498A IPC", "label": "SECTION", "score": 0.98 },
                { "text": "Ramesh Kumar", "label": "PETITIONER", "score": 0.95 }
            ]))
            .await;
        let concepts = self
            .mock_chat(&[CONCEPT_PROMPT_KEY], "Dowry Death, anticipatory bail")
            .await;
        let chunk = self.mock_embedding(CHUNK_KEY, &anchor()).await;
        (ner, concepts, chunk)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// An OpenAI-compatible chat completion carrying `content`.
pub fn chat_response(content: &str) -> Value {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
}

/// The vector the case chunk is embedded to.
pub fn anchor() -> Vec<f32> {
    vec![1.0, 0.0, 0.0, 0.0]
}

/// A unit vector whose cosine similarity to [`anchor`] is `similarity`.
pub fn at_similarity(similarity: f32) -> Vec<f32> {
    vec![similarity, (1.0 - similarity * similarity).sqrt(), 0.0, 0.0]
}

/// A search result item as returned by the Custom Search API.
pub fn search_item(title: &str, link: &str, snippet: &str) -> Value {
    json!({ "title": title, "link": link, "snippet": snippet })
}

/// Generates a JWT for `sub` signed with `secret`, expiring `expires_in_secs` from now
/// (negative values produce an already expired token).
pub fn generate_jwt_with_expiry(sub: &str, expires_in_secs: i64, secret: &str) -> Result<String> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;
    let claims = Claims {
        sub: sub.to_string(),
        exp: (now + expires_in_secs).max(0) as usize,
        user_id: String::new(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;
    Ok(token)
}
