//! # Application State
//!
//! This module defines the shared application state (`AppState`) and the logic
//! for building it at startup: the capability providers are created from their
//! configuration sections and wired, together with the store, into one `Pipeline`.

use crate::config::AppConfig;
use casewatch::{
    providers::factory::{
        create_ai_provider, create_embedder, create_entity_recognizer, create_web_search,
    },
    MemoryStore, Pipeline, SqliteStore,
};
use std::sync::Arc;
use tracing::{info, warn};

/// The `db_url` that selects the in-memory store instead of SQLite.
pub const MEMORY_DB_URL: &str = ":memory:";

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Arc<AppConfig>,
    /// The pipeline serving every workflow.
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt_secret
    }
}

/// Builds the shared application state from the configuration.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    if config.jwt_secret.trim().is_empty() {
        return Err(anyhow::anyhow!(
            "jwt_secret must be set (JWT_SECRET) before the server can authenticate requests"
        ));
    }

    let generator = create_ai_provider(&config.generation)?;
    let embedder = create_embedder(&config.embedding)?;
    let search = create_web_search(&config.search)?;
    let recognizer = match &config.ner {
        Some(ner) if !ner.api_url.trim().is_empty() => Some(create_entity_recognizer(ner)?),
        _ => {
            warn!("No entity recognizer configured; search terms will come from concepts only.");
            None
        }
    };

    let builder = Pipeline::builder()
        .generator(generator)
        .recognizer(recognizer)
        .embedder(embedder)
        .search(search)
        .settings(config.pipeline.clone())
        .prompts(config.prompts.clone());

    let builder = if config.db_url == MEMORY_DB_URL {
        info!("Using the in-memory store; nothing will survive a restart.");
        builder.store(MemoryStore::new())
    } else {
        let store = SqliteStore::new(&config.db_url).await?;
        info!(db_path = %config.db_url, "Initialized local storage provider (SQLite).");
        builder.store(store)
    };

    let pipeline = builder.build()?;

    Ok(AppState {
        config: Arc::new(config),
        pipeline: Arc::new(pipeline),
    })
}
