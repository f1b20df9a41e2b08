//! # Provider Factory
//!
//! Builds the HTTP adapters behind each capability port from their configuration
//! sections, so every consumer (server, tests, tools) wires providers the same way.

use crate::{
    errors::ProviderError,
    providers::{
        ai::{gemini::GeminiProvider, local::LocalAiProvider, AiProvider},
        embedding::{Embedder, HttpEmbedder},
        ner::{EntityRecognizer, HttpEntityRecognizer},
        search::{GoogleSearchProvider, WebSearch, GOOGLE_SEARCH_API_URL},
    },
};
use serde::Deserialize;
use tracing::info;

/// Configuration of the generative provider.
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// The type of provider ("gemini" or "local").
    pub provider: String,
    /// The API URL. Optional for Gemini, where it is derived from the model name.
    #[serde(default)]
    pub api_url: Option<String>,
    /// The API key, which can be null for local providers.
    #[serde(default)]
    pub api_key: Option<String>,
    pub model_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub api_url: String,
    pub model_name: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NerConfig {
    pub api_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_search_api_url")]
    pub api_url: String,
    pub api_key: String,
    pub engine_id: String,
}

fn default_search_api_url() -> String {
    GOOGLE_SEARCH_API_URL.to_string()
}

/// Treats empty strings (e.g. from an unset `${VAR}` substitution) as absent.
fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

pub fn create_ai_provider(config: &ProviderConfig) -> Result<Box<dyn AiProvider>, ProviderError> {
    info!(
        "Configuring '{}' generation provider with model '{}'",
        config.provider, config.model_name
    );
    match config.provider.as_str() {
        "gemini" => {
            let api_key = non_empty(&config.api_key).ok_or_else(|| {
                ProviderError::MissingConfig(
                    "an api_key is required for the gemini provider".to_string(),
                )
            })?;
            let api_url = non_empty(&config.api_url).unwrap_or_else(|| {
                format!(
                    "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                    config.model_name
                )
            });
            Ok(Box::new(GeminiProvider::new(api_url, api_key)?))
        }
        "local" => {
            let api_url = non_empty(&config.api_url).ok_or_else(|| {
                ProviderError::MissingConfig(
                    "an api_url is required for the local provider".to_string(),
                )
            })?;
            Ok(Box::new(LocalAiProvider::new(
                api_url,
                non_empty(&config.api_key),
                Some(config.model_name.clone()),
            )?))
        }
        other => Err(ProviderError::MissingConfig(format!(
            "unsupported generation provider '{other}'"
        ))),
    }
}

pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>, ProviderError> {
    Ok(Box::new(HttpEmbedder::new(
        config.api_url.clone(),
        config.model_name.clone(),
        non_empty(&config.api_key),
    )?))
}

pub fn create_entity_recognizer(
    config: &NerConfig,
) -> Result<Box<dyn EntityRecognizer>, ProviderError> {
    Ok(Box::new(HttpEntityRecognizer::new(
        config.api_url.clone(),
        non_empty(&config.api_key),
    )?))
}

pub fn create_web_search(config: &SearchConfig) -> Result<Box<dyn WebSearch>, ProviderError> {
    if config.api_key.trim().is_empty() || config.engine_id.trim().is_empty() {
        return Err(ProviderError::MissingConfig(
            "search requires both api_key and engine_id".to_string(),
        ));
    }
    Ok(Box::new(GoogleSearchProvider::new(
        config.api_url.clone(),
        config.api_key.clone(),
        config.engine_id.clone(),
    )?))
}
