//! # Entity Recognition Provider
//!
//! The [`EntityRecognizer`] port and an adapter for a hosted legal NER model that
//! accepts `{"text": ...}` and answers `{"entities": [{"text", "label", "score"}]}`.

use crate::errors::ProviderError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::debug;

/// A named entity as reported by the recognizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedEntity {
    pub text: String,
    pub label: String,
    #[serde(default)]
    pub score: Option<f32>,
}

#[async_trait]
pub trait EntityRecognizer: Send + Sync + Debug + DynClone {
    /// Returns entities in document order.
    async fn recognize(&self, text: &str) -> Result<Vec<RecognizedEntity>, ProviderError>;
}

dyn_clone::clone_trait_object!(EntityRecognizer);

#[derive(Serialize, Debug)]
struct NerRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug)]
struct NerResponse {
    #[serde(default)]
    entities: Vec<RecognizedEntity>,
}

#[derive(Clone, Debug)]
pub struct HttpEntityRecognizer {
    client: ReqwestClient,
    api_url: String,
    api_key: Option<String>,
}

impl HttpEntityRecognizer {
    pub fn new(api_url: String, api_key: Option<String>) -> Result<Self, ProviderError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(ProviderError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }
}

#[async_trait]
impl EntityRecognizer for HttpEntityRecognizer {
    async fn recognize(&self, text: &str) -> Result<Vec<RecognizedEntity>, ProviderError> {
        debug!(chars = text.len(), "--> Sending text to entity recognizer");
        let mut request_builder = self.client.post(&self.api_url);
        if let Some(key) = &self.api_key {
            request_builder = request_builder.bearer_auth(key);
        }

        let response = request_builder
            .json(&NerRequest { text })
            .send()
            .await
            .map_err(ProviderError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let ner_response: NerResponse = response
            .json()
            .await
            .map_err(ProviderError::Deserialization)?;
        Ok(ner_response.entities)
    }
}
