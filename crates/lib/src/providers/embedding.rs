//! # Embeddings Provider
//!
//! The [`Embedder`] port and its HTTP adapter. The adapter sends a whole batch in one
//! request, to either the Gemini `batchEmbedContents` endpoint or an OpenAI-compatible
//! `/embeddings` endpoint, choosing the payload format from the URL.

use crate::errors::ProviderError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::debug;

/// Maps a batch of texts to vectors, one per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync + Debug + DynClone {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}

dyn_clone::clone_trait_object!(Embedder);

// --- OpenAI-compatible request and response structures ---

#[derive(Serialize, Debug)]
struct OpenAIEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize, Debug)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize, Debug)]
struct OpenAIEmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

// --- Gemini-specific request and response structures ---

#[derive(Serialize, Debug)]
struct GeminiBatchRequest<'a> {
    requests: Vec<GeminiEmbeddingRequest<'a>>,
}

#[derive(Serialize, Debug)]
struct GeminiEmbeddingRequest<'a> {
    model: String,
    content: GeminiEmbeddingContent<'a>,
}

#[derive(Serialize, Debug)]
struct GeminiEmbeddingContent<'a> {
    parts: Vec<GeminiEmbeddingPart<'a>>,
}

#[derive(Serialize, Debug)]
struct GeminiEmbeddingPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug)]
struct GeminiBatchResponse {
    #[serde(default)]
    embeddings: Vec<GeminiEmbeddingValue>,
}

#[derive(Deserialize, Debug)]
struct GeminiEmbeddingValue {
    values: Vec<f32>,
}

/// An [`Embedder`] backed by an external embeddings API.
#[derive(Clone, Debug)]
pub struct HttpEmbedder {
    client: ReqwestClient,
    api_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEmbedder {
    pub fn new(
        api_url: String,
        model: String,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(ProviderError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url,
            model,
            api_key,
        })
    }

    fn is_gemini(&self) -> bool {
        self.api_url.contains("generativelanguage.googleapis.com")
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut request_builder = self.client.post(&self.api_url);
        let is_gemini = self.is_gemini();

        // --- 1. Construct the appropriate request body and apply auth ---
        if is_gemini {
            // Gemini requires the model name to be prefixed with "models/" in the payload.
            let gemini_model_name = if self.model.starts_with("models/") {
                self.model.clone()
            } else {
                format!("models/{}", self.model)
            };
            let request_body = GeminiBatchRequest {
                requests: texts
                    .iter()
                    .map(|text| GeminiEmbeddingRequest {
                        model: gemini_model_name.clone(),
                        content: GeminiEmbeddingContent {
                            parts: vec![GeminiEmbeddingPart { text }],
                        },
                    })
                    .collect(),
            };
            debug!(
                items = texts.len(),
                "--> Sending batch to Gemini Embeddings API"
            );
            request_builder = request_builder.json(&request_body);
            if let Some(key) = &self.api_key {
                request_builder = request_builder.header("x-goog-api-key", key);
            }
        } else {
            let request_body = OpenAIEmbeddingRequest {
                model: &self.model,
                input: texts,
            };
            debug!(
                items = texts.len(),
                "--> Sending batch to OpenAI-compatible Embeddings API"
            );
            request_builder = request_builder.json(&request_body);
            if let Some(key) = &self.api_key {
                request_builder = request_builder.bearer_auth(key);
            }
        }

        // --- 2. Send the request and handle the response ---
        let response = request_builder
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

        if is_gemini {
            let gemini_response: GeminiBatchResponse = response
                .json()
                .await
                .map_err(ProviderError::Deserialization)?;
            Ok(gemini_response
                .embeddings
                .into_iter()
                .map(|e| e.values)
                .collect())
        } else {
            let openai_response: OpenAIEmbeddingResponse = response
                .json()
                .await
                .map_err(ProviderError::Deserialization)?;
            let mut data = openai_response.data;
            // Servers may answer out of order; `index` restores the request order.
            if data.iter().all(|d| d.index.is_some()) {
                data.sort_by_key(|d| d.index);
            }
            Ok(data.into_iter().map(|d| d.embedding).collect())
        }
    }
}
