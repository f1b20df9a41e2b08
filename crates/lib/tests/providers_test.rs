//! # Provider Adapter Tests
//!
//! Runs the HTTP adapters against a `wiremock` server, including the embedding
//! gateway's batching and retry behaviour over a real HTTP round trip.

mod common;

use anyhow::Result;
use casewatch::{
    call::CallPolicy,
    embedding::EmbeddingGateway,
    errors::ProviderError,
    providers::{
        ai::{gemini::GeminiProvider, local::LocalAiProvider, AiProvider},
        embedding::{Embedder, HttpEmbedder},
        ner::{EntityRecognizer, HttpEntityRecognizer},
        search::{GoogleSearchProvider, SearchRequest, WebSearch},
    },
};
use common::setup_tracing;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::{
    matchers::{body_partial_json, header, method, path, query_param},
    Mock, MockServer, Request, Respond, ResponseTemplate,
};

/// Answers an OpenAI-style embeddings request with one vector per input,
/// or HTTP 400 when any input contains "poison".
struct EchoEmbeddings;

impl Respond for EchoEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let inputs = body["input"].as_array().cloned().unwrap_or_default();
        if inputs
            .iter()
            .any(|i| i.as_str().unwrap_or_default().contains("poison"))
        {
            return ResponseTemplate::new(400).set_body_string("rejected input");
        }
        let data: Vec<Value> = inputs
            .iter()
            .enumerate()
            .map(|(i, _)| json!({"index": i, "embedding": [1.0, i as f32]}))
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
    }
}

fn fast_policy() -> CallPolicy {
    CallPolicy::new(4, Duration::from_secs(5), 3, Duration::from_millis(1))
}

fn texts(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("chunk number {i}")).collect()
}

#[tokio::test]
async fn test_openai_embedder_restores_response_order() -> Result<()> {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer secret"))
        .and(body_partial_json(json!({"model": "text-embedding-3-small"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let embedder = HttpEmbedder::new(
        format!("{}/v1/embeddings", server.uri()),
        "text-embedding-3-small".to_string(),
        Some("secret".to_string()),
    )?;
    let vectors = embedder.embed(&texts(2)).await?;
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    Ok(())
}

#[tokio::test]
async fn test_gateway_splits_into_batches_of_at_most_100() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(EchoEmbeddings)
        .expect(3)
        .mount(&server)
        .await;

    let embedder = HttpEmbedder::new(
        format!("{}/v1/embeddings", server.uri()),
        "model".to_string(),
        None,
    )?;
    let gateway = EmbeddingGateway::new(Box::new(embedder), fast_policy(), 500, None, 2);
    let batch = gateway.embed_batch(&texts(250)).await;

    assert!(batch.is_complete());
    assert_eq!(batch.vectors.len(), 250);
    // Item 150 is the 50th item of the second batch.
    assert_eq!(batch.vectors[150], Some(vec![1.0, 50.0]));
    Ok(())
}

#[tokio::test]
async fn test_gateway_retries_transient_failures() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(EchoEmbeddings)
        .with_priority(2)
        .mount(&server)
        .await;

    let embedder = HttpEmbedder::new(
        format!("{}/v1/embeddings", server.uri()),
        "model".to_string(),
        None,
    )?;
    let gateway = EmbeddingGateway::new(Box::new(embedder), fast_policy(), 100, None, 1);
    let vectors = gateway.embed_batch(&texts(3)).await.into_complete("chunks")?;
    assert_eq!(vectors.len(), 3);

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_gateway_reports_failures_per_item() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(EchoEmbeddings)
        .mount(&server)
        .await;

    let embedder = HttpEmbedder::new(
        format!("{}/v1/embeddings", server.uri()),
        "model".to_string(),
        None,
    )?;
    let gateway = EmbeddingGateway::new(Box::new(embedder), fast_policy(), 2, None, 2);
    let inputs = vec![
        "first".to_string(),
        "second".to_string(),
        "poison pill".to_string(),
        "fourth".to_string(),
        "   ".to_string(),
    ];
    let batch = gateway.embed_batch(&inputs).await;

    let failed: Vec<usize> = batch.failures.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![2, 3, 4]);
    assert!(batch.vectors[0].is_some());
    assert!(batch.vectors[1].is_some());
    assert!(batch.vectors[2].is_none());
    // A permanent 400 is not retried.
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_google_search_sends_recency_and_paging() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("key", "search-key"))
        .and(query_param("cx", "engine"))
        .and(query_param("q", "\"Section 498A IPC\" OR bail"))
        .and(query_param("dateRestrict", "d7"))
        .and(query_param("start", "11"))
        .and(query_param("num", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "title": "Arrest guidelines issued",
                "link": "https://news.example.com/a",
                "snippet": "The bench directed...",
                "pagemap": {"metatags": [{"article:published_time": "2026-10-01T10:00:00Z"}]}
            }, {
                "title": "No metadata",
                "link": "https://news.example.com/b",
                "snippet": "..."
            }]
        })))
        .mount(&server)
        .await;

    let search = GoogleSearchProvider::new(
        format!("{}/customsearch/v1", server.uri()),
        "search-key".to_string(),
        "engine".to_string(),
    )?;
    let hits = search
        .search(&SearchRequest {
            query: "\"Section 498A IPC\" OR bail".to_string(),
            days_back: 7,
            start: 11,
            num: 10,
        })
        .await?;
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].published_at.as_deref(), Some("2026-10-01T10:00:00Z"));
    assert_eq!(hits[1].published_at, None);
    Ok(())
}

#[tokio::test]
async fn test_google_search_without_items_is_empty() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"kind": "customsearch#search"})))
        .mount(&server)
        .await;
    let search = GoogleSearchProvider::new(server.uri(), "k".to_string(), "cx".to_string())?;
    let hits = search
        .search(&SearchRequest {
            query: "bail".to_string(),
            days_back: 1,
            start: 1,
            num: 10,
        })
        .await?;
    assert!(hits.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_entity_recognizer_parses_entities_and_errors() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ner"))
        .and(body_partial_json(json!({"text": "Section 498A IPC applies."})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entities": [{"text": "Section 498A IPC", "label": "SECTION", "score": 0.98}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/loading"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model is loading"))
        .mount(&server)
        .await;

    let recognizer = HttpEntityRecognizer::new(format!("{}/ner", server.uri()), None)?;
    let entities = recognizer.recognize("Section 498A IPC applies.").await?;
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].label, "SECTION");

    let loading = HttpEntityRecognizer::new(format!("{}/loading", server.uri()), None)?;
    let err = loading.recognize("text").await.unwrap_err();
    assert!(matches!(err, ProviderError::Api { status: 503, .. }));
    assert!(err.is_transient());
    Ok(())
}

#[tokio::test]
async fn test_generation_adapters() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gemini"))
        .and(query_param("key", "gemini-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Dowry Death, bail"}]}}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"model": "llama"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "NO_IMPACT"}}]
        })))
        .mount(&server)
        .await;

    let gemini = GeminiProvider::new(format!("{}/gemini", server.uri()), "gemini-key".to_string())?;
    assert_eq!(gemini.generate("system", "user").await?, "Dowry Death, bail");

    let local = LocalAiProvider::new(
        format!("{}/v1/chat/completions", server.uri()),
        None,
        Some("llama".to_string()),
    )?;
    assert_eq!(local.generate("system", "user").await?, "NO_IMPACT");
    Ok(())
}

#[tokio::test]
async fn test_generation_joins_parts_and_skips_empty_system_prompt() -> Result<()> {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gemini"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [
                {"text": "The ruling narrows arrest powers "},
                {"text": "under Section 498A."}
            ]}}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(|req: &Request| {
            serde_json::from_slice::<Value>(&req.body)
                .ok()
                .and_then(|body| body["messages"].as_array().map(|m| m.len() == 1))
                .unwrap_or(false)
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Dowry Death"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gemini = GeminiProvider::new(format!("{}/gemini", server.uri()), "k".to_string())?;
    assert_eq!(
        gemini.generate("", "user").await?,
        "The ruling narrows arrest powers under Section 498A."
    );

    let local = LocalAiProvider::new(format!("{}/v1/chat/completions", server.uri()), None, None)?;
    assert_eq!(local.generate("  ", "user").await?, "Dowry Death");
    Ok(())
}
