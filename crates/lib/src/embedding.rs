//! # Embedding Gateway
//!
//! Wraps an [`Embedder`] with batching, retries and per-item failure reporting.
//! Input order is preserved: `vectors[i]` always belongs to `texts[i]`. A batch that
//! fails after its retries marks only its own items as failed, and a malformed vector
//! fails only the item it belongs to.

use crate::{
    call::CallPolicy, constants::MAX_EMBED_BATCH, errors::PipelineError,
    providers::embedding::Embedder,
};
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingFailure {
    pub index: usize,
    pub reason: String,
}

/// The outcome of embedding a list of texts.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingBatch {
    pub vectors: Vec<Option<Vec<f32>>>,
    pub failures: Vec<EmbeddingFailure>,
}

impl EmbeddingBatch {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// All vectors, or `EmbeddingUnavailable` describing the failed items.
    pub fn into_complete(self, stage: &str) -> Result<Vec<Vec<f32>>, PipelineError> {
        let total = self.vectors.len();
        if let Some(first) = self.failures.first() {
            return Err(PipelineError::EmbeddingUnavailable {
                stage: stage.to_string(),
                failed: self.failures.len(),
                total,
                reason: format!("item {}: {}", first.index, first.reason),
            });
        }
        Ok(self.vectors.into_iter().flatten().collect())
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingGateway {
    embedder: Box<dyn Embedder>,
    policy: CallPolicy,
    batch_size: usize,
    dimension: Option<usize>,
    concurrency: usize,
}

impl EmbeddingGateway {
    pub fn new(
        embedder: Box<dyn Embedder>,
        policy: CallPolicy,
        batch_size: usize,
        dimension: Option<usize>,
        concurrency: usize,
    ) -> Self {
        Self {
            embedder,
            policy,
            batch_size: batch_size.clamp(1, MAX_EMBED_BATCH),
            dimension,
            concurrency: concurrency.max(1),
        }
    }

    /// Embeds `texts`, reporting failures per item instead of failing the whole call.
    pub async fn embed_batch(&self, texts: &[String]) -> EmbeddingBatch {
        let mut vectors: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut failures = Vec::new();

        let mut pending: Vec<(usize, String)> = Vec::with_capacity(texts.len());
        for (index, text) in texts.iter().enumerate() {
            if text.trim().is_empty() {
                failures.push(EmbeddingFailure {
                    index,
                    reason: "input text is empty".to_string(),
                });
            } else {
                pending.push((index, text.clone()));
            }
        }

        let groups: Vec<Vec<(usize, String)>> = pending
            .chunks(self.batch_size)
            .map(|group| group.to_vec())
            .collect();
        debug!(
            "Embedding {} texts in {} batch(es) of up to {}",
            texts.len(),
            groups.len(),
            self.batch_size
        );

        let mut results = stream::iter(groups)
            .map(|group| async move {
                let (indices, inputs): (Vec<usize>, Vec<String>) = group.into_iter().unzip();
                let result = self
                    .policy
                    .retrying("embedding", || self.embedder.embed(&inputs))
                    .await;
                (indices, result)
            })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await;
        results.sort_by_key(|(indices, _)| indices.first().copied());

        let mut expected_dim = self.dimension;
        for (indices, result) in results {
            let batch_vectors = match result {
                Ok(v) if v.len() == indices.len() => v,
                Ok(v) => {
                    let reason = format!(
                        "provider returned {} vectors for {} inputs",
                        v.len(),
                        indices.len()
                    );
                    warn!("Embedding batch rejected: {reason}");
                    failures.extend(indices.into_iter().map(|index| EmbeddingFailure {
                        index,
                        reason: reason.clone(),
                    }));
                    continue;
                }
                Err(e) => {
                    warn!("Embedding batch of {} items failed: {e}", indices.len());
                    let reason = e.to_string();
                    failures.extend(indices.into_iter().map(|index| EmbeddingFailure {
                        index,
                        reason: reason.clone(),
                    }));
                    continue;
                }
            };

            for (index, vector) in indices.into_iter().zip(batch_vectors) {
                match validate_vector(&vector, &mut expected_dim) {
                    Ok(()) => vectors[index] = Some(vector),
                    Err(reason) => failures.push(EmbeddingFailure { index, reason }),
                }
            }
        }

        failures.sort_by_key(|f| f.index);
        EmbeddingBatch { vectors, failures }
    }

    /// Embeds a single text.
    pub async fn embed_one(&self, stage: &str, text: &str) -> Result<Vec<f32>, PipelineError> {
        let mut vectors = self
            .embed_batch(&[text.to_string()])
            .await
            .into_complete(stage)?;
        vectors.pop().ok_or_else(|| PipelineError::EmbeddingUnavailable {
            stage: stage.to_string(),
            failed: 1,
            total: 1,
            reason: "no vector returned".to_string(),
        })
    }
}

fn validate_vector(vector: &[f32], expected_dim: &mut Option<usize>) -> Result<(), String> {
    if vector.is_empty() {
        return Err("provider returned an empty vector".to_string());
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err("vector contains non-finite values".to_string());
    }
    match expected_dim {
        Some(dim) if *dim != vector.len() => Err(format!(
            "vector has dimension {}, expected {dim}",
            vector.len()
        )),
        Some(_) => Ok(()),
        None => {
            *expected_dim = Some(vector.len());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_vector_fixes_dimension_from_first() {
        let mut dim = None;
        assert!(validate_vector(&[0.1, 0.2], &mut dim).is_ok());
        assert_eq!(dim, Some(2));
        assert!(validate_vector(&[0.1, 0.2, 0.3], &mut dim).is_err());
        assert!(validate_vector(&[f32::NAN, 0.2], &mut dim).is_err());
        assert!(validate_vector(&[], &mut dim).is_err());
    }

    #[test]
    fn test_into_complete_reports_failures() {
        let batch = EmbeddingBatch {
            vectors: vec![Some(vec![1.0]), None],
            failures: vec![EmbeddingFailure {
                index: 1,
                reason: "boom".to_string(),
            }],
        };
        match batch.into_complete("chunks") {
            Err(PipelineError::EmbeddingUnavailable {
                stage,
                failed,
                total,
                ..
            }) => {
                assert_eq!(stage, "chunks");
                assert_eq!(failed, 1);
                assert_eq!(total, 2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
