//! # Vector Index Adapter
//!
//! The per-user namespaced vector index. Every operation takes the owning `user_id`
//! and implementations enforce the namespace themselves: a query for one user can
//! never see another user's chunks, whatever the caller passes in.

use crate::{errors::PipelineError, types::IndexMatch, types::IndexRecord};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::cmp::Ordering;
use std::fmt::Debug;

#[async_trait]
pub trait VectorIndex: Send + Sync + Debug + DynClone {
    /// Writes `records` into the namespace of `user_id`, overwriting equal chunk IDs.
    ///
    /// Fails with `IndexWriteFailed` and writes nothing if any record belongs to
    /// another user.
    async fn upsert(&self, user_id: &str, records: &[IndexRecord]) -> Result<(), PipelineError>;

    /// The `top_k` chunks of `user_id` most similar to `vector` with a score of at
    /// least `min_similarity`, best first.
    async fn query(
        &self,
        user_id: &str,
        vector: &[f32],
        top_k: usize,
        min_similarity: f32,
    ) -> Result<Vec<IndexMatch>, PipelineError>;

    /// Removes every chunk of `doc_id` from the namespace; returns how many were removed.
    async fn delete_document(&self, user_id: &str, doc_id: &str) -> Result<usize, PipelineError>;

    /// The chunk IDs currently stored for `doc_id`, sorted.
    async fn document_chunk_ids(
        &self,
        user_id: &str,
        doc_id: &str,
    ) -> Result<Vec<String>, PipelineError>;
}

dyn_clone::clone_trait_object!(VectorIndex);

/// Cosine similarity of two vectors; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

/// Rejects records whose metadata names a different owner than the namespace.
pub fn check_ownership(user_id: &str, records: &[IndexRecord]) -> Result<(), PipelineError> {
    if let Some(foreign) = records.iter().find(|r| r.metadata.user_id != user_id) {
        return Err(PipelineError::IndexWriteFailed {
            doc_id: foreign.metadata.doc_id.clone(),
            reason: format!(
                "chunk {} is owned by another user and cannot be written to this namespace",
                foreign.chunk_id
            ),
        });
    }
    Ok(())
}

/// Keeps matches at or above the floor, best first (ties by chunk ID), at most `top_k`.
pub fn rank_matches(mut matches: Vec<IndexMatch>, top_k: usize, min_similarity: f32) -> Vec<IndexMatch> {
    matches.retain(|m| m.score >= min_similarity);
    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    matches.truncate(top_k);
    matches
}
