//! An in-process store that keeps everything behind one mutex. Every operation
//! runs under the lock, which makes the quota reservation and the alert upsert
//! trivially atomic.

use super::{merge_alert, AlertStore, DocumentStore, ProfileStore};
use crate::{
    errors::{PipelineError, StoreError},
    index::{check_ownership, cosine_similarity, rank_matches, VectorIndex},
    types::{
        Alert, AlertStatus, AlertWrite, CaseDocument, DocumentStatus, IndexMatch, IndexRecord,
        QuotaReservation, UserProfile,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
    profiles: HashMap<String, UserProfile>,
    documents: HashMap<(String, String), CaseDocument>,
    /// Keyed by `(user_id, chunk_id)`; the BTreeMap keeps scans deterministic.
    chunks: BTreeMap<(String, String), IndexRecord>,
    alerts: Vec<Alert>,
}

/// A cloneable handle; clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Corrupt("memory store lock poisoned".to_string()))
    }
}

fn profile_entry<'a>(state: &'a mut State, user_id: &str, default_limit: i64) -> &'a mut UserProfile {
    state
        .profiles
        .entry(user_id.to_string())
        .or_insert_with(|| UserProfile::new(user_id, default_limit))
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_or_create_profile(
        &self,
        user_id: &str,
        default_limit: i64,
    ) -> Result<UserProfile, StoreError> {
        let mut state = self.lock()?;
        Ok(profile_entry(&mut state, user_id, default_limit).clone())
    }

    async fn try_reserve_upload(
        &self,
        user_id: &str,
        default_limit: i64,
    ) -> Result<QuotaReservation, StoreError> {
        let mut state = self.lock()?;
        let profile = profile_entry(&mut state, user_id, default_limit);
        if profile.doc_upload_count >= profile.doc_upload_limit {
            return Ok(QuotaReservation::Exceeded {
                used: profile.doc_upload_count,
                limit: profile.doc_upload_limit,
            });
        }
        profile.doc_upload_count += 1;
        Ok(QuotaReservation::Reserved {
            used: profile.doc_upload_count,
            limit: profile.doc_upload_limit,
        })
    }

    async fn release_upload(&self, user_id: &str) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if let Some(profile) = state.profiles.get_mut(user_id) {
            profile.doc_upload_count = (profile.doc_upload_count - 1).max(0);
        }
        Ok(())
    }

    async fn set_upload_limit(&self, user_id: &str, limit: i64) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        profile_entry(&mut state, user_id, limit).doc_upload_limit = limit;
        Ok(())
    }

    async fn publish_terms(
        &self,
        user_id: &str,
        doc_name: &str,
        terms: &[String],
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let profile = profile_entry(&mut state, user_id, 0);
        profile.extracted_search_terms = terms.to_vec();
        profile.monitored_doc_name = Some(doc_name.to_string());
        profile.terms_updated_at = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn save_document(&self, document: &CaseDocument) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.documents.insert(
            (document.user_id.clone(), document.doc_id.clone()),
            document.clone(),
        );
        Ok(())
    }

    async fn update_document_status(
        &self,
        user_id: &str,
        doc_id: &str,
        status: DocumentStatus,
        terms: &[String],
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if let Some(doc) = state
            .documents
            .get_mut(&(user_id.to_string(), doc_id.to_string()))
        {
            doc.status = status;
            doc.extracted_terms = terms.to_vec();
            doc.error = error.map(str::to_string);
            doc.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn latest_document(&self, user_id: &str) -> Result<Option<CaseDocument>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .documents
            .values()
            .filter(|d| d.user_id == user_id)
            .max_by_key(|d| d.uploaded_at)
            .cloned())
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn find_alert(
        &self,
        user_id: &str,
        article_url: &str,
    ) -> Result<Option<Alert>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .alerts
            .iter()
            .find(|a| a.user_id == user_id && a.article_url == article_url)
            .cloned())
    }

    async fn upsert_alert(&self, candidate: Alert) -> Result<AlertWrite, StoreError> {
        let mut state = self.lock()?;
        let existing = state
            .alerts
            .iter_mut()
            .find(|a| a.user_id == candidate.user_id && a.article_url == candidate.article_url);
        match existing {
            Some(slot) => {
                let write = merge_alert(slot, candidate);
                if let AlertWrite::Updated(updated) = &write {
                    *slot = updated.clone();
                }
                Ok(write)
            }
            None => {
                state.alerts.push(candidate.clone());
                Ok(AlertWrite::Created(candidate))
            }
        }
    }

    async fn list_alerts(
        &self,
        user_id: &str,
        status: Option<AlertStatus>,
        limit: usize,
    ) -> Result<Vec<Alert>, StoreError> {
        let state = self.lock()?;
        let mut alerts: Vec<Alert> = state
            .alerts
            .iter()
            .filter(|a| a.user_id == user_id && status.is_none_or(|s| a.status == s))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts.truncate(limit);
        Ok(alerts)
    }

    async fn mark_alert_read(
        &self,
        user_id: &str,
        alert_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Alert>, StoreError> {
        let mut state = self.lock()?;
        let Some(alert) = state
            .alerts
            .iter_mut()
            .find(|a| a.user_id == user_id && a.alert_id == alert_id)
        else {
            return Ok(None);
        };
        if alert.status == AlertStatus::Unread {
            alert.status = AlertStatus::Read;
            alert.read_at = Some(at);
            alert.updated_at = at;
        }
        Ok(Some(alert.clone()))
    }

    async fn count_alerts(
        &self,
        user_id: &str,
        status: Option<AlertStatus>,
    ) -> Result<usize, StoreError> {
        let state = self.lock()?;
        Ok(state
            .alerts
            .iter()
            .filter(|a| a.user_id == user_id && status.is_none_or(|s| a.status == s))
            .count())
    }
}

#[async_trait]
impl VectorIndex for MemoryStore {
    async fn upsert(&self, user_id: &str, records: &[IndexRecord]) -> Result<(), PipelineError> {
        check_ownership(user_id, records)?;
        let mut state = self.lock()?;
        for record in records {
            state
                .chunks
                .insert((user_id.to_string(), record.chunk_id.clone()), record.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        user_id: &str,
        vector: &[f32],
        top_k: usize,
        min_similarity: f32,
    ) -> Result<Vec<IndexMatch>, PipelineError> {
        let state = self.lock()?;
        let matches = state
            .chunks
            .iter()
            .filter(|((owner, _), _)| owner == user_id)
            .map(|(_, record)| IndexMatch {
                chunk_id: record.chunk_id.clone(),
                doc_id: record.metadata.doc_id.clone(),
                source: record.metadata.source.clone(),
                sequence_index: record.metadata.sequence_index,
                text: record.metadata.text.clone(),
                score: cosine_similarity(vector, &record.vector),
            })
            .collect();
        Ok(rank_matches(matches, top_k, min_similarity))
    }

    async fn delete_document(&self, user_id: &str, doc_id: &str) -> Result<usize, PipelineError> {
        let mut state = self.lock()?;
        let before = state.chunks.len();
        state
            .chunks
            .retain(|(owner, _), record| !(owner == user_id && record.metadata.doc_id == doc_id));
        Ok(before - state.chunks.len())
    }

    async fn document_chunk_ids(
        &self,
        user_id: &str,
        doc_id: &str,
    ) -> Result<Vec<String>, PipelineError> {
        let state = self.lock()?;
        Ok(state
            .chunks
            .iter()
            .filter(|((owner, _), record)| owner == user_id && record.metadata.doc_id == doc_id)
            .map(|((_, chunk_id), _)| chunk_id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkMetadata, Priority};

    fn record(user: &str, doc: &str, id: &str, vector: Vec<f32>) -> IndexRecord {
        IndexRecord {
            chunk_id: id.to_string(),
            vector,
            metadata: ChunkMetadata {
                user_id: user.to_string(),
                doc_id: doc.to_string(),
                source: "case.txt".to_string(),
                sequence_index: 0,
                text: format!("text of {id}"),
            },
        }
    }

    fn alert(user: &str, url: &str, score: f32) -> Alert {
        let now = Utc::now();
        Alert {
            alert_id: format!("{user}-{score}"),
            user_id: user.to_string(),
            article_url: url.to_string(),
            link: url.to_string(),
            title: "Ruling".to_string(),
            snippet: "snippet".to_string(),
            priority: Priority::Medium,
            rationale: "rationale".to_string(),
            matched_chunk_ids: vec!["c1".to_string()],
            related_docs_count: 1,
            score,
            status: AlertStatus::Unread,
            created_at: now,
            updated_at: now,
            read_at: None,
        }
    }

    #[tokio::test]
    async fn test_quota_reservation_stops_at_limit() {
        let store = MemoryStore::new();
        assert_eq!(
            store.try_reserve_upload("u1", 1).await.unwrap(),
            QuotaReservation::Reserved { used: 1, limit: 1 }
        );
        assert_eq!(
            store.try_reserve_upload("u1", 1).await.unwrap(),
            QuotaReservation::Exceeded { used: 1, limit: 1 }
        );
        store.release_upload("u1").await.unwrap();
        assert!(matches!(
            store.try_reserve_upload("u1", 1).await.unwrap(),
            QuotaReservation::Reserved { .. }
        ));
    }

    #[tokio::test]
    async fn test_query_is_scoped_to_namespace() {
        let store = MemoryStore::new();
        store
            .upsert("alice", &[record("alice", "d1", "a1", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert("bob", &[record("bob", "d2", "b1", vec![1.0, 0.0])])
            .await
            .unwrap();

        let hits = store.query("alice", &[1.0, 0.0], 10, 0.0).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "a1");
    }

    #[tokio::test]
    async fn test_delete_document_removes_only_that_document() {
        let store = MemoryStore::new();
        store
            .upsert(
                "alice",
                &[
                    record("alice", "d1", "a1", vec![1.0]),
                    record("alice", "d2", "a2", vec![1.0]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(store.delete_document("alice", "d1").await.unwrap(), 1);
        assert_eq!(
            store.document_chunk_ids("alice", "d2").await.unwrap(),
            vec!["a2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_upsert_alert_only_upgrades_on_higher_score() {
        let store = MemoryStore::new();
        let url = "https://example.com/a";
        assert!(matches!(
            store.upsert_alert(alert("u1", url, 0.80)).await.unwrap(),
            AlertWrite::Created(_)
        ));
        assert!(matches!(
            store.upsert_alert(alert("u1", url, 0.80)).await.unwrap(),
            AlertWrite::Unchanged(_)
        ));
        match store.upsert_alert(alert("u1", url, 0.92)).await.unwrap() {
            AlertWrite::Updated(updated) => {
                assert_eq!(updated.alert_id, "u1-0.8");
                assert!((updated.score - 0.92).abs() < 1e-6);
            }
            other => panic!("expected update, got {other:?}"),
        }
        assert_eq!(store.count_alerts("u1", None).await.unwrap(), 1);
    }
}
