//! # Stores
//!
//! Persistence contracts for the state the pipeline reads and writes: user profiles
//! (quota and published search terms), case documents, and alerts. The vector index
//! contract lives in [`crate::index`]. Two implementations are provided:
//! [`memory::MemoryStore`] for tests and ephemeral runs, and [`sqlite::SqliteStore`]
//! backed by a local turso database.

pub mod memory;
pub mod sqlite;

use crate::{
    errors::StoreError,
    types::{
        Alert, AlertStatus, AlertWrite, CaseDocument, DocumentStatus, QuotaReservation,
        UserProfile,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dyn_clone::DynClone;
use std::fmt::Debug;

#[async_trait]
pub trait ProfileStore: Send + Sync + Debug + DynClone {
    /// Returns the profile, creating it with `default_limit` on first access.
    async fn get_or_create_profile(
        &self,
        user_id: &str,
        default_limit: i64,
    ) -> Result<UserProfile, StoreError>;

    /// Atomically checks `doc_upload_count < doc_upload_limit` and increments the count.
    async fn try_reserve_upload(
        &self,
        user_id: &str,
        default_limit: i64,
    ) -> Result<QuotaReservation, StoreError>;

    /// Gives back a slot taken by `try_reserve_upload` for an upload that failed.
    async fn release_upload(&self, user_id: &str) -> Result<(), StoreError>;

    async fn set_upload_limit(&self, user_id: &str, limit: i64) -> Result<(), StoreError>;

    /// Makes `terms` the user's published search terms for `doc_name`.
    async fn publish_terms(
        &self,
        user_id: &str,
        doc_name: &str,
        terms: &[String],
    ) -> Result<(), StoreError>;
}

dyn_clone::clone_trait_object!(ProfileStore);

#[async_trait]
pub trait DocumentStore: Send + Sync + Debug + DynClone {
    /// Inserts or replaces the document with the same `doc_id`.
    async fn save_document(&self, document: &CaseDocument) -> Result<(), StoreError>;

    async fn update_document_status(
        &self,
        user_id: &str,
        doc_id: &str,
        status: DocumentStatus,
        terms: &[String],
        error: Option<&str>,
    ) -> Result<(), StoreError>;

    /// The user's most recently uploaded document, whatever its status.
    async fn latest_document(&self, user_id: &str) -> Result<Option<CaseDocument>, StoreError>;
}

dyn_clone::clone_trait_object!(DocumentStore);

#[async_trait]
pub trait AlertStore: Send + Sync + Debug + DynClone {
    async fn find_alert(
        &self,
        user_id: &str,
        article_url: &str,
    ) -> Result<Option<Alert>, StoreError>;

    /// Inserts `candidate`, or upgrades the existing alert for the same
    /// `(user_id, article_url)` if the candidate's score is strictly higher.
    /// The check and the write happen atomically.
    async fn upsert_alert(&self, candidate: Alert) -> Result<AlertWrite, StoreError>;

    /// Alerts of the user, newest first.
    async fn list_alerts(
        &self,
        user_id: &str,
        status: Option<AlertStatus>,
        limit: usize,
    ) -> Result<Vec<Alert>, StoreError>;

    /// Marks the user's alert as read. `None` if the user has no such alert.
    async fn mark_alert_read(
        &self,
        user_id: &str,
        alert_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Alert>, StoreError>;

    async fn count_alerts(
        &self,
        user_id: &str,
        status: Option<AlertStatus>,
    ) -> Result<usize, StoreError>;
}

dyn_clone::clone_trait_object!(AlertStore);

/// Applies the upgrade rule to an existing alert. Shared by the store implementations.
pub(crate) fn merge_alert(existing: &Alert, candidate: Alert) -> AlertWrite {
    if candidate.score > existing.score {
        AlertWrite::Updated(Alert {
            alert_id: existing.alert_id.clone(),
            created_at: existing.created_at,
            status: existing.status,
            read_at: existing.read_at,
            ..candidate
        })
    } else {
        AlertWrite::Unchanged(existing.clone())
    }
}
