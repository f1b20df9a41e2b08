//! # SQLite Store
//!
//! A turso-backed implementation of every store trait plus the vector index.
//!
//! Reads open their own connection. Writes additionally take `write_lock`, so
//! read-modify-write sequences such as the quota reservation and the alert upsert
//! are serialized within the process; each runs inside a transaction.
//! Similarity is computed in process over the caller's own rows only.

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
use chrono::{DateTime, SecondsFormat, Utc};
use std::{
    fmt::{self, Debug},
    path::Path,
    sync::Arc,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use turso::{params, Connection, Database, Row, Value};

pub mod sql;

#[derive(Clone)]
pub struct SqliteStore {
    pub db: Database,
    write_lock: Arc<Mutex<()>>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `db_path` and ensures the schema exists.
    ///
    /// Parent directories of a file path are created as needed. Use `":memory:"` for
    /// an isolated in-memory database; clone the store to share it.
    pub async fn new(db_path: &str) -> Result<Self, StoreError> {
        if db_path != ":memory:" {
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
        let db = turso::Builder::new_local(db_path).build().await?;
        // PRAGMA returns a row, so it goes through `query`.
        db.connect()?
            .query("PRAGMA journal_mode=WAL;", ())
            .await?;
        let store = Self {
            db,
            write_lock: Arc::new(Mutex::new(())),
        };
        store.initialize_schema().await?;
        info!("Opened case store at '{db_path}'");
        Ok(store)
    }

    /// Creates all tables. Idempotent.
    pub async fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self.db.connect()?;
        for statement in sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ()).await?;
        }
        Ok(())
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        Ok(self.db.connect()?)
    }

    async fn ensure_profile(
        conn: &Connection,
        user_id: &str,
        default_limit: i64,
    ) -> Result<(), StoreError> {
        conn.execute(
            "INSERT INTO profiles (user_id, doc_upload_limit) VALUES (?, ?)
             ON CONFLICT(user_id) DO NOTHING",
            params![user_id, default_limit],
        )
        .await?;
        Ok(())
    }

    async fn fetch_profile(conn: &Connection, user_id: &str) -> Result<UserProfile, StoreError> {
        let mut rows = conn
            .query(
                &format!("SELECT {} FROM profiles WHERE user_id = ?", sql::PROFILE_COLUMNS),
                params![user_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => profile_from_row(&row),
            None => Err(StoreError::Corrupt(format!(
                "profile for user '{user_id}' vanished"
            ))),
        }
    }

    async fn find_alert_with(
        conn: &Connection,
        user_id: &str,
        article_url: &str,
    ) -> Result<Option<Alert>, StoreError> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM alerts WHERE user_id = ? AND article_url = ?",
                    sql::ALERT_COLUMNS
                ),
                params![user_id, article_url],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(alert_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_alert_by_id(
        conn: &Connection,
        user_id: &str,
        alert_id: &str,
    ) -> Result<Option<Alert>, StoreError> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM alerts WHERE user_id = ? AND alert_id = ?",
                    sql::ALERT_COLUMNS
                ),
                params![user_id, alert_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(alert_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn write_alert(conn: &Connection, write: &AlertWrite) -> Result<(), StoreError> {
        match write {
            AlertWrite::Created(alert) => {
                conn.execute(
                    &format!(
                        "INSERT INTO alerts (dedup_key, {}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                        sql::ALERT_COLUMNS
                    ),
                    params![
                        format!("{}\n{}", alert.user_id, alert.article_url),
                        alert.alert_id.as_str(),
                        alert.user_id.as_str(),
                        alert.article_url.as_str(),
                        alert.link.as_str(),
                        alert.title.as_str(),
                        alert.snippet.as_str(),
                        alert.priority.to_string(),
                        alert.rationale.as_str(),
                        to_json(&alert.matched_chunk_ids)?,
                        alert.related_docs_count as i64,
                        f64::from(alert.score),
                        alert.status.to_string(),
                        timestamp(&alert.created_at),
                        timestamp(&alert.updated_at),
                        optional_timestamp(alert.read_at.as_ref())
                    ],
                )
                .await?;
            }
            AlertWrite::Updated(alert) => {
                conn.execute(
                    "UPDATE alerts SET link = ?, title = ?, snippet = ?, priority = ?, rationale = ?,
                        matched_chunk_ids = ?, related_docs_count = ?, score = ?, updated_at = ?
                     WHERE alert_id = ? AND user_id = ?",
                    params![
                        alert.link.as_str(),
                        alert.title.as_str(),
                        alert.snippet.as_str(),
                        alert.priority.to_string(),
                        alert.rationale.as_str(),
                        to_json(&alert.matched_chunk_ids)?,
                        alert.related_docs_count as i64,
                        f64::from(alert.score),
                        timestamp(&alert.updated_at),
                        alert.alert_id.as_str(),
                        alert.user_id.as_str()
                    ],
                )
                .await?;
            }
            AlertWrite::Unchanged(_) => {}
        }
        Ok(())
    }

    async fn insert_chunks(
        conn: &Connection,
        user_id: &str,
        records: &[IndexRecord],
    ) -> Result<(), StoreError> {
        let mut stmt = conn
            .prepare(
                "INSERT INTO chunks (chunk_id, user_id, doc_id, source, sequence_index, text, embedding)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .await?;
        for record in records {
            conn.execute(
                "DELETE FROM chunks WHERE chunk_id = ? AND user_id = ?",
                params![record.chunk_id.as_str(), user_id],
            )
            .await?;
            let bytes = vector_to_bytes(&record.vector);
            stmt.execute(params![
                record.chunk_id.as_str(),
                user_id,
                record.metadata.doc_id.as_str(),
                record.metadata.source.as_str(),
                record.metadata.sequence_index as i64,
                record.metadata.text.as_str(),
                bytes.as_slice()
            ])
            .await?;
        }
        Ok(())
    }
}

impl Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

/// Commits on success and rolls back on failure.
async fn finish_transaction<T>(
    conn: &Connection,
    result: Result<T, StoreError>,
) -> Result<T, StoreError> {
    match result {
        Ok(value) => {
            conn.execute("COMMIT", ()).await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = conn.execute("ROLLBACK", ()).await {
                warn!("Rollback failed after '{e}': {rollback_err}");
            }
            Err(e)
        }
    }
}

#[async_trait]
impl ProfileStore for SqliteStore {
    async fn get_or_create_profile(
        &self,
        user_id: &str,
        default_limit: i64,
    ) -> Result<UserProfile, StoreError> {
        let conn = self.connect()?;
        {
            let _guard = self.write_lock.lock().await;
            Self::ensure_profile(&conn, user_id, default_limit).await?;
        }
        Self::fetch_profile(&conn, user_id).await
    }

    async fn try_reserve_upload(
        &self,
        user_id: &str,
        default_limit: i64,
    ) -> Result<QuotaReservation, StoreError> {
        let conn = self.connect()?;
        let _guard = self.write_lock.lock().await;
        Self::ensure_profile(&conn, user_id, default_limit).await?;
        // The guard in the WHERE clause makes check-and-increment a single statement.
        let updated = conn
            .execute(
                "UPDATE profiles SET doc_upload_count = doc_upload_count + 1
                 WHERE user_id = ? AND doc_upload_count < doc_upload_limit",
                params![user_id],
            )
            .await?;
        let profile = Self::fetch_profile(&conn, user_id).await?;
        let (used, limit) = (profile.doc_upload_count, profile.doc_upload_limit);
        if updated == 0 {
            debug!("Upload quota exhausted for user {user_id}: {used}/{limit}");
            Ok(QuotaReservation::Exceeded { used, limit })
        } else {
            Ok(QuotaReservation::Reserved { used, limit })
        }
    }

    async fn release_upload(&self, user_id: &str) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let _guard = self.write_lock.lock().await;
        conn.execute(
            "UPDATE profiles SET doc_upload_count = doc_upload_count - 1
             WHERE user_id = ? AND doc_upload_count > 0",
            params![user_id],
        )
        .await?;
        Ok(())
    }

    async fn set_upload_limit(&self, user_id: &str, limit: i64) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let _guard = self.write_lock.lock().await;
        Self::ensure_profile(&conn, user_id, limit).await?;
        conn.execute(
            "UPDATE profiles SET doc_upload_limit = ? WHERE user_id = ?",
            params![limit, user_id],
        )
        .await?;
        Ok(())
    }

    async fn publish_terms(
        &self,
        user_id: &str,
        doc_name: &str,
        terms: &[String],
    ) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let terms_json = to_json(terms)?;
        let _guard = self.write_lock.lock().await;
        Self::ensure_profile(&conn, user_id, 0).await?;
        conn.execute(
            "UPDATE profiles SET extracted_search_terms = ?, monitored_doc_name = ?, terms_updated_at = ?
             WHERE user_id = ?",
            params![terms_json, doc_name, timestamp(&Utc::now()), user_id],
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn save_document(&self, document: &CaseDocument) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let terms_json = to_json(&document.extracted_terms)?;
        let _guard = self.write_lock.lock().await;
        conn.execute(
            &format!(
                "INSERT INTO case_documents ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(doc_id) DO UPDATE SET
                    doc_name = excluded.doc_name,
                    full_text_ref = excluded.full_text_ref,
                    extracted_terms = excluded.extracted_terms,
                    status = excluded.status,
                    error = excluded.error,
                    uploaded_at = excluded.uploaded_at,
                    updated_at = excluded.updated_at",
                sql::DOCUMENT_COLUMNS
            ),
            params![
                document.doc_id.as_str(),
                document.user_id.as_str(),
                document.doc_name.as_str(),
                document.full_text_ref.as_str(),
                terms_json,
                document.status.to_string(),
                document.error.clone().unwrap_or_default(),
                timestamp(&document.uploaded_at),
                timestamp(&document.updated_at)
            ],
        )
        .await?;
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
        let conn = self.connect()?;
        let terms_json = to_json(terms)?;
        let _guard = self.write_lock.lock().await;
        conn.execute(
            "UPDATE case_documents SET status = ?, extracted_terms = ?, error = ?, updated_at = ?
             WHERE user_id = ? AND doc_id = ?",
            params![
                status.to_string(),
                terms_json,
                error.unwrap_or_default(),
                timestamp(&Utc::now()),
                user_id,
                doc_id
            ],
        )
        .await?;
        Ok(())
    }

    async fn latest_document(&self, user_id: &str) -> Result<Option<CaseDocument>, StoreError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM case_documents WHERE user_id = ?
                     ORDER BY uploaded_at DESC LIMIT 1",
                    sql::DOCUMENT_COLUMNS
                ),
                params![user_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(document_from_row(&row)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AlertStore for SqliteStore {
    async fn find_alert(
        &self,
        user_id: &str,
        article_url: &str,
    ) -> Result<Option<Alert>, StoreError> {
        let conn = self.connect()?;
        Self::find_alert_with(&conn, user_id, article_url).await
    }

    async fn upsert_alert(&self, candidate: Alert) -> Result<AlertWrite, StoreError> {
        let conn = self.connect()?;
        let _guard = self.write_lock.lock().await;
        conn.execute("BEGIN TRANSACTION", ()).await?;
        let result = async {
            let write =
                match Self::find_alert_with(&conn, &candidate.user_id, &candidate.article_url)
                    .await?
                {
                    Some(existing) => merge_alert(&existing, candidate),
                    None => AlertWrite::Created(candidate),
                };
            Self::write_alert(&conn, &write).await?;
            Ok(write)
        }
        .await;
        finish_transaction(&conn, result).await
    }

    async fn list_alerts(
        &self,
        user_id: &str,
        status: Option<AlertStatus>,
        limit: usize,
    ) -> Result<Vec<Alert>, StoreError> {
        let conn = self.connect()?;
        let status_filter = status.map(|s| s.to_string()).unwrap_or_default();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM alerts WHERE user_id = ? AND (? = '' OR status = ?)
                     ORDER BY created_at DESC LIMIT ?",
                    sql::ALERT_COLUMNS
                ),
                params![
                    user_id,
                    status_filter.as_str(),
                    status_filter.as_str(),
                    limit as i64
                ],
            )
            .await?;
        let mut alerts = Vec::new();
        while let Some(row) = rows.next().await? {
            alerts.push(alert_from_row(&row)?);
        }
        Ok(alerts)
    }

    async fn mark_alert_read(
        &self,
        user_id: &str,
        alert_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Alert>, StoreError> {
        let conn = self.connect()?;
        let _guard = self.write_lock.lock().await;
        let at = timestamp(&at);
        conn.execute(
            "UPDATE alerts SET status = 'read', read_at = ?, updated_at = ?
             WHERE user_id = ? AND alert_id = ? AND status = 'unread'",
            params![at.as_str(), at.as_str(), user_id, alert_id],
        )
        .await?;
        Self::find_alert_by_id(&conn, user_id, alert_id).await
    }

    async fn count_alerts(
        &self,
        user_id: &str,
        status: Option<AlertStatus>,
    ) -> Result<usize, StoreError> {
        let conn = self.connect()?;
        let status_filter = status.map(|s| s.to_string()).unwrap_or_default();
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM alerts WHERE user_id = ? AND (? = '' OR status = ?)",
                params![user_id, status_filter.as_str(), status_filter.as_str()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(int(&row, 0)?.max(0) as usize),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl VectorIndex for SqliteStore {
    async fn upsert(&self, user_id: &str, records: &[IndexRecord]) -> Result<(), PipelineError> {
        check_ownership(user_id, records)?;
        if records.is_empty() {
            return Ok(());
        }
        let doc_id = records[0].metadata.doc_id.clone();
        let write_failed = |e: StoreError| PipelineError::IndexWriteFailed {
            doc_id: doc_id.clone(),
            reason: e.to_string(),
        };

        let conn = self.connect().map_err(write_failed)?;
        let _guard = self.write_lock.lock().await;
        conn.execute("BEGIN TRANSACTION", ())
            .await
            .map_err(|e| write_failed(e.into()))?;
        let result = Self::insert_chunks(&conn, user_id, records).await;
        finish_transaction(&conn, result)
            .await
            .map_err(write_failed)?;
        debug!("Upserted {} chunks for user {user_id}", records.len());
        Ok(())
    }

    async fn query(
        &self,
        user_id: &str,
        vector: &[f32],
        top_k: usize,
        min_similarity: f32,
    ) -> Result<Vec<IndexMatch>, PipelineError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT chunk_id, doc_id, source, sequence_index, text, embedding
                 FROM chunks WHERE user_id = ?",
                params![user_id],
            )
            .await
            .map_err(StoreError::from)?;
        let mut matches = Vec::new();
        while let Some(row) = rows.next().await.map_err(StoreError::from)? {
            let stored = bytes_to_vector(&blob(&row, 5)?)?;
            matches.push(IndexMatch {
                chunk_id: text(&row, 0)?,
                doc_id: text(&row, 1)?,
                source: text(&row, 2)?,
                sequence_index: int(&row, 3)?.max(0) as usize,
                text: text(&row, 4)?,
                score: cosine_similarity(vector, &stored),
            });
        }
        Ok(rank_matches(matches, top_k, min_similarity))
    }

    async fn delete_document(&self, user_id: &str, doc_id: &str) -> Result<usize, PipelineError> {
        let conn = self.connect()?;
        let _guard = self.write_lock.lock().await;
        let removed = conn
            .execute(
                "DELETE FROM chunks WHERE user_id = ? AND doc_id = ?",
                params![user_id, doc_id],
            )
            .await
            .map_err(|e| PipelineError::IndexWriteFailed {
                doc_id: doc_id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(removed as usize)
    }

    async fn document_chunk_ids(
        &self,
        user_id: &str,
        doc_id: &str,
    ) -> Result<Vec<String>, PipelineError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT chunk_id FROM chunks WHERE user_id = ? AND doc_id = ? ORDER BY chunk_id",
                params![user_id, doc_id],
            )
            .await
            .map_err(StoreError::from)?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next().await.map_err(StoreError::from)? {
            ids.push(text(&row, 0)?);
        }
        Ok(ids)
    }
}

// --- Row mapping ---

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn optional_timestamp(at: Option<&DateTime<Utc>>) -> String {
    at.map(timestamp).unwrap_or_default()
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("invalid timestamp '{raw}': {e}")))
}

fn parse_optional_timestamp(raw: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
    if raw.is_empty() {
        Ok(None)
    } else {
        parse_timestamp(raw).map(Some)
    }
}

fn to_json(values: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(values).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn from_json(raw: &str) -> Result<Vec<String>, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Corrupt(format!("invalid list '{raw}': {e}")))
}

fn parse_enum<T: std::str::FromStr<Err = String>>(raw: &str) -> Result<T, StoreError> {
    raw.parse().map_err(StoreError::Corrupt)
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn text(row: &Row, idx: usize) -> Result<String, StoreError> {
    match row.get_value(idx)? {
        Value::Text(s) => Ok(s),
        Value::Null => Ok(String::new()),
        other => Err(StoreError::Corrupt(format!(
            "expected text in column {idx}, found {other:?}"
        ))),
    }
}

fn int(row: &Row, idx: usize) -> Result<i64, StoreError> {
    match row.get_value(idx)? {
        Value::Integer(i) => Ok(i),
        other => Err(StoreError::Corrupt(format!(
            "expected integer in column {idx}, found {other:?}"
        ))),
    }
}

fn real(row: &Row, idx: usize) -> Result<f64, StoreError> {
    match row.get_value(idx)? {
        Value::Real(f) => Ok(f),
        Value::Integer(i) => Ok(i as f64),
        other => Err(StoreError::Corrupt(format!(
            "expected real in column {idx}, found {other:?}"
        ))),
    }
}

fn blob(row: &Row, idx: usize) -> Result<Vec<u8>, StoreError> {
    match row.get_value(idx)? {
        Value::Blob(b) => Ok(b),
        other => Err(StoreError::Corrupt(format!(
            "expected blob in column {idx}, found {other:?}"
        ))),
    }
}

fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn bytes_to_vector(bytes: &[u8]) -> Result<Vec<f32>, StoreError> {
    if bytes.len() % 4 != 0 {
        return Err(StoreError::Corrupt(format!(
            "embedding blob has {} bytes, not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

fn profile_from_row(row: &Row) -> Result<UserProfile, StoreError> {
    Ok(UserProfile {
        user_id: text(row, 0)?,
        doc_upload_count: int(row, 1)?,
        doc_upload_limit: int(row, 2)?,
        extracted_search_terms: from_json(&text(row, 3)?)?,
        monitored_doc_name: non_empty(text(row, 4)?),
        terms_updated_at: parse_optional_timestamp(&text(row, 5)?)?,
    })
}

fn document_from_row(row: &Row) -> Result<CaseDocument, StoreError> {
    Ok(CaseDocument {
        doc_id: text(row, 0)?,
        user_id: text(row, 1)?,
        doc_name: text(row, 2)?,
        full_text_ref: text(row, 3)?,
        extracted_terms: from_json(&text(row, 4)?)?,
        status: parse_enum(&text(row, 5)?)?,
        error: non_empty(text(row, 6)?),
        uploaded_at: parse_timestamp(&text(row, 7)?)?,
        updated_at: parse_timestamp(&text(row, 8)?)?,
    })
}

fn alert_from_row(row: &Row) -> Result<Alert, StoreError> {
    Ok(Alert {
        alert_id: text(row, 0)?,
        user_id: text(row, 1)?,
        article_url: text(row, 2)?,
        link: text(row, 3)?,
        title: text(row, 4)?,
        snippet: text(row, 5)?,
        priority: parse_enum(&text(row, 6)?)?,
        rationale: text(row, 7)?,
        matched_chunk_ids: from_json(&text(row, 8)?)?,
        related_docs_count: int(row, 9)?.max(0) as usize,
        score: real(row, 10)? as f32,
        status: parse_enum(&text(row, 11)?)?,
        created_at: parse_timestamp(&text(row, 12)?)?,
        updated_at: parse_timestamp(&text(row, 13)?)?,
        read_at: parse_optional_timestamp(&text(row, 14)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_bytes_round_trip() {
        let v = vec![0.25f32, -1.5, 3.0];
        assert_eq!(bytes_to_vector(&vector_to_bytes(&v)).unwrap(), v);
        assert!(bytes_to_vector(&[0, 1, 2]).is_err());
    }

    #[test]
    fn test_timestamps_sort_as_text() {
        let earlier = parse_timestamp("2026-01-01T00:00:00.000001Z").unwrap();
        let later = parse_timestamp("2026-01-01T00:00:00.5Z").unwrap();
        assert!(timestamp(&earlier) < timestamp(&later));
        assert_eq!(parse_optional_timestamp("").unwrap(), None);
    }
}
