//! Schema for the turso-backed store.
//!
//! Optional text columns use `''` for "absent". Timestamps are RFC 3339 strings with
//! a fixed fractional width, so they order correctly as text.

pub const CREATE_PROFILES_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS profiles (
        user_id TEXT PRIMARY KEY,
        doc_upload_count INTEGER NOT NULL DEFAULT 0,
        doc_upload_limit INTEGER NOT NULL,
        extracted_search_terms TEXT NOT NULL DEFAULT '[]',
        monitored_doc_name TEXT NOT NULL DEFAULT '',
        terms_updated_at TEXT NOT NULL DEFAULT ''
    );
";

pub const CREATE_CASE_DOCUMENTS_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS case_documents (
        doc_id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        doc_name TEXT NOT NULL,
        full_text_ref TEXT NOT NULL,
        extracted_terms TEXT NOT NULL DEFAULT '[]',
        status TEXT NOT NULL,
        error TEXT NOT NULL DEFAULT '',
        uploaded_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
";

/// Chunk vectors are little-endian `f32` blobs.
pub const CREATE_CHUNKS_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS chunks (
        chunk_id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        doc_id TEXT NOT NULL,
        source TEXT NOT NULL,
        sequence_index INTEGER NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL
    );
";

/// `dedup_key` is `user_id` and `article_url` joined by a newline.
pub const CREATE_ALERTS_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS alerts (
        alert_id TEXT PRIMARY KEY,
        dedup_key TEXT NOT NULL UNIQUE,
        user_id TEXT NOT NULL,
        article_url TEXT NOT NULL,
        link TEXT NOT NULL,
        title TEXT NOT NULL,
        snippet TEXT NOT NULL,
        priority TEXT NOT NULL,
        rationale TEXT NOT NULL,
        matched_chunk_ids TEXT NOT NULL DEFAULT '[]',
        related_docs_count INTEGER NOT NULL,
        score REAL NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        read_at TEXT NOT NULL DEFAULT ''
    );
";

pub const ALL_TABLE_CREATION_SQL: &[&str] = &[
    CREATE_PROFILES_TABLE_SQL,
    CREATE_CASE_DOCUMENTS_TABLE_SQL,
    CREATE_CHUNKS_TABLE_SQL,
    CREATE_ALERTS_TABLE_SQL,
];

pub const PROFILE_COLUMNS: &str = "user_id, doc_upload_count, doc_upload_limit, \
    extracted_search_terms, monitored_doc_name, terms_updated_at";

pub const DOCUMENT_COLUMNS: &str = "doc_id, user_id, doc_name, full_text_ref, extracted_terms, \
    status, error, uploaded_at, updated_at";

pub const ALERT_COLUMNS: &str = "alert_id, user_id, article_url, link, title, snippet, priority, \
    rationale, matched_chunk_ids, related_docs_count, score, status, created_at, updated_at, read_at";
