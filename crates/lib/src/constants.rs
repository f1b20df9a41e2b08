//! # Shared Constants
//!
//! Fixed limits shared across the pipeline stages and the server. Tunable values
//! live in [`crate::settings::PipelineSettings`] instead.

/// The default path for the main application SQLite database.
pub const DEFAULT_DB_FILE: &str = "db/casewatch.db";

/// Only this many leading characters of a document are sent to entity recognition.
pub const NER_INPUT_CHARS: usize = 15_000;

/// Only this many leading characters of a document are sent for concept generation.
pub const CONCEPT_INPUT_CHARS: usize = 8_000;

/// Upper bound on concepts accepted from a single generation call.
pub const MAX_CONCEPTS: usize = 15;

/// Entities this short (or shorter) are noise from the recognizer.
pub const MIN_ENTITY_CHARS: usize = 3;

/// Terms shorter than this are dropped during the merge.
pub const MIN_TERM_CHARS: usize = 3;

/// Hard cap on items per embedding request, regardless of configuration.
pub const MAX_EMBED_BATCH: usize = 100;

/// Chunk text stored as index metadata is truncated to this many characters.
pub const CHUNK_METADATA_TEXT_CHARS: usize = 1_000;

/// Each matched chunk contributes at most this many characters to the rationale prompt.
pub const RATIONALE_CONTEXT_CHARS: usize = 500;

/// The web search capability returns results in pages of this size.
pub const SEARCH_PAGE_SIZE: usize = 10;

/// Marker the generator uses to say an article has no material impact.
pub const NO_IMPACT_MARKER: &str = "NO_IMPACT";

/// Entity labels kept from the recognizer: statutes, provisions, cases and institutions.
pub const PUBLIC_PILLAR_LABELS: &[&str] = &[
    "LAW",
    "ACT",
    "STATUTE",
    "SECTION",
    "CLAUSE",
    "PROVISION",
    "CASE",
    "PRECEDENT",
    "COURT",
    "JUDGE",
    "ORGANIZATION",
];

/// Labels that identify parties or private persons. Never kept, whatever the allow-list says.
pub const PARTY_LABELS: &[&str] = &[
    "PETITIONER",
    "RESPONDENT",
    "WITNESS",
    "LAWYER",
    "OTHER_PERSON",
    "PERSON",
];

/// Upper bound on the recency window of a search, in days.
pub const MAX_DAYS_BACK: u32 = 30;

/// Upper bound on articles requested from a single search.
pub const MAX_SEARCH_RESULTS: usize = 50;

/// Upper bound on alerts returned from one inbox listing.
pub const MAX_ALERTS_PAGE: usize = 100;

/// Maximum length of a document name.
pub const MAX_DOC_NAME_CHARS: usize = 255;

/// Alerts returned from one inbox listing when no limit is given.
pub const DEFAULT_ALERTS_PAGE: usize = 50;
