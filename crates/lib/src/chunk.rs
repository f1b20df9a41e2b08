//! # Document Chunking
//!
//! Splits case text into overlapping, fixed-size windows for embedding and retrieval.
//!
//! The strategy works on characters, not bytes:
//! 1. A window of at most `chunk_size` characters is taken from the current position.
//! 2. If the text continues past the window, the window is shortened to end just after
//!    the last paragraph break, line break, sentence end or space found in its second
//!    half, in that order of preference.
//! 3. The next window starts `overlap` characters before the end of the previous one,
//!    so context that straddles a boundary is present in both chunks.
//!
//! Chunk identifiers are a pure function of `(doc_id, sequence_index)`, so re-chunking
//! identical input always yields identical IDs.

use thiserror::Error;
use uuid::Uuid;

/// Break points, most preferred first.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

#[derive(Error, Debug, PartialEq)]
pub enum ChunkError {
    #[error("Text content is empty or only whitespace")]
    EmptyContent,
    #[error("Invalid chunk settings: size {size}, overlap {overlap}")]
    InvalidSettings { size: usize, overlap: usize },
}

/// A chunk before it has been embedded.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDraft {
    pub chunk_id: String,
    pub sequence_index: usize,
    pub text: String,
}

/// The stable identifier of chunk `sequence_index` of document `doc_id`.
pub fn chunk_id(doc_id: &str, sequence_index: usize) -> String {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("{doc_id}#{sequence_index}").as_bytes(),
    )
    .to_string()
}

/// Splits `text` into overlapping chunks with deterministic identifiers.
pub fn chunk_document(
    doc_id: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<ChunkDraft>, ChunkError> {
    if chunk_size == 0 || overlap >= chunk_size {
        return Err(ChunkError::InvalidSettings {
            size: chunk_size,
            overlap,
        });
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ChunkError::EmptyContent);
    }

    let overlap = overlap.min(chunk_size / 2);
    let chars: Vec<char> = trimmed.chars().collect();
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = std::cmp::min(start + chunk_size, chars.len());
        if end < chars.len() {
            if let Some(at) = find_break(&chars, start + chunk_size / 2, end) {
                end = at;
            }
        }

        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }

        if end >= chars.len() {
            break;
        }
        // Always advance, even if the break point landed inside the overlap.
        let next_start = end.saturating_sub(overlap);
        start = if next_start > start { next_start } else { end };
    }

    Ok(pieces
        .into_iter()
        .enumerate()
        .map(|(sequence_index, text)| ChunkDraft {
            chunk_id: chunk_id(doc_id, sequence_index),
            sequence_index,
            text,
        })
        .collect())
}

/// Finds the position just after the last preferred separator in `chars[lo..hi]`.
fn find_break(chars: &[char], lo: usize, hi: usize) -> Option<usize> {
    for separator in SEPARATORS {
        let sep: Vec<char> = separator.chars().collect();
        if hi < lo + sep.len() {
            continue;
        }
        let mut i = hi - sep.len();
        loop {
            if chars[i..i + sep.len()] == sep[..] {
                return Some(i + sep.len());
            }
            if i == lo {
                break;
            }
            i -= 1;
        }
    }
    None
}
