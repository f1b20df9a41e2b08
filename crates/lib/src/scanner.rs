//! # Source Scanner
//!
//! Builds a web search query from a user's published terms and collects recent,
//! deduplicated articles from the search capability.

use crate::{
    call::CallPolicy,
    canonical::canonicalize_url,
    constants::SEARCH_PAGE_SIZE,
    errors::PipelineError,
    providers::search::{SearchRequest, WebSearch},
    types::Article,
};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// The search API serves at most 100 results per query (`start + num <= 101`).
const LAST_PAGE_START: usize = 91;

/// Characters that would change the meaning of the query; replaced with spaces.
const QUERY_BREAKING: &[char] = &[
    '(', ')', '[', ']', '{', '}', '<', '>', '|', '^', '~', '*', ':', ';', '!', '&', '=', '?',
];

const BARE_OPERATORS: &[&str] = &["OR", "AND", "NOT"];

#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub search_query: String,
    pub articles: Vec<Article>,
}

/// Sanitizes one term. `None` if nothing usable remains.
pub fn sanitize_term(term: &str) -> Option<String> {
    let cleaned: String = term
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .map(|c| if QUERY_BREAKING.contains(&c) { ' ' } else { c })
        .collect();
    let collapsed = cleaned
        .split_whitespace()
        .map(|word| word.trim_start_matches(['-', '+']))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if collapsed.is_empty() || BARE_OPERATORS.contains(&collapsed.to_ascii_uppercase().as_str()) {
        return None;
    }
    Some(collapsed)
}

/// Joins sanitized terms with ` OR `, quoting multi-word terms.
///
/// Uses at most `max_terms` terms; a term that would push the query past
/// `max_chars` is skipped. Returns `None` when no term is usable.
pub fn build_search_query(terms: &[String], max_terms: usize, max_chars: usize) -> Option<String> {
    let mut query = String::new();
    let mut used = 0;
    for term in terms.iter().filter_map(|t| sanitize_term(t)) {
        if used == max_terms {
            break;
        }
        let piece = if term.contains(' ') {
            format!("\"{term}\"")
        } else {
            term
        };
        let separator = if query.is_empty() { "" } else { " OR " };
        if query.chars().count() + separator.len() + piece.chars().count() > max_chars {
            debug!("Skipping search term {piece} to stay within {max_chars} characters");
            continue;
        }
        query.push_str(separator);
        query.push_str(&piece);
        used += 1;
    }
    if query.is_empty() {
        None
    } else {
        Some(query)
    }
}

pub struct Scanner<'a> {
    pub search: &'a dyn WebSearch,
    pub policy: &'a CallPolicy,
}

impl Scanner<'_> {
    /// Pages through results until `max_results` unique articles are collected or
    /// the source runs dry.
    pub async fn scan(
        &self,
        search_query: &str,
        days_back: u32,
        max_results: usize,
    ) -> Result<ScanResult, PipelineError> {
        let mut articles = Vec::new();
        let mut seen = HashSet::new();
        let mut start = 1;

        while articles.len() < max_results && start <= LAST_PAGE_START {
            let request = SearchRequest {
                query: search_query.to_string(),
                days_back,
                start,
                num: SEARCH_PAGE_SIZE,
            };
            let hits = match self
                .policy
                .retrying("web search", || self.search.search(&request))
                .await
            {
                Ok(hits) => hits,
                Err(e) if start == 1 => {
                    return Err(PipelineError::SearchUnavailable(e.to_string()));
                }
                Err(e) => {
                    warn!(
                        "Search page starting at {start} failed, keeping {} articles: {e}",
                        articles.len()
                    );
                    break;
                }
            };
            let page_len = hits.len();

            for hit in hits {
                if hit.link.trim().is_empty() || hit.title.trim().is_empty() {
                    continue;
                }
                if !seen.insert(canonicalize_url(&hit.link)) {
                    continue;
                }
                articles.push(Article {
                    title: hit.title,
                    link: hit.link,
                    snippet: hit.snippet,
                    published_at: hit.published_at,
                });
                if articles.len() == max_results {
                    break;
                }
            }

            if page_len < SEARCH_PAGE_SIZE {
                break;
            }
            start += SEARCH_PAGE_SIZE;
        }

        info!(
            "Found {} articles from the last {days_back} days",
            articles.len()
        );
        Ok(ScanResult {
            search_query: search_query.to_string(),
            articles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_multi_word_terms_are_quoted() {
        let query = build_search_query(&terms(&["Section 498A IPC", "Dowry"]), 10, 1900);
        assert_eq!(query.as_deref(), Some("\"Section 498A IPC\" OR Dowry"));
    }

    #[test]
    fn test_breaking_characters_are_escaped_or_dropped() {
        assert_eq!(
            sanitize_term("  \"Art. 21\" (Constitution)\\ ").as_deref(),
            Some("Art. 21 Constitution")
        );
        assert_eq!(sanitize_term("-bail +jail").as_deref(), Some("bail jail"));
        assert_eq!(sanitize_term("OR"), None);
        assert_eq!(sanitize_term(" ** "), None);
    }

    #[test]
    fn test_term_and_length_caps() {
        let many: Vec<String> = (0..15).map(|i| format!("t{i}x")).collect();
        let query = build_search_query(&many, 10, 1900).unwrap();
        assert_eq!(query.split(" OR ").count(), 10);

        let query = build_search_query(&terms(&["alpha", "a very long term indeed", "beta"]), 10, 16)
            .unwrap();
        assert_eq!(query, "alpha OR beta");
    }

    #[test]
    fn test_no_usable_terms() {
        assert_eq!(build_search_query(&terms(&["", "\"\"", "AND"]), 10, 1900), None);
        assert_eq!(build_search_query(&[], 10, 1900), None);
    }
}
