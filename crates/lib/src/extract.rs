//! # Entity and Concept Extraction
//!
//! Turns raw case text into a short, ordered list of search terms. Two sources are
//! merged: named legal entities from the recognizer (restricted to the public-pillar
//! labels) and higher-level concepts proposed by the generative provider.

use crate::{
    call::CallPolicy,
    constants::{
        CONCEPT_INPUT_CHARS, MAX_CONCEPTS, MIN_ENTITY_CHARS, MIN_TERM_CHARS, NER_INPUT_CHARS,
        PARTY_LABELS, PUBLIC_PILLAR_LABELS,
    },
    errors::{PipelineError, ProviderError},
    prompts::{render, PromptPair},
    providers::{
        ai::AiProvider,
        ner::{EntityRecognizer, RecognizedEntity},
    },
};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{info, warn};

static CODE_FENCE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z]*\s*([\s\S]*?)\s*```"));

/// Terms extracted from one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub terms: Vec<String>,
    pub entity_count: usize,
    pub concept_count: usize,
    /// Entity recognition was unavailable and extraction ran on concepts only.
    pub ner_degraded: bool,
}

pub struct Extractor<'a> {
    pub recognizer: Option<&'a dyn EntityRecognizer>,
    pub generator: &'a dyn AiProvider,
    pub prompts: &'a PromptPair,
    pub policy: &'a CallPolicy,
    pub max_terms: usize,
}

impl Extractor<'_> {
    pub async fn extract(&self, text: &str) -> Result<Extraction, PipelineError> {
        let (entities, ner_error) = match self.recognizer {
            Some(recognizer) => {
                let sample = truncate_chars(text, NER_INPUT_CHARS);
                match self
                    .policy
                    .once("entity recognition", recognizer.recognize(sample))
                    .await
                {
                    Ok(raw) => (filter_entities(&raw), None),
                    Err(e) => {
                        warn!("Entity recognition unavailable, continuing with concepts only: {e}");
                        (Vec::new(), Some(e))
                    }
                }
            }
            None => (Vec::new(), None),
        };
        let ner_degraded = self.recognizer.is_none() || ner_error.is_some();

        let (concepts, concept_error) = match self.generate_concepts(text, &entities).await {
            Ok(concepts) => (concepts, None),
            Err(e) => {
                warn!("Concept generation failed: {e}");
                (Vec::new(), Some(e))
            }
        };

        let terms = merge_terms(&entities, &concepts, self.max_terms);
        if terms.is_empty() {
            let reason = match (ner_error, concept_error) {
                (Some(n), Some(c)) => format!("entity recognition failed ({n}); concept generation failed ({c})"),
                (None, Some(c)) => format!("no entities found and concept generation failed ({c})"),
                _ => "no usable search terms were found in the document".to_string(),
            };
            return Err(PipelineError::ExtractionFailed(reason));
        }

        info!(
            "Extracted {} search terms ({} entities, {} concepts, degraded: {ner_degraded})",
            terms.len(),
            entities.len(),
            concepts.len()
        );
        Ok(Extraction {
            terms,
            entity_count: entities.len(),
            concept_count: concepts.len(),
            ner_degraded,
        })
    }

    async fn generate_concepts(
        &self,
        text: &str,
        entities: &[String],
    ) -> Result<Vec<String>, ProviderError> {
        let entity_list = if entities.is_empty() {
            "(none)".to_string()
        } else {
            entities.join(", ")
        };
        let user_prompt = render(
            &self.prompts.user_prompt,
            &[
                ("entities", entity_list.as_str()),
                ("text", truncate_chars(text, CONCEPT_INPUT_CHARS)),
            ],
        );
        let raw = self
            .policy
            .once(
                "concept generation",
                self.generator
                    .generate(&self.prompts.system_prompt, &user_prompt),
            )
            .await?;
        Ok(parse_concepts(&raw))
    }
}

/// Returns the leading `max_chars` characters of `text`.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

fn normalize_label(label: &str) -> String {
    let upper = label.trim().to_ascii_uppercase();
    upper
        .strip_prefix("B-")
        .or_else(|| upper.strip_prefix("I-"))
        .unwrap_or(&upper)
        .to_string()
}

/// Keeps public-pillar entities, dropping party labels and very short spans.
pub fn filter_entities(entities: &[RecognizedEntity]) -> Vec<String> {
    entities
        .iter()
        .filter(|e| {
            let label = normalize_label(&e.label);
            PUBLIC_PILLAR_LABELS.contains(&label.as_str())
                && !PARTY_LABELS.contains(&label.as_str())
        })
        .map(|e| e.text.trim().to_string())
        .filter(|t| t.chars().count() > MIN_ENTITY_CHARS)
        .collect()
}

/// Strips a leading `1.`, `2)`, `-`, `*` or `•` list marker.
fn strip_list_marker(item: &str) -> &str {
    let digits = item.len() - item.trim_start_matches(|ch: char| ch.is_ascii_digit()).len();
    if digits > 0 {
        if let Some(rest) = item[digits..]
            .strip_prefix('.')
            .or_else(|| item[digits..].strip_prefix(')'))
        {
            return rest.trim_start();
        }
        return item;
    }
    item.trim_start_matches(['-', '*', '•']).trim_start()
}

/// Returns the body of a fenced code block if the answer has one.
fn strip_code_fence(raw: &str) -> &str {
    CODE_FENCE
        .as_ref()
        .ok()
        .and_then(|re| re.captures(raw))
        .and_then(|c| c.get(1))
        .map_or(raw, |m| m.as_str())
}

/// Parses a comma or newline separated concept list from a generator answer.
pub fn parse_concepts(raw: &str) -> Vec<String> {
    strip_code_fence(raw)
        .split([',', '\n'])
        .map(|c| {
            strip_list_marker(c.trim())
                .trim_matches(|ch: char| matches!(ch, '"' | '\'' | '`'))
                .trim()
                .to_string()
        })
        .filter(|c| !c.is_empty())
        .take(MAX_CONCEPTS)
        .collect()
}

/// Trims, collapses inner whitespace and strips surrounding punctuation.
pub fn normalize_term(term: &str) -> String {
    let collapsed = term.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|ch: char| ch.is_ascii_punctuation() && ch != ')' && ch != '(')
        .trim()
        .to_string()
}

/// Entities first, then concepts; deduplicated case-insensitively and capped.
pub fn merge_terms(entities: &[String], concepts: &[String], max_terms: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    entities
        .iter()
        .chain(concepts.iter())
        .map(|t| normalize_term(t))
        .filter(|t| t.chars().count() >= MIN_TERM_CHARS)
        .filter(|t| seen.insert(t.to_lowercase()))
        .take(max_terms)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(text: &str, label: &str) -> RecognizedEntity {
        RecognizedEntity {
            text: text.to_string(),
            label: label.to_string(),
            score: None,
        }
    }

    #[test]
    fn test_filter_entities_keeps_pillars_only() {
        let raw = vec![
            entity("Section 498A IPC", "SECTION"),
            entity("Ramesh Kumar", "PETITIONER"),
            entity("Supreme Court of India", "B-COURT"),
            entity("IPC", "STATUTE"),
            entity("State of Punjab", "RESPONDENT"),
        ];
        assert_eq!(
            filter_entities(&raw),
            vec!["Section 498A IPC", "Supreme Court of India"]
        );
    }

    #[test]
    fn test_parse_concepts_strips_markers() {
        let raw = "1. Dowry Death, \"cruelty by husband\"\n- burden of proof, ";
        assert_eq!(
            parse_concepts(raw),
            vec!["Dowry Death", "cruelty by husband", "burden of proof"]
        );
    }

    #[test]
    fn test_parse_concepts_unwraps_code_fence() {
        let raw = "Here you go:\n```text\nanticipatory bail, Section 438 CrPC\n```";
        assert_eq!(
            parse_concepts(raw),
            vec!["anticipatory bail", "Section 438 CrPC"]
        );
    }

    #[test]
    fn test_parse_concepts_keeps_leading_section_numbers() {
        assert_eq!(parse_concepts("498A cruelty, 2) bail"), vec!["498A cruelty", "bail"]);
    }

    #[test]
    fn test_merge_dedupes_case_insensitively_and_caps() {
        let entities = vec!["Section 498A  IPC".to_string(), "Dowry Death".to_string()];
        let concepts = vec![
            "dowry death".to_string(),
            "ab".to_string(),
            "Cruelty".to_string(),
            "Bail".to_string(),
        ];
        assert_eq!(
            merge_terms(&entities, &concepts, 3),
            vec!["Section 498A IPC", "Dowry Death", "Cruelty"]
        );
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("§§§§", 2), "§§");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
