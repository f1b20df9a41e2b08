//! # Prompt Templates
//!
//! Prompt templates for the generative tasks. Templates use `{name}` placeholders
//! that are filled with [`render`].

pub mod tasks;

use serde::Deserialize;
use tasks::*;

/// A system/user prompt pair for one task.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PromptPair {
    pub system_prompt: String,
    pub user_prompt: String,
}

impl PromptPair {
    fn new(system_prompt: &str, user_prompt: &str) -> Self {
        Self {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
        }
    }
}

/// The full set of prompts used by the pipeline.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PromptTemplates {
    pub concept_extraction: PromptPair,
    pub article_summary: PromptPair,
    pub alert_rationale: PromptPair,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            concept_extraction: PromptPair::new(
                CONCEPT_EXTRACTION_SYSTEM_PROMPT,
                CONCEPT_EXTRACTION_USER_PROMPT,
            ),
            article_summary: PromptPair::new(
                ARTICLE_SUMMARY_SYSTEM_PROMPT,
                ARTICLE_SUMMARY_USER_PROMPT,
            ),
            alert_rationale: PromptPair::new(
                ALERT_RATIONALE_SYSTEM_PROMPT,
                ALERT_RATIONALE_USER_PROMPT,
            ),
        }
    }
}

/// Replaces each `{key}` in `template` with its value.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{key}}}"), value)
        })
}
