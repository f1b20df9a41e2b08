//! # Alert Synthesizer
//!
//! Turns a matched article into a persisted alert: classifies its priority,
//! asks the generator for a rationale grounded only in the matched chunks, and
//! writes it through the store's atomic dedup upsert.

use crate::{
    call::CallPolicy,
    canonical::canonicalize_url,
    constants::{NO_IMPACT_MARKER, RATIONALE_CONTEXT_CHARS},
    extract::truncate_chars,
    matcher::{failure, MatchedArticle},
    prompts::{render, PromptPair},
    providers::ai::AiProvider,
    settings::PipelineSettings,
    store::AlertStore,
    types::{Alert, AlertStatus, AlertWrite, Article, ArticleFailure, IndexMatch, Priority},
};
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

/// What happened to one matched article.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertDecision {
    Written(AlertWrite),
    /// The generator found no material impact.
    Dismissed,
}

/// `High` on a very strong match or many matches, `Medium` on a strong one.
pub fn classify_priority(best_score: f32, match_count: usize, settings: &PipelineSettings) -> Priority {
    if best_score >= settings.high_priority_score || match_count >= settings.high_priority_matches {
        Priority::High
    } else if best_score >= settings.medium_priority_score {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Formats the matched chunks, and nothing else, as generator context.
pub fn rationale_context(matches: &[IndexMatch]) -> String {
    matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            format!(
                "[{}] {} (similarity {:.2})\n{}",
                i + 1,
                m.source,
                m.score,
                truncate_chars(&m.text, RATIONALE_CONTEXT_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A rationale that names no impact, or is too short to say anything, dismisses the article.
pub fn is_dismissal(rationale: &str, min_chars: usize) -> bool {
    let trimmed = rationale.trim();
    trimmed.to_uppercase().contains(NO_IMPACT_MARKER) || trimmed.chars().count() < min_chars
}

pub struct AlertSynthesizer<'a> {
    pub generator: &'a dyn AiProvider,
    pub prompts: &'a PromptPair,
    pub store: &'a dyn AlertStore,
    pub policy: &'a CallPolicy,
    pub settings: &'a PipelineSettings,
}

impl AlertSynthesizer<'_> {
    pub async fn synthesize(
        &self,
        user_id: &str,
        article: &Article,
        matched: MatchedArticle,
    ) -> Result<AlertDecision, ArticleFailure> {
        let article_url = canonicalize_url(&article.link);

        // An equal or better alert already exists; skip the generator call.
        let existing = self
            .store
            .find_alert(user_id, &article_url)
            .await
            .map_err(|e| failure(article, "persist", e))?;
        if let Some(existing) = existing {
            if existing.score >= matched.best_score {
                debug!("Alert {} already covers {}", existing.alert_id, article.link);
                return Ok(AlertDecision::Written(AlertWrite::Unchanged(existing)));
            }
        }

        let user_prompt = render(
            &self.prompts.user_prompt,
            &[
                ("title", article.title.as_str()),
                ("summary", matched.summary.as_str()),
                ("context", rationale_context(&matched.matches).as_str()),
            ],
        );
        let rationale = self
            .policy
            .once(
                "alert rationale",
                self.generator
                    .generate(&self.prompts.system_prompt, &user_prompt),
            )
            .await
            .map_err(|e| failure(article, "rationale", e))?;

        if is_dismissal(&rationale, self.settings.min_rationale_chars) {
            debug!("Dismissed {} as having no material impact", article.link);
            return Ok(AlertDecision::Dismissed);
        }

        let now = Utc::now();
        let candidate = Alert {
            alert_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            article_url,
            link: article.link.clone(),
            title: article.title.clone(),
            snippet: article.snippet.clone(),
            priority: classify_priority(matched.best_score, matched.matches.len(), self.settings),
            rationale: rationale.trim().to_string(),
            matched_chunk_ids: matched.matches.iter().map(|m| m.chunk_id.clone()).collect(),
            related_docs_count: matched.matches.len(),
            score: matched.best_score,
            status: AlertStatus::Unread,
            created_at: now,
            updated_at: now,
            read_at: None,
        };

        let write = self
            .store
            .upsert_alert(candidate)
            .await
            .map_err(|e| failure(article, "persist", e))?;
        match &write {
            AlertWrite::Created(a) => info!("Created {} alert {} for user {user_id}", a.priority, a.alert_id),
            AlertWrite::Updated(a) => info!("Upgraded alert {} to score {:.3}", a.alert_id, a.score),
            AlertWrite::Unchanged(_) => {}
        }
        Ok(AlertDecision::Written(write))
    }
}
