//! # Relevance Matcher
//!
//! Decides whether an external article relates to a user's indexed case file by
//! embedding a short representation of the article and querying the user's
//! namespace of the vector index.

use crate::{
    call::CallPolicy,
    embedding::EmbeddingGateway,
    index::VectorIndex,
    prompts::{render, PromptPair},
    providers::ai::AiProvider,
    settings::{ArticleRepresentation, PipelineSettings},
    types::{Article, ArticleFailure, IndexMatch},
};
use tracing::{debug, warn};

/// An article with at least one chunk at or above the relevance floor.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedArticle {
    /// The text that was embedded; also shown to the generator as the article summary.
    pub summary: String,
    /// Best first.
    pub matches: Vec<IndexMatch>,
    pub best_score: f32,
}

pub struct Matcher<'a> {
    pub generator: &'a dyn AiProvider,
    pub prompts: &'a PromptPair,
    pub gateway: &'a EmbeddingGateway,
    pub index: &'a dyn VectorIndex,
    pub policy: &'a CallPolicy,
    pub settings: &'a PipelineSettings,
}

/// `title` and `snippet` on separate lines.
pub fn fallback_representation(article: &Article) -> String {
    format!("{}\n{}", article.title.trim(), article.snippet.trim())
}

pub(crate) fn failure(article: &Article, stage: &str, error: impl ToString) -> ArticleFailure {
    ArticleFailure {
        link: article.link.clone(),
        stage: stage.to_string(),
        error: error.to_string(),
    }
}

impl Matcher<'_> {
    /// `Ok(None)` when no chunk of the user's case reaches the relevance floor.
    pub async fn match_article(
        &self,
        user_id: &str,
        article: &Article,
    ) -> Result<Option<MatchedArticle>, ArticleFailure> {
        let summary = self.represent(article).await;

        let vector = self
            .gateway
            .embed_one("article", &summary)
            .await
            .map_err(|e| failure(article, "embed", e))?;

        let matches = self
            .index
            .query(
                user_id,
                &vector,
                self.settings.top_k,
                self.settings.relevance_floor,
            )
            .await
            .map_err(|e| failure(article, "query", e))?;

        let Some(best_score) = matches.first().map(|m| m.score) else {
            debug!("No chunk reached {} for {}", self.settings.relevance_floor, article.link);
            return Ok(None);
        };
        debug!(
            "{} matched {} chunk(s), best score {best_score:.3}",
            article.link,
            matches.len()
        );
        Ok(Some(MatchedArticle {
            summary,
            matches,
            best_score,
        }))
    }

    /// The generator's briefing in summary mode, falling back to title and snippet.
    async fn represent(&self, article: &Article) -> String {
        let fallback = fallback_representation(article);
        if self.settings.article_representation == ArticleRepresentation::TitleSnippet {
            return fallback;
        }
        let user_prompt = render(
            &self.prompts.user_prompt,
            &[
                ("title", article.title.as_str()),
                ("snippet", article.snippet.as_str()),
            ],
        );
        match self
            .policy
            .once(
                "article summary",
                self.generator
                    .generate(&self.prompts.system_prompt, &user_prompt),
            )
            .await
        {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) => fallback,
            Err(e) => {
                warn!("Summary for {} unavailable, using title and snippet: {e}", article.link);
                fallback
            }
        }
    }
}
