//! Corpus retrieval collaborator.
//!
//! The corpus-qa route retrieves statute articles before the corpus agent
//! answers. Retrieval is not an LLM call: it sits behind [`CorpusRetriever`]
//! so a vector store can be plugged in. [`KeywordCorpus`] is the in-process
//! engine: term overlap over a list of articles loaded from JSON.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::agents::types::PreparedQuestion;

/// Articles handed to the corpus agent per question.
pub const DEFAULT_SEARCH_LIMIT: usize = 8;

/// Query terms shorter than this carry no signal.
const MIN_TERM_LEN: usize = 3;

/// One retrievable statute article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusArticle {
    pub id: String,
    pub law_source: String,
    pub article_reference: String,
    #[serde(default)]
    pub article_title: Option<String>,
    pub article_text: String,
    /// Relevance in 0.0–1.0, filled in by the retriever.
    #[serde(default)]
    pub similarity: f64,
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("corpus unavailable: {0}")]
    Unavailable(String),

    #[error("corpus I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corpus file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

#[async_trait]
pub trait CorpusRetriever: Send + Sync {
    /// Most relevant articles first, at most `limit`.
    async fn search(
        &self,
        query: &PreparedQuestion,
        limit: usize,
    ) -> Result<Vec<CorpusArticle>, RetrievalError>;
}

pub type SharedCorpusRetriever = Arc<dyn CorpusRetriever>;

/// Term-overlap retrieval over an in-memory article list.
#[derive(Debug, Clone, Default)]
pub struct KeywordCorpus {
    articles: Vec<CorpusArticle>,
}

impl KeywordCorpus {
    pub fn new(articles: Vec<CorpusArticle>) -> Self {
        Self { articles }
    }

    /// Load a JSON array of articles.
    pub async fn load(path: &Path) -> Result<Self, RetrievalError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let articles: Vec<CorpusArticle> = serde_json::from_str(&raw)?;
        debug!(path = %path.display(), articles = articles.len(), "Loaded corpus");
        Ok(Self::new(articles))
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    fn score(article: &CorpusArticle, terms: &BTreeSet<String>) -> f64 {
        if terms.is_empty() {
            return 0.0;
        }
        let haystack = tokenize(&format!(
            "{} {} {}",
            article.article_reference,
            article.article_title.as_deref().unwrap_or_default(),
            article.article_text
        ));
        let hits = terms.iter().filter(|t| haystack.contains(*t)).count();
        hits as f64 / terms.len() as f64
    }
}

#[async_trait]
impl CorpusRetriever for KeywordCorpus {
    async fn search(
        &self,
        query: &PreparedQuestion,
        limit: usize,
    ) -> Result<Vec<CorpusArticle>, RetrievalError> {
        let mut terms = tokenize(&query.legal_query);
        for keyword in &query.keywords {
            terms.extend(tokenize(keyword));
        }

        let mut scored: Vec<CorpusArticle> = self
            .articles
            .iter()
            .filter_map(|a| {
                let score = Self::score(a, &terms);
                (score > 0.0).then(|| CorpusArticle {
                    similarity: score,
                    ..a.clone()
                })
            })
            .collect();
        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(limit);
        Ok(scored)
    }
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TERM_LEN)
        .map(str::to_lowercase)
        .collect()
}

/// Render articles as the corpus agent's context block. Empty when there are
/// no articles.
pub fn format_context(articles: &[CorpusArticle]) -> String {
    articles
        .iter()
        .map(|a| {
            let title = a
                .article_title
                .as_deref()
                .map(|t| format!(" — {t}"))
                .unwrap_or_default();
            format!(
                "[ID: {}] {} — {}{} (relevance: {:.0}%)\n{}",
                a.id,
                a.law_source,
                a.article_reference,
                title,
                a.similarity * 100.0,
                a.article_text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: &str, reference: &str, text: &str) -> CorpusArticle {
        CorpusArticle {
            id: id.into(),
            law_source: "Civil Code".into(),
            article_reference: reference.into(),
            article_title: None,
            article_text: text.into(),
            similarity: 0.0,
        }
    }

    fn corpus() -> KeywordCorpus {
        KeywordCorpus::new(vec![
            article("a1", "Art. 1384", "The penalty may be reduced by the judge if manifestly excessive."),
            article("a2", "Art. 1385", "A confirmatory deposit is kept on breach."),
            article("a3", "Art. 1571", "Lease is the contract by which one party grants enjoyment of a thing."),
        ])
    }

    #[tokio::test]
    async fn ranks_by_term_overlap() {
        let query = PreparedQuestion {
            legal_query: "reduction of excessive penalty".into(),
            keywords: vec!["judge".into()],
            legal_areas: vec![],
        };
        let hits = corpus().search(&query, 5).await.unwrap();
        assert_eq!(hits[0].id, "a1");
        assert!(hits[0].similarity > 0.0);
        assert!(hits.iter().all(|a| a.id != "a3"));
    }

    #[tokio::test]
    async fn no_overlap_returns_nothing() {
        let hits = corpus()
            .search(&PreparedQuestion::passthrough("xyz qwerty"), 5)
            .await
            .unwrap();
        assert!(hits.is_empty());
        assert_eq!(format_context(&hits), "");
    }

    #[tokio::test]
    async fn loads_articles_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(
            &path,
            r#"[{"id":"x","lawSource":"Consumer Code","articleReference":"Art. 33","articleText":"Unfair terms."}]"#,
        )
        .unwrap();
        let corpus = KeywordCorpus::load(&path).await.unwrap();
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn context_lists_id_reference_and_text() {
        let mut a = article("a1", "Art. 1384", "Penalty reduction.");
        a.similarity = 0.5;
        let ctx = format_context(&[a]);
        assert!(ctx.starts_with("[ID: a1] Civil Code — Art. 1384 (relevance: 50%)"));
        assert!(ctx.ends_with("Penalty reduction."));
    }
}
