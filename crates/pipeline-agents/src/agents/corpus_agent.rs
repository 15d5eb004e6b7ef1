//! Corpus agent — answers a question from retrieved statute articles.

use coordination::{AgentName, SessionTierContext};

use super::types::CorpusAnswer;
use super::AgentOutput;
use crate::corpus::{format_context, CorpusArticle};
use crate::errors::AgentError;
use crate::prompts;
use crate::runner::{AgentOverrides, AgentRunner};

/// Answer given when retrieval found nothing.
pub const NO_ARTICLES_ANSWER: &str = "\
I could not find statute articles relevant to your question in the available corpus. \
Try rephrasing it or adding more detail.";

fn no_articles() -> CorpusAnswer {
    CorpusAnswer {
        answer: NO_ARTICLES_ANSWER.to_string(),
        cited_articles: Vec::new(),
        confidence: 0.0,
        follow_up_questions: Vec::new(),
    }
}

pub async fn run(
    runner: &AgentRunner,
    ctx: &SessionTierContext,
    question: &str,
    articles: &[CorpusArticle],
) -> Result<AgentOutput<CorpusAnswer>, AgentError> {
    let context = format_context(articles);
    if context.is_empty() {
        return Ok(AgentOutput::local(no_articles()));
    }

    let overrides = AgentOverrides::system(prompts::system_prompt(prompts::CORPUS_AGENT));
    let prompt = format!("STATUTE CONTEXT:\n{context}\n\nQUESTION:\n{question}");
    let result = runner
        .run::<CorpusAnswer>(ctx, AgentName::CorpusAgent, &prompt, &overrides)
        .await?;
    Ok(AgentOutput::from(result).map(|mut answer| {
        answer.confidence = answer.confidence.clamp(0.0, 1.0);
        answer
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{runner, FixedBackend};

    #[tokio::test]
    async fn empty_retrieval_answers_without_a_call() {
        let backend = FixedBackend::ok("{}");
        let out = run(&runner(backend.clone()), &SessionTierContext::default(), "q", &[])
            .await
            .unwrap();
        assert_eq!(out.value.confidence, 0.0);
        assert_eq!(out.value.answer, NO_ARTICLES_ANSWER);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn answers_from_context() {
        let backend = FixedBackend::ok(
            r#"{"answer": "Yes, the judge may reduce it.", "citedArticles": [{"id": "a1", "reference": "Art. 1384"}], "confidence": 1.4}"#,
        );
        let articles = vec![CorpusArticle {
            id: "a1".into(),
            law_source: "Civil Code".into(),
            article_reference: "Art. 1384".into(),
            article_title: Some("Reduction of penalty".into()),
            article_text: "The penalty may be reduced.".into(),
            similarity: 0.8,
        }];
        let out = run(
            &runner(backend.clone()),
            &SessionTierContext::default(),
            "can a penalty be reduced?",
            &articles,
        )
        .await
        .unwrap();
        assert_eq!(out.value.cited_articles[0].reference, "Art. 1384");
        assert_eq!(out.value.confidence, 1.0);
        assert!(backend.last_prompt().contains("[ID: a1]"));
        assert!(backend.last_prompt().ends_with("can a penalty be reduced?"));
    }
}
