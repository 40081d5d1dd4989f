//! Query pipeline: embed the question, retrieve the single best article,
//! and ask the answer model for a grounded completion.
//!
//! Soft misses (no vector match, dangling index id, model declines or
//! returns nothing) all collapse to the same "Unknown" answer — the
//! caller cannot tell them apart, by design. Hard failures (any backend
//! unreachable) propagate as errors. Each stage runs exactly once per
//! request; there is no retry loop.

use crate::answer::{AnswerProvider, build_grounding_prompt};
use crate::embedding::EmbeddingProvider;
use crate::error::{HelpdeskError, Result};
use crate::index::VectorIndex;
use crate::store::DocumentStore;
use crate::types::{Answer, ArticleRef};
use std::sync::Arc;
use tracing::debug;

/// The per-request query pipeline.
///
/// All dependencies are injected; requests share no mutable state, so one
/// pipeline instance serves concurrent requests.
pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn DocumentStore>,
    answerer: Arc<dyn AnswerProvider>,
    domain: String,
}

impl QueryPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn DocumentStore>,
        answerer: Arc<dyn AnswerProvider>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            index,
            store,
            answerer,
            domain: domain.into(),
        }
    }

    /// Answer one question.
    ///
    /// Errors with `InvalidQuery` on an empty prompt, and with the
    /// originating backend error on any hard failure. Every retrieval
    /// miss returns `Ok(Answer::unknown())`.
    pub async fn answer(&self, prompt: &str) -> Result<Answer> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(HelpdeskError::InvalidQuery);
        }

        // Embedding failure is a hard failure, not "Unknown": the system
        // could not process the request at all.
        let embedding = self.embedder.embed(prompt).await?;

        let matches = self.index.query(&embedding.vector, 1).await?;
        let best = match matches.first() {
            Some(m) => m,
            None => {
                debug!(miss = "no_match", "No vector match for query");
                return Ok(Answer::unknown());
            }
        };

        // A dangling id (entry with no backing document) is a soft miss:
        // it tolerates out-of-band document deletion between the index
        // query and this lookup.
        let doc = match self.store.get(&best.id).await? {
            Some(d) => d,
            None => {
                debug!(miss = "dangling_id", id = %best.id, "Index entry has no backing document");
                return Ok(Answer::unknown());
            }
        };

        let grounding = build_grounding_prompt(&self.domain, &doc.article, prompt);
        let completion = self.answerer.complete(&grounding).await?;

        let answer = Answer::grounded(completion, ArticleRef::from(&doc));
        if answer.is_unknown() {
            debug!(miss = "declined", url = %doc.url, "Model declined to answer");
        }
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::error::{AnswerError, EmbeddingError};
    use crate::index::{EntryMetadata, MemoryIndex};
    use crate::store::MemoryDocumentStore;
    use crate::types::{Document, Embedding};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        async fn embed(&self, _text: &str) -> std::result::Result<Embedding, EmbeddingError> {
            Err(EmbeddingError::Unavailable {
                message: "provider down".into(),
            })
        }

        fn dimensions(&self) -> usize {
            0
        }

        fn provider_name(&self) -> &str {
            "failing"
        }
    }

    /// Answer provider that returns a fixed completion.
    struct ScriptedAnswerer {
        reply: String,
    }

    #[async_trait]
    impl AnswerProvider for ScriptedAnswerer {
        async fn complete(&self, _prompt: &str) -> std::result::Result<String, AnswerError> {
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    struct FailingAnswerer;

    #[async_trait]
    impl AnswerProvider for FailingAnswerer {
        async fn complete(&self, _prompt: &str) -> std::result::Result<String, AnswerError> {
            Err(AnswerError::Unavailable {
                message: "model down".into(),
            })
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    /// Answer provider that captures the prompt it was given.
    struct CapturingAnswerer {
        seen: tokio::sync::Mutex<Option<String>>,
        reply: String,
    }

    #[async_trait]
    impl AnswerProvider for CapturingAnswerer {
        async fn complete(&self, prompt: &str) -> std::result::Result<String, AnswerError> {
            *self.seen.lock().await = Some(prompt.to_string());
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "capturing"
        }
    }

    const RETURNS_ARTICLE: &str =
        "Our return policy: ship the item back via prepaid label within 30 days.";

    async fn indexed_fixture(
        answerer: Arc<dyn AnswerProvider>,
    ) -> (QueryPipeline, Arc<MemoryDocumentStore>) {
        let embedder = Arc::new(HashEmbedder::new(128));
        let index = Arc::new(MemoryIndex::new());
        let store = Arc::new(MemoryDocumentStore::new());

        let doc = Document::new("a/1", "Returns", RETURNS_ARTICLE, "en");
        store.put(&doc).await.unwrap();
        let e = embedder.embed(&doc.article).await.unwrap();
        index
            .upsert(&doc.url, &e.vector, EntryMetadata { locale: "en".into() })
            .await
            .unwrap();

        (
            QueryPipeline::new(embedder, index, store.clone(), answerer, "the help center"),
            store,
        )
    }

    #[tokio::test]
    async fn test_empty_prompt_is_invalid_query() {
        let (pipeline, _) = indexed_fixture(Arc::new(ScriptedAnswerer {
            reply: "hi".into(),
        }))
        .await;
        assert!(matches!(
            pipeline.answer("   ").await,
            Err(HelpdeskError::InvalidQuery)
        ));
    }

    #[tokio::test]
    async fn test_embedding_failure_is_hard_error_not_unknown() {
        let pipeline = QueryPipeline::new(
            Arc::new(FailingEmbedder),
            Arc::new(MemoryIndex::new()),
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(ScriptedAnswerer { reply: "x".into() }),
            "the help center",
        );
        assert!(matches!(
            pipeline.answer("any question").await,
            Err(HelpdeskError::Embedding(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_index_returns_unknown() {
        let pipeline = QueryPipeline::new(
            Arc::new(HashEmbedder::new(128)),
            Arc::new(MemoryIndex::new()),
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(ScriptedAnswerer { reply: "x".into() }),
            "the help center",
        );
        let ans = pipeline.answer("any question").await.unwrap();
        assert_eq!(ans, Answer::unknown());
    }

    #[tokio::test]
    async fn test_dangling_index_id_returns_unknown() {
        let embedder = Arc::new(HashEmbedder::new(128));
        let index = Arc::new(MemoryIndex::new());
        let e = embedder.embed("orphaned entry text").await.unwrap();
        index
            .upsert("gone/1", &e.vector, EntryMetadata::default())
            .await
            .unwrap();

        let pipeline = QueryPipeline::new(
            embedder,
            index,
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(ScriptedAnswerer { reply: "x".into() }),
            "the help center",
        );
        let ans = pipeline.answer("orphaned entry text").await.unwrap();
        assert_eq!(ans, Answer::unknown());
    }

    #[tokio::test]
    async fn test_empty_completion_normalizes_to_unknown() {
        let (pipeline, _) =
            indexed_fixture(Arc::new(ScriptedAnswerer { reply: "".into() })).await;
        let ans = pipeline
            .answer("return policy prepaid label")
            .await
            .unwrap();
        assert_eq!(ans.text, "Unknown");
        // The article was still resolved.
        assert!(ans.article.is_some());
    }

    #[tokio::test]
    async fn test_answer_model_failure_is_hard_error() {
        let (pipeline, _) = indexed_fixture(Arc::new(FailingAnswerer)).await;
        assert!(matches!(
            pipeline.answer("return policy prepaid label").await,
            Err(HelpdeskError::Answer(_))
        ));
    }

    #[tokio::test]
    async fn test_end_to_end_grounded_answer() {
        let answerer = Arc::new(CapturingAnswerer {
            seen: tokio::sync::Mutex::new(None),
            reply: "Ship via prepaid label within 30 days.".into(),
        });
        let (pipeline, _) = indexed_fixture(answerer.clone()).await;

        let ans = pipeline.answer("How do I return an item?").await.unwrap();
        assert_eq!(ans.text, "Ship via prepaid label within 30 days.");
        assert_eq!(
            ans.article,
            Some(ArticleRef {
                title: "Returns".into(),
                url: "a/1".into(),
            })
        );

        // The model was grounded in the full article text and given the
        // original question.
        let prompt = answerer.seen.lock().await.clone().unwrap();
        assert!(prompt.contains(RETURNS_ARTICLE));
        assert!(prompt.contains("Q: How do I return an item?"));
    }
}
