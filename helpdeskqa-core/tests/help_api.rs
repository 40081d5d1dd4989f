//! Integration tests for the query API router.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use helpdeskqa_core::answer::AnswerProvider;
use helpdeskqa_core::embedding::{EmbeddingProvider, HashEmbedder};
use helpdeskqa_core::error::{AnswerError, EmbeddingError};
use helpdeskqa_core::index::{EntryMetadata, MemoryIndex, VectorIndex};
use helpdeskqa_core::pipeline::QueryPipeline;
use helpdeskqa_core::server::router;
use helpdeskqa_core::store::{DocumentStore, MemoryDocumentStore};
use helpdeskqa_core::types::{Document, Embedding};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tower::ServiceExt;

struct ScriptedAnswerer {
    reply: &'static str,
}

#[async_trait]
impl AnswerProvider for ScriptedAnswerer {
    async fn complete(&self, _prompt: &str) -> Result<String, AnswerError> {
        Ok(self.reply.to_string())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Embedding, EmbeddingError> {
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

/// Pipeline over in-memory components with one indexed returns article.
async fn indexed_pipeline(reply: &'static str) -> Arc<QueryPipeline> {
    let embedder = Arc::new(HashEmbedder::new(128));
    let index = Arc::new(MemoryIndex::new());
    let store = Arc::new(MemoryDocumentStore::new());

    let doc = Document::new(
        "a/1",
        "Returns",
        "Our return policy: ship the item back via prepaid label within 30 days.",
        "en",
    );
    store.put(&doc).await.unwrap();
    let e = embedder.embed(&doc.article).await.unwrap();
    index
        .upsert(&doc.url, &e.vector, EntryMetadata { locale: "en".into() })
        .await
        .unwrap();

    Arc::new(QueryPipeline::new(
        embedder,
        index,
        store,
        Arc::new(ScriptedAnswerer { reply }),
        "the help center",
    ))
}

fn empty_pipeline() -> Arc<QueryPipeline> {
    Arc::new(QueryPipeline::new(
        Arc::new(HashEmbedder::new(128)),
        Arc::new(MemoryIndex::new()),
        Arc::new(MemoryDocumentStore::new()),
        Arc::new(ScriptedAnswerer { reply: "unused" }),
        "the help center",
    ))
}

fn post_json(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/help")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_grounded_answer_end_to_end() {
    let app = router(indexed_pipeline("Ship via prepaid label within 30 days.").await);

    let resp = app
        .oneshot(post_json(serde_json::json!({
            "query": "How do I return an item?"
        })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    assert_eq!(
        json,
        serde_json::json!({
            "query": "Ship via prepaid label within 30 days.",
            "article": { "title": "Returns", "url": "a/1" }
        })
    );
}

#[tokio::test]
async fn test_empty_index_returns_unknown_without_article() {
    let app = router(empty_pipeline());

    let resp = app
        .oneshot(post_json(serde_json::json!({ "query": "any question" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    assert_eq!(json, serde_json::json!({ "query": "Unknown" }));
}

#[tokio::test]
async fn test_missing_query_field_is_bad_request() {
    let app = router(empty_pipeline());

    let resp = app
        .oneshot(post_json(serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_query_is_bad_request() {
    let app = router(empty_pipeline());

    let resp = app
        .oneshot(post_json(serde_json::json!({ "query": "  " })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = router(empty_pipeline());

    let req = Request::builder()
        .method("POST")
        .uri("/api/help")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_is_method_not_allowed() {
    let app = router(empty_pipeline());

    let req = Request::builder()
        .method("GET")
        .uri("/api/help")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_embedding_outage_is_internal_server_error() {
    let pipeline = Arc::new(QueryPipeline::new(
        Arc::new(FailingEmbedder),
        Arc::new(MemoryIndex::new()),
        Arc::new(MemoryDocumentStore::new()),
        Arc::new(ScriptedAnswerer { reply: "unused" }),
        "the help center",
    ));
    let app = router(pipeline);

    let resp = app
        .oneshot(post_json(serde_json::json!({ "query": "any question" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(resp).await;
    assert_eq!(json, serde_json::json!({ "error": "Internal Server Error" }));
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = router(empty_pipeline());

    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    assert_eq!(json["status"], "ok");
}
