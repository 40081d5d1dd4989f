//! Query API server built on axum.
//!
//! One POST endpoint consumed by the presentation layer, plus a health
//! probe. Soft misses return 200 with the "Unknown" sentinel; hard
//! backend failures return one generic 500 body with the detail logged,
//! never returned.

use crate::error::HelpdeskError;
use crate::pipeline::QueryPipeline;
use crate::types::ArticleRef;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Deserialize)]
struct HelpRequest {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Debug, Serialize)]
struct HelpResponse {
    query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    article: Option<ArticleRef>,
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Build the query API router.
pub fn router(pipeline: Arc<QueryPipeline>) -> Router {
    Router::new()
        .route("/api/help", post(help_handler))
        .route("/health", get(health_handler))
        .with_state(pipeline)
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Answer one question: POST `{query}` -> `{query, article?}`.
async fn help_handler(
    State(pipeline): State<Arc<QueryPipeline>>,
    payload: Result<Json<HelpRequest>, JsonRejection>,
) -> Response {
    let query = match payload {
        Ok(Json(req)) => req.query.unwrap_or_default(),
        Err(_) => return error_body(StatusCode::BAD_REQUEST, "Bad Request"),
    };

    match pipeline.answer(&query).await {
        Ok(answer) => (
            StatusCode::OK,
            Json(HelpResponse {
                query: answer.text,
                article: answer.article,
            }),
        )
            .into_response(),
        Err(HelpdeskError::InvalidQuery) => error_body(StatusCode::BAD_REQUEST, "Bad Request"),
        Err(e) => {
            // Diagnostic detail stays in the logs; the caller gets one
            // generic failure shape.
            error!(error = %e, "Query pipeline failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

/// Bind and serve the query API until cancelled.
pub async fn run(pipeline: Arc<QueryPipeline>, host: &str, port: u16) -> std::io::Result<()> {
    let app = router(pipeline);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Query API listening");
    axum::serve(listener, app).await
}
