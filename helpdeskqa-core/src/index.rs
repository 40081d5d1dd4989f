//! Vector index abstraction with a Pinecone adapter and an in-memory
//! implementation.
//!
//! The index stores `(id, vector, metadata)` triples in one namespace and
//! answers top-k nearest-neighbor queries. `upsert` is idempotent:
//! re-upserting an id replaces the prior entry.

use crate::config::IndexConfig;
use crate::error::IndexError;
use crate::types::ScoredMatch;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Metadata attached to each indexed entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub locale: String,
}

/// Trait for vector indexes.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace the entry for `id`.
    async fn upsert(
        &self,
        id: &str,
        vector: &[f32],
        metadata: EntryMetadata,
    ) -> Result<(), IndexError>;

    /// Return up to `top_k` matches sorted by decreasing similarity.
    /// An empty result is a miss, not an error.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredMatch>, IndexError>;
}

/// In-memory vector index using cosine similarity.
///
/// Used by tests and by fully-local deployments with the hash embedder.
#[derive(Default)]
pub struct MemoryIndex {
    entries: RwLock<HashMap<String, (Vec<f32>, EntryMetadata)>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(
        &self,
        id: &str,
        vector: &[f32],
        metadata: EntryMetadata,
    ) -> Result<(), IndexError> {
        let mut entries = self.entries.write().await;
        entries.insert(id.to_string(), (vector.to_vec(), metadata));
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredMatch>, IndexError> {
        let entries = self.entries.read().await;
        let mut matches: Vec<ScoredMatch> = entries
            .iter()
            .map(|(id, (v, _))| ScoredMatch {
                id: id.clone(),
                score: cosine_similarity(vector, v),
            })
            .collect();
        // Stable descending sort: equal scores keep their relative order.
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);
        Ok(matches)
    }
}

/// Pinecone HTTP adapter, scoped to one configured namespace.
pub struct PineconeIndex {
    client: reqwest::Client,
    base_url: String,
    namespace: String,
}

#[derive(Serialize)]
struct PineconeVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a EntryMetadata,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<PineconeVector<'a>>,
    namespace: &'a str,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    vector: &'a [f32],
    #[serde(rename = "topK")]
    top_k: usize,
    namespace: &'a str,
    #[serde(rename = "includeValues")]
    include_values: bool,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
}

impl PineconeIndex {
    /// Create a new adapter from configuration.
    ///
    /// Requires `config.base_url` (the index endpoint) and the API key in
    /// the environment variable named by `config.api_key_env`.
    pub fn new(config: &IndexConfig) -> Result<Self, IndexError> {
        let base_url = config.base_url.clone().ok_or_else(|| IndexError::Unavailable {
            message: "pinecone index requires index.base_url".into(),
        })?;
        let api_key = std::env::var(&config.api_key_env).map_err(|_| IndexError::AuthFailed {
            provider: format!("pinecone: env var '{}' not set", config.api_key_env),
        })?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Api-Key",
            reqwest::header::HeaderValue::from_str(api_key.trim()).map_err(|_| {
                IndexError::AuthFailed {
                    provider: "pinecone: API key contains invalid header characters".into(),
                }
            })?,
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| IndexError::Unavailable {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone(),
        })
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(
        &self,
        id: &str,
        vector: &[f32],
        metadata: EntryMetadata,
    ) -> Result<(), IndexError> {
        let url = format!("{}/vectors/upsert", self.base_url);
        let body = UpsertRequest {
            vectors: vec![PineconeVector {
                id,
                values: vector,
                metadata: &metadata,
            }],
            namespace: &self.namespace,
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| IndexError::WriteFailed {
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".into());
            return Err(IndexError::WriteFailed {
                message: format!("upsert failed ({status}): {body}"),
            });
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredMatch>, IndexError> {
        let url = format!("{}/query", self.base_url);
        let body = QueryRequest {
            vector,
            top_k,
            namespace: &self.namespace,
            include_values: false,
            include_metadata: false,
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| IndexError::Unavailable {
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".into());
            return Err(IndexError::Unavailable {
                message: format!("query failed ({status}): {body}"),
            });
        }

        let payload: QueryResponse =
            resp.json().await.map_err(|e| IndexError::ResponseParse {
                message: e.to_string(),
            })?;

        Ok(payload
            .matches
            .into_iter()
            .map(|m| ScoredMatch {
                id: m.id,
                score: m.score,
            })
            .collect())
    }
}

/// Create a vector index based on configuration.
pub fn create_vector_index(config: &IndexConfig) -> Result<Arc<dyn VectorIndex>, IndexError> {
    match config.provider.as_str() {
        "pinecone" => Ok(Arc::new(PineconeIndex::new(config)?)),
        "memory" => Ok(Arc::new(MemoryIndex::new())),
        other => Err(IndexError::Unavailable {
            message: format!("unknown vector index provider '{other}'"),
        }),
    }
}
