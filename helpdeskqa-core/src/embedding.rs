//! Pluggable embedding providers.
//!
//! Provides a trait-based abstraction over embedding models with an
//! OpenAI API implementation and a deterministic local hashing embedder
//! for offline use and tests.
//!
//! Both the indexing batch and the query path must embed with the same
//! provider and model — the index only holds vectors meaningful relative
//! to one embedding space. Construct one provider from one
//! [`EmbeddingConfig`](crate::config::EmbeddingConfig) and share it.

use crate::config::EmbeddingConfig;
use crate::error::EmbeddingError;
use crate::types::Embedding;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding providers.
///
/// One attempt per call; transient failures propagate to the caller,
/// which decides whether to skip (indexing) or fail the request (query).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Return the dimensionality of embeddings.
    fn dimensions(&self) -> usize;

    /// Return the provider name.
    fn provider_name(&self) -> &str;
}

/// OpenAI API embedder.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dims: usize,
}

impl OpenAiEmbedder {
    /// Create a new embedder from configuration.
    ///
    /// Reads the API key from the environment variable named in
    /// `config.api_key_env`.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api_key =
            std::env::var(&config.api_key_env).map_err(|_| EmbeddingError::AuthFailed {
                provider: format!("openai: env var '{}' not set", config.api_key_env),
            })?;

        let dims = match config.model.as_str() {
            "text-embedding-3-large" => 3072,
            "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
            _ => 1536,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Unavailable {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            api_key,
            model: config.model.clone(),
            dims,
        })
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    usage: Option<EmbeddingsUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsUsage {
    #[serde(default)]
    total_tokens: usize,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let url = format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Unavailable {
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".into());
            return Err(EmbeddingError::Unavailable {
                message: format!("embeddings request failed ({status}): {body}"),
            });
        }

        let payload: EmbeddingsResponse =
            resp.json().await.map_err(|e| EmbeddingError::ResponseParse {
                message: e.to_string(),
            })?;

        let vector = payload
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::ResponseParse {
                message: "response contained no embedding".into(),
            })?;

        Ok(Embedding {
            vector,
            prompt_tokens: payload.usage.map(|u| u.total_tokens).unwrap_or(0),
        })
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

/// Deterministic local embedder: hashed term frequency, L2-normalized.
///
/// Not a semantic model — it exists so the whole pipeline can run and be
/// tested without network access, and it satisfies the self-consistency
/// property (identical text always embeds to the identical vector).
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }
}

fn term_hash(s: &str) -> usize {
    let mut hash: usize = 5381;
    for b in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(b as usize);
    }
    hash
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let mut vector = vec![0.0f32; self.dims];

        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let mut tf: HashMap<&str, usize> = HashMap::new();
        for word in &words {
            *tf.entry(word).or_insert(0) += 1;
        }

        for (term, count) in &tf {
            let idx = term_hash(term) % self.dims;
            vector[idx] += *count as f32;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Ok(Embedding {
            vector,
            prompt_tokens: words.len(),
        })
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn provider_name(&self) -> &str {
        "hash"
    }
}

/// Create an embedding provider based on configuration.
pub fn create_embedding_provider(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        "hash" => Ok(Arc::new(HashEmbedder::new(config.dimensions))),
        other => Err(EmbeddingError::Unavailable {
            message: format!("unknown embedding provider '{other}'"),
        }),
    }
}
