//! Configuration system for helpdeskqa.
//!
//! Uses `figment` for layered configuration: defaults -> config file ->
//! environment. The file is `helpdeskqa.toml` in the working directory
//! unless an explicit path is given; environment variables use the
//! `HELPDESKQA_` prefix with `__` as the section separator
//! (e.g. `HELPDESKQA_SERVER__PORT=8080`).

use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub embedding: EmbeddingConfig,
    pub answer: AnswerConfig,
    pub index: IndexConfig,
    pub store: StoreConfig,
    pub server: ServerConfig,
}

/// Configuration for the embedding provider.
///
/// Precondition (not structurally enforced): the vector index only holds
/// vectors meaningful relative to one embedding space, so `provider` and
/// `model` must be identical for the indexing batch that populated the
/// index and for every query served against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider name: "openai" or "hash" (deterministic local embedder).
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Vector dimensionality for the hash embedder (API providers report
    /// their own).
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
    /// Cost per 1000 embedding tokens in USD, for batch cost reports.
    #[serde(default = "default_cost_per_1k_tokens")]
    pub cost_per_1k_tokens: f64,
}

fn default_embedding_provider() -> String {
    "openai".into()
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".into()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".into()
}

fn default_dimensions() -> usize {
    1536
}

fn default_embed_timeout_secs() -> u64 {
    30
}

fn default_cost_per_1k_tokens() -> f64 {
    0.0004
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            api_key_env: default_openai_key_env(),
            base_url: None,
            dimensions: default_dimensions(),
            timeout_secs: default_embed_timeout_secs(),
            cost_per_1k_tokens: default_cost_per_1k_tokens(),
        }
    }
}

/// Configuration for the answer model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerConfig {
    /// Provider name: currently "openai".
    #[serde(default = "default_answer_provider")]
    pub provider: String,
    #[serde(default = "default_answer_model")]
    pub model: String,
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Short label for the corpus domain, interpolated into the grounding
    /// prompt ("unrelated to <domain>").
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_answer_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_answer_provider() -> String {
    "openai".into()
}

fn default_answer_model() -> String {
    "gpt-3.5-turbo-instruct".into()
}

fn default_domain() -> String {
    "the help center".into()
}

fn default_temperature() -> f64 {
    0.25
}

fn default_top_p() -> f64 {
    1.0
}

fn default_max_tokens() -> usize {
    100
}

fn default_answer_timeout_secs() -> u64 {
    60
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            provider: default_answer_provider(),
            model: default_answer_model(),
            api_key_env: default_openai_key_env(),
            base_url: None,
            domain: default_domain(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_answer_timeout_secs(),
        }
    }
}

/// Configuration for the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Provider name: "pinecone" or "memory".
    #[serde(default = "default_index_provider")]
    pub provider: String,
    /// Index endpoint, e.g. `https://<index>.svc.<region>.pinecone.io`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_pinecone_key_env")]
    pub api_key_env: String,
    /// One logical namespace per deployment/locale combination.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_index_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_index_provider() -> String {
    "pinecone".into()
}

fn default_pinecone_key_env() -> String {
    "PINECONE_API_KEY".into()
}

fn default_namespace() -> String {
    "default".into()
}

fn default_index_timeout_secs() -> u64 {
    30
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            provider: default_index_provider(),
            base_url: None,
            api_key_env: default_pinecone_key_env(),
            namespace: default_namespace(),
            timeout_secs: default_index_timeout_secs(),
        }
    }
}

/// Configuration for the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("helpdeskqa.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Configuration for the query API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Load configuration with figment layering.
pub fn load_config(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    match config_path {
        Some(path) => figment = figment.merge(Toml::file(path)),
        None => figment = figment.merge(Toml::file("helpdeskqa.toml")),
    }

    figment = figment.merge(Env::prefixed("HELPDESKQA_").split("__"));

    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}
