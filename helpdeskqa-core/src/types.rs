//! Fundamental data types shared across the pipelines.

use serde::{Deserialize, Serialize};

/// Sentinel answer text returned when no grounded answer exists.
///
/// Used uniformly for "no vector match", "no backing document", and
/// "model declined or returned nothing" — callers cannot distinguish the
/// cases, by design.
pub const UNKNOWN_ANSWER: &str = "Unknown";

/// A help article as produced by the upstream ingestion collaborator.
///
/// Keyed by `url`; read-only once ingested. Re-ingestion is an
/// upsert-by-url owned by the store's `put`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub title: String,
    /// Full text body — both the retrieval payload that gets embedded and
    /// the grounding context handed to the answer model.
    pub article: String,
    pub locale: String,
}

impl Document {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        article: impl Into<String>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            article: article.into(),
            locale: locale.into(),
        }
    }
}

/// Reference to the article that grounded an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRef {
    pub title: String,
    pub url: String,
}

impl From<&Document> for ArticleRef {
    fn from(doc: &Document) -> Self {
        Self {
            title: doc.title.clone(),
            url: doc.url.clone(),
        }
    }
}

/// Result of one query pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<ArticleRef>,
}

impl Answer {
    /// The soft-miss answer: no article, sentinel text.
    pub fn unknown() -> Self {
        Self {
            text: UNKNOWN_ANSWER.to_string(),
            article: None,
        }
    }

    /// An answer grounded in `article`. An empty or whitespace-only
    /// completion is normalized to the sentinel so callers never have to
    /// special-case emptiness.
    pub fn grounded(completion: impl Into<String>, article: ArticleRef) -> Self {
        let completion = completion.into();
        let trimmed = completion.trim();
        let text = if trimmed.is_empty() {
            UNKNOWN_ANSWER.to_string()
        } else {
            trimmed.to_string()
        };
        Self {
            text,
            article: Some(article),
        }
    }

    /// Whether this is the sentinel answer.
    pub fn is_unknown(&self) -> bool {
        self.text == UNKNOWN_ANSWER
    }
}

/// A single nearest-neighbor match from the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub id: String,
    pub score: f32,
}

/// An embedding produced for one text, with the provider's own reported
/// token usage so batch jobs can account cost per call.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub prompt_tokens: usize,
}
