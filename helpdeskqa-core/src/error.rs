//! Error types for the helpdeskqa core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering the embedding, vector index, document store, and answer model
//! boundaries.
//!
//! Retrieval misses are deliberately not errors: an empty match set or a
//! dangling index id is a first-class "Unknown" outcome handled inside the
//! query pipeline, never surfaced through these types.

/// Top-level error type for the helpdeskqa core library.
#[derive(Debug, thiserror::Error)]
pub enum HelpdeskError {
    /// The caller supplied an empty or missing question.
    #[error("Invalid query: prompt is empty")]
    InvalidQuery,

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Answer model error: {0}")]
    Answer(#[from] AnswerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HelpdeskError {
    /// Whether this error is the caller's fault (maps to a 4xx response).
    pub fn is_client_error(&self) -> bool {
        matches!(self, HelpdeskError::InvalidQuery)
    }
}

/// Errors from the embedding provider.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Embedding provider unavailable: {message}")]
    Unavailable { message: String },

    #[error("Embedding response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for embedding provider {provider}")]
    AuthFailed { provider: String },
}

/// Errors from the vector index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Vector index unavailable: {message}")]
    Unavailable { message: String },

    #[error("Vector index rejected write: {message}")]
    WriteFailed { message: String },

    #[error("Vector index response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for vector index {provider}")]
    AuthFailed { provider: String },
}

/// Errors from the document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Document store backend error: {message}")]
    Backend { message: String },
}

/// Errors from the answer model.
#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    #[error("Answer model unavailable: {message}")]
    Unavailable { message: String },

    #[error("Answer response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for answer provider {provider}")]
    AuthFailed { provider: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Environment variable not set: {var}")]
    EnvVarMissing { var: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `HelpdeskError`.
pub type Result<T> = std::result::Result<T, HelpdeskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_query() {
        let err = HelpdeskError::InvalidQuery;
        assert_eq!(err.to_string(), "Invalid query: prompt is empty");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_error_display_embedding() {
        let err = HelpdeskError::Embedding(EmbeddingError::Unavailable {
            message: "connection refused".into(),
        });
        assert_eq!(
            err.to_string(),
            "Embedding error: Embedding provider unavailable: connection refused"
        );
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_error_display_index_write() {
        let err = HelpdeskError::Index(IndexError::WriteFailed {
            message: "dimension mismatch".into(),
        });
        assert_eq!(
            err.to_string(),
            "Index error: Vector index rejected write: dimension mismatch"
        );
    }

    #[test]
    fn test_error_display_answer() {
        let err = HelpdeskError::Answer(AnswerError::AuthFailed {
            provider: "openai".into(),
        });
        assert_eq!(
            err.to_string(),
            "Answer model error: Authentication failed for answer provider openai"
        );
    }

    #[test]
    fn test_error_display_config() {
        let err = HelpdeskError::Config(ConfigError::EnvVarMissing {
            var: "OPENAI_API_KEY".into(),
        });
        assert_eq!(
            err.to_string(),
            "Configuration error: Environment variable not set: OPENAI_API_KEY"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HelpdeskError = io_err.into();
        assert!(matches!(err, HelpdeskError::Io(_)));
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: HelpdeskError = serde_err.into();
        assert!(matches!(err, HelpdeskError::Serialization(_)));
    }
}
