//! # helpdeskqa core
//!
//! Retrieval-augmented question answering over a corpus of help articles:
//! a document store and vector index populated by an offline indexing
//! batch, and a per-request query pipeline that embeds the question,
//! retrieves the single best article, and asks an answer model for a
//! completion grounded in that article's text.

pub mod answer;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod indexer;
pub mod pipeline;
pub mod server;
pub mod store;
pub mod types;

// Re-export commonly used types at the crate root.
pub use answer::{AnswerProvider, build_grounding_prompt, create_answer_provider};
pub use config::{AppConfig, load_config};
pub use embedding::{EmbeddingProvider, HashEmbedder, OpenAiEmbedder, create_embedding_provider};
pub use error::{HelpdeskError, Result};
pub use index::{EntryMetadata, MemoryIndex, PineconeIndex, VectorIndex, create_vector_index};
pub use indexer::{IndexReport, IndexingPipeline};
pub use pipeline::QueryPipeline;
pub use store::{DocumentStore, MemoryDocumentStore, SqliteDocumentStore};
pub use types::{Answer, ArticleRef, Document, Embedding, ScoredMatch, UNKNOWN_ANSWER};
