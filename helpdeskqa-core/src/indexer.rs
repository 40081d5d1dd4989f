//! Offline indexing batch: embed every stored document and upsert it
//! into the vector index.
//!
//! A single document's failure (embedding or upsert) is non-fatal: the
//! batch logs it, counts it, and moves on. There is no checkpoint state —
//! a crash mid-run means restarting from the top, which is acceptable
//! because upserts are idempotent and keyed by url.

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::{EntryMetadata, VectorIndex};
use crate::store::DocumentStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Aggregate outcome of one `reindex_all` run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexReport {
    /// Documents enumerated from the store.
    pub total: usize,
    /// Documents embedded and upserted.
    pub indexed: usize,
    /// Documents skipped after an embedding or upsert failure.
    pub failed: usize,
    /// Sum of token usage reported by each embedding call.
    pub total_tokens: usize,
    /// `total_tokens / 1000 * cost_per_1k_tokens`.
    pub approx_cost_usd: f64,
}

/// The indexing pipeline.
pub struct IndexingPipeline {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    cost_per_1k_tokens: f64,
}

impl IndexingPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        cost_per_1k_tokens: f64,
    ) -> Self {
        Self {
            store,
            embedder,
            index,
            cost_per_1k_tokens,
        }
    }

    /// Enumerate the corpus and (re)index every document, sequentially.
    ///
    /// Only store enumeration failure is fatal; per-document failures are
    /// logged and counted in the report.
    pub async fn reindex_all(&self) -> Result<IndexReport> {
        let docs = self.store.list().await?;
        let total = docs.len();
        let mut report = IndexReport {
            total,
            ..Default::default()
        };

        for doc in &docs {
            let embedding = match self.embedder.embed(&doc.article).await {
                Ok(e) => e,
                Err(e) => {
                    warn!(url = %doc.url, error = %e, "Skipping document: embedding failed");
                    report.failed += 1;
                    continue;
                }
            };
            report.total_tokens += embedding.prompt_tokens;

            let metadata = EntryMetadata {
                locale: doc.locale.clone(),
            };
            if let Err(e) = self.index.upsert(&doc.url, &embedding.vector, metadata).await {
                warn!(url = %doc.url, error = %e, "Skipping document: upsert failed");
                report.failed += 1;
                continue;
            }

            report.indexed += 1;
            info!(
                progress = format!("{}/{}", report.indexed + report.failed, total),
                url = %doc.url,
                "Indexed document"
            );
        }

        report.approx_cost_usd = report.total_tokens as f64 / 1000.0 * self.cost_per_1k_tokens;
        info!(
            total = report.total,
            indexed = report.indexed,
            failed = report.failed,
            total_tokens = report.total_tokens,
            approx_cost_usd = report.approx_cost_usd,
            "Reindex complete"
        );
        Ok(report)
    }
}
