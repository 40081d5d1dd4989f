//! Subcommand implementations.

use anyhow::Context;
use helpdeskqa_core::config::AppConfig;
use helpdeskqa_core::embedding::{EmbeddingProvider, create_embedding_provider};
use helpdeskqa_core::index::{VectorIndex, create_vector_index};
use helpdeskqa_core::indexer::IndexingPipeline;
use helpdeskqa_core::pipeline::QueryPipeline;
use helpdeskqa_core::store::{DocumentStore, SqliteDocumentStore};
use helpdeskqa_core::types::Document;
use helpdeskqa_core::{answer::create_answer_provider, server};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Construct the shared retrieval stack from configuration.
///
/// Both the serve and reindex paths go through here, so they always use
/// the same embedding provider and model against the same index.
fn build_stack(
    config: &AppConfig,
) -> anyhow::Result<(
    Arc<dyn DocumentStore>,
    Arc<dyn EmbeddingProvider>,
    Arc<dyn VectorIndex>,
)> {
    let store: Arc<dyn DocumentStore> = Arc::new(
        SqliteDocumentStore::open(&config.store.path)
            .with_context(|| format!("opening document store at {}", config.store.path.display()))?,
    );
    let embedder = create_embedding_provider(&config.embedding)
        .context("initializing embedding provider")?;
    let index = create_vector_index(&config.index).context("initializing vector index")?;
    Ok((store, embedder, index))
}

/// Serve the query API until interrupted.
pub async fn run_serve(
    config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (store, embedder, index) = build_stack(&config)?;
    let answerer =
        create_answer_provider(&config.answer).context("initializing answer provider")?;

    let pipeline = Arc::new(QueryPipeline::new(
        embedder,
        index,
        store,
        answerer,
        config.answer.domain.clone(),
    ));

    let host = host.unwrap_or(config.server.host);
    let port = port.unwrap_or(config.server.port);
    server::run(pipeline, &host, port)
        .await
        .context("query API server failed")?;
    Ok(())
}

/// Run the offline indexing batch and print the aggregate report.
pub async fn run_reindex(config: AppConfig) -> anyhow::Result<()> {
    let (store, embedder, index) = build_stack(&config)?;
    let pipeline = IndexingPipeline::new(
        store,
        embedder,
        index,
        config.embedding.cost_per_1k_tokens,
    );

    let report = pipeline.reindex_all().await?;
    println!(
        "Indexed {}/{} documents ({} failed)",
        report.indexed, report.total, report.failed
    );
    println!("Total tokens used: {}", report.total_tokens);
    println!("Approximate cost: ${:.6}", report.approx_cost_usd);
    Ok(())
}

/// Import upstream article records from a JSON file into the store.
pub async fn run_import(config: AppConfig, file: &Path) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let docs: Vec<Document> =
        serde_json::from_str(&content).context("parsing article records")?;

    let store = SqliteDocumentStore::open(&config.store.path)
        .with_context(|| format!("opening document store at {}", config.store.path.display()))?;

    let total = docs.len();
    for (n, doc) in docs.iter().enumerate() {
        store.put(doc).await?;
        info!(progress = format!("{}/{}", n + 1, total), url = %doc.url, "Imported document");
    }
    println!("Imported {total} documents into {}", config.store.path.display());
    Ok(())
}
