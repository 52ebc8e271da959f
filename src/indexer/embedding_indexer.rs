use super::Chunk;
use crate::concurrency::Coordinator;
use crate::config::{EmbeddingConfig, IndexingConfig};
use crate::embedding::EmbeddingProvider;
use crate::error::EmbeddingError;
use crate::vector_db::{SymbolSummary, VectorRow, VectorStore};
use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// Counts from one indexing pass. Misses and store failures are per chunk
/// and never abort the pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexOutcome {
    pub persisted: usize,
    pub embed_misses: usize,
    pub store_failures: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl IndexOutcome {
    pub fn failures(&self) -> usize {
        self.embed_misses + self.store_failures
    }

    pub fn merge(&mut self, other: IndexOutcome) {
        self.persisted += other.persisted;
        self.embed_misses += other.embed_misses;
        self.store_failures += other.store_failures;
        self.errors.extend(other.errors);
    }
}

/// Stable row id for a chunk: hex sha256 of `filepath:start:end`
pub fn chunk_id(filepath: &str, start_line: usize, end_line: usize) -> String {
    let digest = Sha256::digest(format!("{}:{}:{}", filepath, start_line, end_line).as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Embeds chunks and writes one vector row per chunk
pub struct EmbeddingIndexer {
    batch_size: usize,
    max_concurrent: usize,
    timeout: Duration,
    coordinator: Coordinator,
}

impl EmbeddingIndexer {
    pub fn new(indexing: &IndexingConfig, embedding: &EmbeddingConfig) -> Self {
        Self {
            batch_size: indexing.batch_size.max(1),
            max_concurrent: embedding.max_concurrent.max(1),
            timeout: Duration::from_secs(embedding.timeout_secs),
            coordinator: Coordinator::new("embedding"),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Embed and persist `chunks`. Each chunk is embedded by its own call,
    /// at most `max_concurrent` at a time within a batch. The batch's rows
    /// go to the store in one upsert; when that fails the rows are retried
    /// one by one so a bad row touches only its own chunk.
    pub async fn index(
        &self,
        chunks: Vec<Chunk>,
        provider: Arc<dyn EmbeddingProvider>,
        store: &dyn VectorStore,
    ) -> IndexOutcome {
        let mut outcome = IndexOutcome::default();
        if chunks.is_empty() {
            return outcome;
        }

        let total = chunks.len();
        let mut remaining = chunks.into_iter().peekable();
        while remaining.peek().is_some() {
            let batch: Vec<Chunk> = remaining.by_ref().take(self.batch_size).collect();
            let provider = &provider;

            let results = self
                .coordinator
                .map_concurrently(
                    batch,
                    |chunk| async move {
                        let embedding = self.embed(provider.clone(), chunk.embedding_text()).await?;
                        Ok(to_row(chunk, embedding))
                    },
                    self.max_concurrent,
                )
                .await;

            let mut rows = Vec::with_capacity(results.len());
            for result in results {
                match result {
                    Ok(row) => rows.push(row),
                    Err(e) => {
                        outcome.embed_misses += 1;
                        outcome.errors.push(format!("{:#}", e));
                    }
                }
            }
            self.store_rows(rows, store, &mut outcome).await;
        }

        tracing::info!(
            "Indexed {}/{} chunks ({} embed misses, {} store failures)",
            outcome.persisted,
            total,
            outcome.embed_misses,
            outcome.store_failures
        );
        outcome
    }

    async fn store_rows(&self, rows: Vec<VectorRow>, store: &dyn VectorStore, outcome: &mut IndexOutcome) {
        if rows.is_empty() {
            return;
        }

        let count = rows.len();
        match store.upsert(rows.clone()).await {
            Ok(_) => {
                outcome.persisted += count;
                return;
            }
            Err(e) => {
                tracing::warn!("Batch upsert of {} rows failed, retrying per row: {:#}", count, e);
            }
        }

        for row in rows {
            let id = row.id.clone();
            match store
                .upsert(vec![row])
                .await
                .with_context(|| format!("Failed to store chunk {}", id))
            {
                Ok(_) => outcome.persisted += 1,
                Err(e) => {
                    outcome.store_failures += 1;
                    outcome.errors.push(format!("{:#}", e));
                }
            }
        }
    }

    async fn embed(&self, provider: Arc<dyn EmbeddingProvider>, text: String) -> Result<Vec<f32>> {
        let expected = provider.dimension();
        let task = tokio::task::spawn_blocking(move || provider.embed_batch(vec![text]));

        let mut embeddings = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(embeddings))) => embeddings,
            Ok(Ok(Err(e))) => {
                return Err(EmbeddingError::GenerationFailed(format!("{:#}", e)).into());
            }
            Ok(Err(e)) => {
                return Err(
                    EmbeddingError::GenerationFailed(format!("embedding task panicked: {}", e))
                        .into(),
                );
            }
            Err(_) => return Err(EmbeddingError::Timeout(self.timeout.as_secs()).into()),
        };

        let embedding = embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::GenerationFailed("model returned no vector".to_string()))?;
        if embedding.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            }
            .into());
        }
        Ok(embedding)
    }
}

fn to_row(chunk: Chunk, embedding: Vec<f32>) -> VectorRow {
    VectorRow {
        id: chunk_id(&chunk.filepath, chunk.start_line, chunk.end_line),
        symbols: chunk.symbols.iter().map(SymbolSummary::from).collect(),
        language: chunk.language.as_str().to_string(),
        content: chunk.content,
        embedding,
        filepath: chunk.filepath,
        start_line: chunk.start_line,
        end_line: chunk.end_line,
        context: chunk.context,
    }
}
