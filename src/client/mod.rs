//! Library entry point tying the indexing pipeline and the query engine to
//! concrete stores
//!
//! A [`GraphRagClient`] owns one embedding provider, one vector store and
//! one graph store. Indexing writes to both stores; queries read from both.

mod indexing;

use crate::config::Config;
use crate::embedding::{EmbeddingProvider, FastEmbedManager, HashEmbedder};
use crate::error::{RagError, ValidationError};
use crate::graph::{CypherShellStore, GraphStore};
use crate::indexer::{ChunkerConfig, LocalRepository, SemanticChunker};
use crate::query::{HybridQueryEngine, OutputFormat, QueryResult, SemanticOutcome, render_debug};
use crate::types::{ClearReport, IndexReport, QueryRequest};
use crate::vector_db::{LanceVectorStore, VectorStore};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Main client for indexing repositories and querying them
///
/// # Example
///
/// ```no_run
/// use project_graph_rag::{Config, GraphRagClient, QueryRequest};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = GraphRagClient::with_config(Config::new()?).await?;
///     let report = client.index_repository("/path/to/repo".as_ref()).await?;
///     println!("{}", report);
///
///     let result = client.query(QueryRequest::new("database connection logic")).await?;
///     println!("{} files matched", result.relevant_files.len());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct GraphRagClient {
    pub(crate) config: Arc<Config>,
    pub(crate) embedding_provider: Arc<dyn EmbeddingProvider>,
    pub(crate) vector_store: Arc<dyn VectorStore>,
    pub(crate) graph_store: Arc<dyn GraphStore>,
    pub(crate) chunker: Arc<SemanticChunker>,
    pub(crate) engine: Arc<HybridQueryEngine>,
}

impl GraphRagClient {
    /// Create a client backed by the configured fastembed model, LanceDB
    /// table and cypher-shell graph
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the model cannot
    /// be loaded, or either store cannot be reached.
    pub async fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        tracing::debug!("Embedding model: {}", config.embedding.model_name);

        let embedder = Arc::new(
            FastEmbedManager::with_instances(
                &config.embedding.model_name,
                config.embedding.model_instances,
            )
                .context("Failed to initialize embedding provider")?,
        );
        Self::with_embedder(config, embedder).await
    }

    /// Like [`with_config`](Self::with_config) with the deterministic hash
    /// embedder in place of a model, for indexing without a model download
    pub async fn offline(config: Config) -> Result<Self> {
        config.validate()?;
        tracing::info!("Using offline hash embeddings");
        Self::with_embedder(config, Arc::new(HashEmbedder::default())).await
    }

    async fn with_embedder(config: Config, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        tracing::info!(
            "Using LanceDB vector store at {}",
            config.vector_db.lancedb_path.display()
        );
        let vector_store = Arc::new(
            LanceVectorStore::new(&config.vector_db)
                .await
                .context("Failed to initialize LanceDB vector store")?,
        );

        tracing::info!("Using graph store at {}", config.graph.uri);
        let graph_store = Arc::new(
            CypherShellStore::connect(config.graph.clone())
                .await
                .context("Failed to connect to graph store")?,
        );

        Self::with_components(config, embedder, vector_store, graph_store).await
    }

    /// Create a client from already-built components
    pub async fn with_components(
        config: Config,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        graph_store: Arc<dyn GraphStore>,
    ) -> Result<Self> {
        vector_store
            .initialize(embedding_provider.dimension())
            .await
            .context("Failed to initialize vector store")?;

        let chunker = SemanticChunker::new(ChunkerConfig::from(&config.indexing))?;
        let engine = HybridQueryEngine::new(
            embedding_provider.clone(),
            vector_store.clone(),
            graph_store.clone(),
            config.query.clone(),
            Duration::from_secs(config.embedding.timeout_secs),
        );

        Ok(Self {
            config: Arc::new(config),
            embedding_provider,
            vector_store,
            graph_store,
            chunker: Arc::new(chunker),
            engine: Arc::new(engine),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn embedding_dimension(&self) -> usize {
        self.embedding_provider.dimension()
    }

    /// Index every supported file under `root` into both stores
    pub async fn index_repository(&self, root: &Path) -> Result<IndexReport> {
        let repository = LocalRepository::new(root)?;
        tracing::info!("Indexing repository at {}", repository.root().display());
        self.index_source(&repository, None).await
    }

    /// Like [`index_repository`](Self::index_repository), stopping between
    /// files once `cancel` fires
    pub async fn index_repository_with_cancel(
        &self,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<IndexReport> {
        let repository = LocalRepository::new(root)?;
        self.index_source(&repository, Some(cancel)).await
    }

    fn resolve(&self, request: &QueryRequest) -> Result<(f32, usize)> {
        if request.question.trim().is_empty() {
            return Err(RagError::from(ValidationError::Empty("question".to_string())).into());
        }
        let threshold = request
            .similarity_threshold
            .unwrap_or(self.config.query.similarity_threshold);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(RagError::from(ValidationError::ConstraintViolation {
                field: "similarity_threshold".to_string(),
                constraint: "between 0.0 and 1.0".to_string(),
                actual: threshold.to_string(),
            })
            .into());
        }
        let max_results = request
            .max_results
            .unwrap_or(self.config.query.max_results)
            .max(1);
        Ok((threshold, max_results))
    }

    /// Hybrid query. Only invalid requests are errors; stage failures are
    /// reported in the result's metadata.
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResult> {
        let (threshold, max_results) = self.resolve(&request)?;
        Ok(self
            .engine
            .query(&request.question, threshold, max_results)
            .await)
    }

    /// Vector search only, with the same fallback as [`query`](Self::query)
    pub async fn search(&self, request: QueryRequest) -> Result<SemanticOutcome> {
        let (threshold, max_results) = self.resolve(&request)?;
        self.engine
            .semantic_search(&request.question, threshold, max_results)
            .await
    }

    /// Run a query and render its diagnostics
    pub async fn debug_query(
        &self,
        request: QueryRequest,
        format: OutputFormat,
        include_raw: bool,
    ) -> Result<String> {
        let result = self.query(request).await?;
        render_debug(&result, format, include_raw)
    }

    /// Explicit, opt-in removal of stored data
    pub async fn clear(&self, vectors: bool, graph: bool) -> Result<ClearReport> {
        let mut report = ClearReport::default();
        if vectors {
            self.vector_store
                .clear()
                .await
                .context("Failed to clear vector store")?;
            report.vectors_cleared = true;
            tracing::info!("Cleared vector store");
        }
        if graph {
            self.graph_store
                .clear()
                .await
                .context("Failed to clear graph store")?;
            report.graph_cleared = true;
            tracing::info!("Cleared graph store");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests;
