use super::GraphRagClient;
use crate::concurrency::{Coordinator, RunStats};
use crate::error::IndexingError;
use crate::graph::{FileGraph, GraphBuilder, Statement, constraint_statements, link_across_files};
use crate::indexer::{EmbeddingIndexer, ExclusionPolicy, IndexOutcome, RepositorySource};
use crate::parser;
use crate::types::IndexReport;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// What one file contributed
struct FileOutcome {
    chunks: IndexOutcome,
    graph: FileGraph,
}

impl FileOutcome {
    fn empty(filepath: &str) -> Self {
        Self {
            chunks: IndexOutcome::default(),
            graph: FileGraph::empty(filepath),
        }
    }
}

impl GraphRagClient {
    /// Index every file `source` lists. Per-file work runs concurrently;
    /// graph statements are written once all files are done: constraints
    /// first, then nodes, then edges.
    pub async fn index_source(
        &self,
        source: &dyn RepositorySource,
        cancel: Option<&CancellationToken>,
    ) -> Result<IndexReport> {
        let started = Instant::now();
        let indexing = &self.config.indexing;

        let files = source
            .list("", &indexing.extensions, &ExclusionPolicy::from(indexing))
            .await
            .context("Failed to list repository files")?;

        let known: HashSet<String> = files.iter().cloned().collect();
        let builder = GraphBuilder::new(&known, &indexing.exclude_graph_extensions);
        let embedder = EmbeddingIndexer::new(indexing, &self.config.embedding);
        let (builder, embedder) = (&builder, &embedder);

        let results = Coordinator::new("file indexing")
            .map_concurrently(
                files.clone(),
                |path| async move {
                    if cancel.is_some_and(|c| c.is_cancelled()) {
                        return Err(IndexingError::Cancelled.into());
                    }
                    self.index_file(source, builder, embedder, &path).await
                },
                indexing.max_concurrent_files,
            )
            .await;

        let mut report = IndexReport::default();
        let mut graphs = Vec::new();
        let mut cancelled = 0;
        for (path, result) in files.iter().zip(results) {
            match result {
                Ok(outcome) => {
                    report.files_processed += 1;
                    report.chunks_indexed += outcome.chunks.persisted;
                    report.failures += outcome.chunks.failures();
                    report.errors.extend(outcome.chunks.errors);
                    graphs.push(outcome.graph);
                }
                Err(e) if matches!(e.downcast_ref::<IndexingError>(), Some(IndexingError::Cancelled)) => {
                    cancelled += 1;
                }
                Err(e) => {
                    report.failures += 1;
                    report.errors.push(format!("{}: {:#}", path, e));
                }
            }
        }
        if cancelled > 0 {
            tracing::info!("Indexing cancelled, {} files not processed", cancelled);
            report.errors.push(format!("cancelled before {} files", cancelled));
        }

        let stats = self.write_graph(&graphs).await;
        report.graph_statements_ok = stats.succeeded;
        report.graph_statements_failed = stats.failed;
        report.failures += stats.failed;
        report.duration_ms = started.elapsed().as_millis() as u64;

        tracing::info!("{} in {}ms", report, report.duration_ms);
        Ok(report)
    }

    async fn index_file(
        &self,
        source: &dyn RepositorySource,
        builder: &GraphBuilder<'_>,
        embedder: &EmbeddingIndexer,
        path: &str,
    ) -> Result<FileOutcome> {
        let size = source.size(path).await?;
        if size == 0 {
            tracing::debug!("Skipping empty file {}", path);
            return Ok(FileOutcome::empty(path));
        }
        if size > self.config.indexing.max_file_size as u64 {
            tracing::info!("Skipping {} ({} bytes exceeds limit)", path, size);
            return Ok(FileOutcome::empty(path));
        }

        let content = source.read(path).await?;
        let file = parser::parse(&content, path);
        let lines: Vec<&str> = content.lines().collect();
        let chunks = self.chunker.chunk(&file, &lines);
        tracing::debug!(
            "{}: {} symbols, {} imports, {} chunks",
            path,
            file.symbols.len(),
            file.imports.len(),
            chunks.len()
        );

        let chunks = embedder
            .index(chunks, self.embedding_provider.clone(), self.vector_store.as_ref())
            .await;
        let graph = builder.build(&file, &content);
        Ok(FileOutcome { chunks, graph })
    }

    /// Write every file's graph, counting in statements
    async fn write_graph(&self, graphs: &[FileGraph]) -> RunStats {
        let mut stats = RunStats::default();
        if graphs.iter().all(|g| g.statement_count() == 0) {
            return stats;
        }

        let graph = &self.config.graph;
        let store = self.graph_store.as_ref();
        let coordinator = Coordinator::new("graph");

        // One call per constraint
        let constraints = coordinator
            .run_concurrently(
                constraint_statements(),
                |statement| async move {
                    store.execute(std::slice::from_ref(&statement)).await.map(|_| ())
                },
                graph.max_concurrent_statements,
            )
            .await;
        if constraints.failed > 0 {
            tracing::warn!("{} constraints could not be created", constraints.failed);
        }
        stats.merge(constraints);

        let nodes: Vec<Statement> = graphs
            .iter()
            .flat_map(|g| g.node_statements.iter().cloned())
            .collect();
        let node_stats = coordinator
            .run_in_batches(store, &nodes, graph.batch_size, graph.max_concurrent_batches)
            .await;
        tracing::info!(
            "Node statements: {} ok, {} failed",
            node_stats.succeeded,
            node_stats.failed
        );
        stats.merge(node_stats);

        let mut edges: Vec<Statement> = graphs
            .iter()
            .flat_map(|g| g.edge_statements.iter().cloned())
            .collect();
        edges.extend(link_across_files(graphs));
        let edge_stats = coordinator
            .run_in_batches(store, &edges, graph.batch_size, graph.max_concurrent_batches)
            .await;
        tracing::info!(
            "Edge statements: {} ok, {} failed",
            edge_stats.succeeded,
            edge_stats.failed
        );
        stats.merge(edge_stats);

        stats
    }
}

#[cfg(test)]
mod tests;
