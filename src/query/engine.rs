use super::{
    ImportRow, QueryParameters, QueryResult, RawLookups, ReferenceRow, StructuralData, SymbolRow,
    distinct_files,
};
use crate::config::QueryConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::QueryError;
use crate::graph::{GraphStore, Lookup, LookupKind, Row, Statement};
use crate::vector_db::{ScoredRow, VectorStore};
use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Vector matches plus how they were found
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticOutcome {
    pub matches: Vec<ScoredRow>,
    pub threshold_used: f32,
    pub fallback_used: bool,
}

/// Runs embed, vector search and scoped structural lookups for one question
pub struct HybridQueryEngine {
    provider: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorStore>,
    graph: Arc<dyn GraphStore>,
    config: QueryConfig,
    embed_timeout: Duration,
    structural_timeout: Duration,
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

impl HybridQueryEngine {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        vectors: Arc<dyn VectorStore>,
        graph: Arc<dyn GraphStore>,
        config: QueryConfig,
        embed_timeout: Duration,
    ) -> Self {
        let structural_timeout = Duration::from_secs(config.structural_timeout_secs);
        Self {
            provider,
            vectors,
            graph,
            config,
            embed_timeout,
            structural_timeout,
        }
    }

    pub fn with_structural_timeout(mut self, timeout: Duration) -> Self {
        self.structural_timeout = timeout;
        self
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Answer `question`. Failures in any stage are recorded in
    /// `metadata.errors` and leave that stage's part of the result empty.
    pub async fn query(
        &self,
        question: &str,
        similarity_threshold: f32,
        max_results: usize,
    ) -> QueryResult {
        let started = Instant::now();
        let parameters = QueryParameters {
            similarity_threshold,
            max_results,
        };
        let mut result = QueryResult::empty(question, parameters);

        tracing::info!(
            "Query {:?} (threshold {}, max {})",
            question,
            similarity_threshold,
            max_results
        );

        match self
            .semantic_search(question, similarity_threshold, max_results)
            .await
        {
            Ok(semantic) => {
                result.metadata.threshold_used = semantic.threshold_used;
                result.metadata.fallback_used = semantic.fallback_used;
                result.semantic_results = semantic.matches;
            }
            Err(e) => {
                tracing::warn!("Semantic stage failed: {:#}", e);
                result.metadata.errors.push(format!("{:#}", e));
            }
        }
        result.metadata.timings.semantic_search_ms = elapsed_ms(started);
        result.relevant_files = distinct_files(&result.semantic_results);

        if result.relevant_files.is_empty() {
            tracing::debug!("No relevant files, skipping structural lookups");
        } else {
            let structural_started = Instant::now();
            let (data, raw, errors) = self.structural_lookup(&result.relevant_files).await;
            result.structural_data = data;
            result.metadata.raw = Some(raw);
            result.metadata.errors.extend(errors);
            result.metadata.timings.structural_data_ms = elapsed_ms(structural_started);
        }

        result.metadata.timings.total_query_ms = elapsed_ms(started);
        tracing::info!(
            "Query returned {} matches across {} files, {} symbols in {:.2}ms",
            result.semantic_results.len(),
            result.relevant_files.len(),
            result.structural_data.symbols.len(),
            result.metadata.timings.total_query_ms
        );
        result
    }

    /// Embed `question` and search, retrying once at the fallback floor
    /// when nothing clears `threshold`
    pub async fn semantic_search(
        &self,
        question: &str,
        threshold: f32,
        limit: usize,
    ) -> Result<SemanticOutcome> {
        let embedding = self.embed(question).await?;

        let matches = self.search(&embedding, threshold, limit).await?;
        let floor = self.config.fallback_floor;
        if !matches.is_empty() || threshold <= floor {
            return Ok(SemanticOutcome {
                matches,
                threshold_used: threshold,
                fallback_used: false,
            });
        }

        let fallback = floor.min(threshold);
        tracing::info!(
            "No matches at threshold {}, retrying at {}",
            threshold,
            fallback
        );
        let matches = self.search(&embedding, fallback, limit).await?;
        Ok(SemanticOutcome {
            matches,
            threshold_used: fallback,
            fallback_used: true,
        })
    }

    async fn search(&self, embedding: &[f32], threshold: f32, limit: usize) -> Result<Vec<ScoredRow>> {
        self.vectors
            .search(embedding, threshold, limit)
            .await
            .map_err(|e| QueryError::SearchFailed(format!("{:#}", e)).into())
    }

    async fn embed(&self, question: &str) -> Result<Vec<f32>> {
        let provider = self.provider.clone();
        let text = question.to_string();
        let task = tokio::task::spawn_blocking(move || provider.embed_batch(vec![text]));

        let embeddings = match tokio::time::timeout(self.embed_timeout, task).await {
            Ok(Ok(Ok(embeddings))) => embeddings,
            Ok(Ok(Err(e))) => return Err(QueryError::EmbeddingFailed(format!("{:#}", e)).into()),
            Ok(Err(e)) => {
                return Err(
                    QueryError::EmbeddingFailed(format!("embedding task panicked: {}", e)).into(),
                );
            }
            Err(_) => {
                return Err(QueryError::EmbeddingFailed(format!(
                    "timed out after {} seconds",
                    self.embed_timeout.as_secs()
                ))
                .into());
            }
        };

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::EmbeddingFailed("model returned no vector".to_string()).into())
    }

    /// The three lookups run concurrently against one shared deadline. A
    /// lookup that fails or misses the deadline empties only its own
    /// category; the others keep their rows.
    async fn structural_lookup(&self, files: &[String]) -> (StructuralData, RawLookups, Vec<String>) {
        let symbols = Lookup::new(LookupKind::Symbols, files, self.config.symbol_limit);
        let imports = Lookup::new(LookupKind::Imports, files, self.config.symbol_limit);
        let references = Lookup::new(LookupKind::References, files, self.config.symbol_limit);

        let raw = RawLookups {
            symbols: Statement::Lookup(symbols.clone()).to_cypher(),
            imports: Statement::Lookup(imports.clone()).to_cypher(),
            references: Statement::Lookup(references.clone()).to_cypher(),
        };

        let deadline = tokio::time::Instant::now() + self.structural_timeout;
        let (symbol_rows, import_rows, reference_rows) = tokio::join!(
            tokio::time::timeout_at(deadline, self.graph.lookup(&symbols)),
            tokio::time::timeout_at(deadline, self.graph.lookup(&imports)),
            tokio::time::timeout_at(deadline, self.graph.lookup(&references))
        );

        let mut errors = Vec::new();
        let mut late = Vec::new();
        let data = StructuralData {
            symbols: collect(LookupKind::Symbols, symbol_rows, SymbolRow::from_row, &mut errors, &mut late),
            imports: collect(LookupKind::Imports, import_rows, ImportRow::from_row, &mut errors, &mut late),
            references: collect(
                LookupKind::References,
                reference_rows,
                ReferenceRow::from_row,
                &mut errors,
                &mut late,
            ),
        };

        if !late.is_empty() {
            let e = QueryError::StructuralTimeout(self.structural_timeout.as_secs());
            tracing::warn!("{} ({})", e, late.join(", "));
            errors.push(format!("{} ({})", e, late.join(", ")));
        }

        (data, raw, errors)
    }
}

fn collect<T>(
    kind: LookupKind,
    rows: Result<Result<Vec<Row>>, tokio::time::error::Elapsed>,
    convert: fn(&Row) -> Option<T>,
    errors: &mut Vec<String>,
    late: &mut Vec<&'static str>,
) -> Vec<T> {
    match rows {
        Ok(Ok(rows)) => rows.iter().filter_map(convert).collect(),
        Ok(Err(e)) => {
            let e = QueryError::LookupFailed {
                category: kind.as_str().to_string(),
                reason: format!("{:#}", e),
            };
            tracing::warn!("{}", e);
            errors.push(e.to_string());
            Vec::new()
        }
        Err(_) => {
            late.push(kind.as_str());
            Vec::new()
        }
    }
}
