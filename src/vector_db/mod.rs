// LanceDB is the default embedded vector database
mod lance_store;
mod memory;

pub use lance_store::LanceVectorStore;
pub use memory::InMemoryVectorStore;

use crate::parser::{Symbol, SymbolKind};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Denormalized view of a symbol stored alongside a chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSummary {
    pub name: String,
    pub kind: SymbolKind,
    pub start_line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
}

impl From<&Symbol> for SymbolSummary {
    fn from(symbol: &Symbol) -> Self {
        Self {
            name: symbol.name.clone(),
            kind: symbol.kind,
            start_line: symbol.start_line,
            end_line: symbol.end_line,
        }
    }
}

/// One embedded chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRow {
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub filepath: String,
    pub start_line: usize,
    pub end_line: usize,
    pub language: String,
    pub symbols: Vec<SymbolSummary>,
    pub context: String,
}

/// A search hit, without its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRow {
    pub id: String,
    pub content: String,
    pub filepath: String,
    pub start_line: usize,
    pub end_line: usize,
    pub language: String,
    pub symbols: Vec<SymbolSummary>,
    pub context: String,
    /// Cosine similarity, higher is closer
    pub score: f32,
}

impl ScoredRow {
    pub fn from_row(row: VectorRow, score: f32) -> Self {
        Self {
            id: row.id,
            content: row.content,
            filepath: row.filepath,
            start_line: row.start_line,
            end_line: row.end_line,
            language: row.language,
            symbols: row.symbols,
            context: row.context,
            score,
        }
    }
}

/// Trait for vector database operations
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the table if needed
    async fn initialize(&self, dimension: usize) -> Result<()>;

    /// Insert or replace rows by `id`, returning how many were written
    async fn upsert(&self, rows: Vec<VectorRow>) -> Result<usize>;

    /// Up to `limit` rows with `score >= threshold`, highest score first
    async fn search(&self, embedding: &[f32], threshold: f32, limit: usize)
    -> Result<Vec<ScoredRow>>;

    /// Remove every row
    async fn clear(&self) -> Result<()>;

    async fn count(&self) -> Result<usize>;
}

/// Cosine similarity of two vectors, 0 when either is all zeros
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_symbol_summary_from_symbol() {
        let symbol = Symbol::new("run", SymbolKind::Function, 4, 0).with_end_line(9);
        let summary = SymbolSummary::from(&symbol);
        assert_eq!(summary.end_line, Some(9));
        let json = serde_json::to_string(&summary).unwrap();
        assert_eq!(json, r#"{"name":"run","kind":"function","start_line":4,"end_line":9}"#);
    }
}
