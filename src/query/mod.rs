//! Hybrid retrieval: vector search for relevant chunks, then graph lookups
//! scoped to the files those chunks came from.

mod engine;
mod render;

pub use engine::{HybridQueryEngine, SemanticOutcome};
pub use render::{OutputFormat, render_debug, render_json, render_text};

use crate::graph::Row;
use crate::vector_db::ScoredRow;
use serde::Serialize;

/// A symbol defined in one of the relevant files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolRow {
    pub name: String,
    /// Node label, e.g. `Function`
    #[serde(rename = "type")]
    pub kind: String,
    pub filepath: String,
    pub start_line: Option<usize>,
    pub end_line: Option<usize>,
}

/// An import edge touching one of the relevant files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRow {
    pub source_file: String,
    pub imported_file: String,
}

/// A call or reference into a symbol defined in one of the relevant files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceRow {
    pub symbol_name: String,
    pub symbol_type: String,
    pub defined_in: String,
    pub referenced_by: String,
    pub referenced_in: String,
}

fn text(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(|v| v.to_text())
}

fn line(row: &Row, column: &str) -> Option<usize> {
    row.get(column)
        .and_then(|v| v.as_int())
        .and_then(|n| usize::try_from(n).ok())
}

impl SymbolRow {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            name: text(row, "name")?,
            kind: text(row, "type")?,
            filepath: text(row, "filepath")?,
            start_line: line(row, "start_line"),
            end_line: line(row, "end_line"),
        })
    }
}

impl ImportRow {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            source_file: text(row, "source_file")?,
            imported_file: text(row, "imported_file")?,
        })
    }
}

impl ReferenceRow {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            symbol_name: text(row, "symbol_name")?,
            symbol_type: text(row, "symbol_type")?,
            defined_in: text(row, "defined_in")?,
            referenced_by: text(row, "referenced_by")?,
            referenced_in: text(row, "referenced_in")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructuralData {
    pub symbols: Vec<SymbolRow>,
    pub imports: Vec<ImportRow>,
    pub references: Vec<ReferenceRow>,
}

impl StructuralData {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.imports.is_empty() && self.references.is_empty()
    }
}

/// Wall-clock milliseconds per stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Timings {
    /// Embedding plus vector search, including any fallback retry
    pub semantic_search_ms: f64,
    pub structural_data_ms: f64,
    pub total_query_ms: f64,
}

/// The arguments a query was called with
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QueryParameters {
    pub similarity_threshold: f32,
    pub max_results: usize,
}

/// Cypher text of the lookups that were issued
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawLookups {
    pub symbols: String,
    pub imports: String,
    pub references: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMetadata {
    pub parameters: QueryParameters,
    pub timings: Timings,
    /// Recovered failures, one per failed stage or lookup
    pub errors: Vec<String>,
    /// Threshold of the search that produced `semantic_results`
    pub threshold_used: f32,
    pub fallback_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<RawLookups>,
}

/// Outcome of one hybrid query. Always well-formed, possibly empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub query: String,
    pub semantic_results: Vec<ScoredRow>,
    pub structural_data: StructuralData,
    /// Distinct filepaths of `semantic_results`, best match first
    pub relevant_files: Vec<String>,
    pub metadata: QueryMetadata,
}

impl QueryResult {
    pub fn empty(query: &str, parameters: QueryParameters) -> Self {
        Self {
            query: query.to_string(),
            semantic_results: Vec::new(),
            structural_data: StructuralData::default(),
            relevant_files: Vec::new(),
            metadata: QueryMetadata {
                parameters,
                timings: Timings::default(),
                errors: Vec::new(),
                threshold_used: parameters.similarity_threshold,
                fallback_used: false,
                raw: None,
            },
        }
    }
}

/// Distinct filepaths in first-seen order
pub fn distinct_files(matches: &[ScoredRow]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    matches
        .iter()
        .filter(|m| seen.insert(m.filepath.as_str()))
        .map(|m| m.filepath.clone())
        .collect()
}
