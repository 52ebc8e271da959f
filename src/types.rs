use serde::{Deserialize, Serialize};

/// Request to query an indexed repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question or search text
    pub question: String,
    /// Minimum similarity score (0.0 to 1.0), configured default when absent
    #[serde(default)]
    pub similarity_threshold: Option<f32>,
    /// Maximum number of semantic matches, configured default when absent
    #[serde(default)]
    pub max_results: Option<usize>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            similarity_threshold: None,
            max_results: None,
        }
    }

    pub fn with_threshold(mut self, threshold: Option<f32>) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_max_results(mut self, max_results: Option<usize>) -> Self {
        self.max_results = max_results;
        self
    }
}

/// Outcome of one indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    pub files_processed: usize,
    pub chunks_indexed: usize,
    /// Failed files, embed misses, vector write failures and failed graph
    /// statements
    pub failures: usize,
    pub graph_statements_ok: usize,
    pub graph_statements_failed: usize,
    pub duration_ms: u64,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl std::fmt::Display for IndexReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} files processed, {} chunks indexed, {} failures",
            self.files_processed, self.chunks_indexed, self.failures
        )
    }
}

/// What a clear removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearReport {
    pub vectors_cleared: bool,
    pub graph_cleared: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display() {
        let report = IndexReport {
            files_processed: 12,
            chunks_indexed: 40,
            failures: 2,
            ..Default::default()
        };
        assert_eq!(
            report.to_string(),
            "12 files processed, 40 chunks indexed, 2 failures"
        );
    }

    #[test]
    fn test_query_request_defaults() {
        let req: QueryRequest = serde_json::from_str(r#"{"question": "where is auth"}"#).unwrap();
        assert_eq!(req.question, "where is auth");
        assert!(req.similarity_threshold.is_none());
        assert!(req.max_results.is_none());
    }

    #[test]
    fn test_query_request_builder() {
        let req = QueryRequest::new("q")
            .with_threshold(Some(0.5))
            .with_max_results(Some(3));
        assert_eq!(req.similarity_threshold, Some(0.5));
        assert_eq!(req.max_results, Some(3));
    }
}
