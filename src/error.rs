/// Centralized error types for project-graph-rag using thiserror
///
/// Errors are recovered at the smallest unit (one file, one chunk, one
/// statement, one sub-query). Only setup errors propagate to the caller.
use thiserror::Error;

/// Main error type for the indexing and query pipeline
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector database error: {0}")]
    VectorDb(#[from] VectorDbError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Indexing error: {0}")]
    Indexing(#[from] IndexingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Malformed source. Never fatal: the parser degrades to zero symbols.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Syntax error in {language} source: {reason}")]
    Syntax { language: String, reason: String },

    #[error("Failed to load grammar for {0}")]
    GrammarUnavailable(String),
}

/// Symbols the chunker refuses to slice
#[derive(Error, Debug)]
pub enum ChunkingError {
    #[error(
        "Symbol '{symbol}' in {filepath} has lines {start_line}-{end_line} outside 1..={total_lines}"
    )]
    SymbolOutOfBounds {
        filepath: String,
        symbol: String,
        start_line: usize,
        end_line: usize,
        total_lines: usize,
    },

    #[error("Symbol '{symbol}' in {filepath} has no end line")]
    MissingEndLine { filepath: String, symbol: String },

    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(String),
}

/// Errors related to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    InitializationFailed(String),

    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),

    #[error("Embedding generation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model lock was poisoned: {0}")]
    LockPoisoned(String),
}

/// Errors related to vector store operations
#[derive(Error, Debug)]
pub enum VectorDbError {
    #[error("Failed to initialize vector database: {0}")]
    InitializationFailed(String),

    #[error("Failed to connect to vector database: {0}")]
    ConnectionFailed(String),

    #[error("Failed to store rows: {0}")]
    StoreFailed(String),

    #[error("Failed to search rows: {0}")]
    SearchFailed(String),

    #[error("Failed to clear vector database: {0}")]
    ClearFailed(String),

    #[error("Vector database is not initialized")]
    NotInitialized,

    #[error("Table '{table}' stores {actual}-dimensional vectors but the embedding model produces {expected}; clear it with the previous model first")]
    DimensionMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },
}

/// Errors related to graph store operations
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Failed to reach graph store: {0}")]
    ConnectionFailed(String),

    #[error("Failed to execute {statements} statement(s): {reason}")]
    ExecutionFailed { statements: usize, reason: String },

    #[error("Graph call timed out after {0} seconds")]
    Timeout(u64),
}

/// Errors recorded in query diagnostics
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Structural lookup exceeded deadline of {0} seconds")]
    StructuralTimeout(u64),

    #[error("Failed to embed query: {0}")]
    EmbeddingFailed(String),

    #[error("Vector search failed: {0}")]
    SearchFailed(String),

    #[error("{category} lookup failed: {reason}")]
    LookupFailed { category: String, reason: String },
}

/// Errors related to repository traversal
#[derive(Error, Debug)]
pub enum IndexingError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Failed to walk directory: {0}")]
    WalkFailed(String),

    #[error("Failed to read file '{file}': {reason}")]
    FileReadFailed { file: String, reason: String },

    #[error("Indexing was cancelled")]
    Cancelled,
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to input validation
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Path does not exist: {0}")]
    PathNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("{field} must be {constraint}, got {actual}")]
    ConstraintViolation {
        field: String,
        constraint: String,
        actual: String,
    },

    #[error("Empty {0}")]
    Empty(String),
}

impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Other(format!("{:#}", err))
    }
}

impl RagError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        RagError::Other(msg.into())
    }

    /// Check if this is a user error (validation, bad config) vs system error
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            RagError::Validation(_) | RagError::Config(ConfigError::InvalidValue { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RagError::Validation(ValidationError::PathNotFound("/test".to_string()));
        assert_eq!(
            err.to_string(),
            "Validation error: Path does not exist: /test"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let rag_err: RagError = io_err.into();
        assert!(matches!(rag_err, RagError::Io(_)));
    }

    #[test]
    fn test_error_from_anyhow() {
        let anyhow_err = anyhow::anyhow!("test error");
        let rag_err: RagError = anyhow_err.into();
        assert!(matches!(rag_err, RagError::Other(_)));
        assert_eq!(rag_err.to_string(), "test error");
    }

    #[test]
    fn test_is_user_error() {
        let user_err = RagError::Validation(ValidationError::InvalidPath("test".to_string()));
        assert!(user_err.is_user_error());

        let system_err = RagError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "test"));
        assert!(!system_err.is_user_error());
    }

    #[test]
    fn test_chunking_out_of_bounds_display() {
        let err = ChunkingError::SymbolOutOfBounds {
            filepath: "src/app.py".to_string(),
            symbol: "handler".to_string(),
            start_line: 40,
            end_line: 90,
            total_lines: 60,
        };
        assert_eq!(
            err.to_string(),
            "Symbol 'handler' in src/app.py has lines 40-90 outside 1..=60"
        );
    }

    #[test]
    fn test_graph_execution_failed_display() {
        let err = GraphError::ExecutionFailed {
            statements: 5,
            reason: "exit status 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to execute 5 statement(s): exit status 1"
        );
    }

    #[test]
    fn test_structural_timeout_display() {
        let err: RagError = QueryError::StructuralTimeout(30).into();
        assert_eq!(
            err.to_string(),
            "Query error: Structural lookup exceeded deadline of 30 seconds"
        );
    }

    #[test]
    fn test_embedding_error_dimension_mismatch() {
        let err = EmbeddingError::DimensionMismatch {
            expected: 384,
            actual: 512,
        };
        assert_eq!(
            err.to_string(),
            "Invalid embedding dimension: expected 384, got 512"
        );
    }

    #[test]
    fn test_config_error_invalid_value() {
        let err = ConfigError::InvalidValue {
            key: "query.fallback_floor".to_string(),
            reason: "must be between 0.0 and 1.0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration value for 'query.fallback_floor': must be between 0.0 and 1.0"
        );
    }
}
