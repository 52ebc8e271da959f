/// Configuration system for project-graph-rag
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, RagError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "PROJECT_GRAPH_RAG_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Vector index configuration
    #[serde(default)]
    pub vector_db: VectorDbConfig,

    /// Graph store configuration
    #[serde(default)]
    pub graph: GraphConfig,

    /// Indexing configuration
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Query configuration
    #[serde(default)]
    pub query: QueryConfig,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name (e.g., "all-MiniLM-L6-v2", "BAAI/bge-small-en-v1.5")
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Timeout in seconds for one embedding call
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Embedding calls in flight within one chunk batch. Calls on the
    /// fastembed model run in parallel only up to `model_instances`.
    #[serde(default = "default_embedding_concurrency")]
    pub max_concurrent: usize,

    /// Copies of the fastembed model loaded side by side
    #[serde(default = "default_model_instances")]
    pub model_instances: usize,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// LanceDB data directory path
    #[serde(default = "default_lancedb_path")]
    pub lancedb_path: PathBuf,

    /// Table holding chunk rows
    #[serde(default = "default_table_name")]
    pub table_name: String,
}

/// Graph store configuration (cypher-shell backend)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_graph_uri")]
    pub uri: String,

    #[serde(default = "default_graph_username")]
    pub username: String,

    /// Never written by `save`; read from the environment instead
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Path or name of the cypher-shell executable
    #[serde(default = "default_cypher_shell")]
    pub cypher_shell: String,

    /// Deadline for one cypher-shell invocation
    #[serde(default = "default_graph_timeout")]
    pub timeout_secs: u64,

    /// Statements joined into one remote call
    #[serde(default = "default_graph_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,

    /// Concurrency for unbatched statement execution
    #[serde(default = "default_max_concurrent_statements")]
    pub max_concurrent_statements: usize,
}

/// Indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Symbols longer than this are split into sub-chunks
    #[serde(default = "default_max_semantic_chunk_lines")]
    pub max_semantic_chunk_lines: usize,

    /// Lines per fallback chunk and per oversized-symbol sub-chunk
    #[serde(default = "default_fallback_chunk_size")]
    pub fallback_chunk_size: usize,

    /// Maximum file size to index (in bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Chunks per embedding batch
    #[serde(default = "default_index_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,

    /// File extensions (without the dot) eligible for indexing
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names skipped anywhere in the tree
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,

    /// File name suffixes, infix fragments ending in `.`, or globs that
    /// exclude a file
    #[serde(default = "default_exclude_files")]
    pub exclude_files: Vec<String>,

    /// Extensions indexed as vectors but kept out of the graph
    #[serde(default = "default_exclude_graph_extensions")]
    pub exclude_graph_extensions: Vec<String>,
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Default minimum similarity score (0.0 to 1.0)
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Lowest threshold a retry may fall back to
    #[serde(default = "default_fallback_floor")]
    pub fallback_floor: f32,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Deadline for the whole structural stage
    #[serde(default = "default_structural_timeout")]
    pub structural_timeout_secs: u64,

    /// LIMIT on the symbol lookup
    #[serde(default = "default_symbol_limit")]
    pub symbol_limit: usize,
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_embedding_concurrency() -> usize {
    5
}

fn default_model_instances() -> usize {
    1
}

fn default_lancedb_path() -> PathBuf {
    crate::paths::PlatformPaths::default_lancedb_path()
}

fn default_table_name() -> String {
    "code_chunks".to_string()
}

fn default_graph_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_graph_username() -> String {
    "neo4j".to_string()
}

fn default_cypher_shell() -> String {
    "cypher-shell".to_string()
}

fn default_graph_timeout() -> u64 {
    60
}

fn default_graph_batch_size() -> usize {
    5
}

fn default_max_concurrent_batches() -> usize {
    8
}

fn default_max_concurrent_statements() -> usize {
    15
}

fn default_max_semantic_chunk_lines() -> usize {
    200
}

fn default_fallback_chunk_size() -> usize {
    50
}

fn default_max_file_size() -> usize {
    1_000_000
}

fn default_index_batch_size() -> usize {
    10
}

fn default_max_concurrent_files() -> usize {
    5
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_extensions() -> Vec<String> {
    to_strings(&[
        "py", "js", "jsx", "ts", "tsx", "java", "c", "h", "cpp", "hpp", "cc", "cxx", "go", "rs",
        "rb", "php", "swift", "kt", "cs",
    ])
}

fn default_exclude_dirs() -> Vec<String> {
    to_strings(&[
        "node_modules",
        "build",
        "dist",
        "target",
        ".git",
        "bin",
        "obj",
        "__pycache__",
        ".venv",
        "venv",
        "vendor",
        "out",
        ".idea",
        ".vscode",
        "coverage",
    ])
}

fn default_exclude_files() -> Vec<String> {
    to_strings(&[
        ".min.js", ".min.css", ".map", ".bundle.", ".so", ".dll", ".exe", ".bin", ".o", ".a",
        ".lib", ".pyc", ".pyo", ".zip", ".tar", ".gz", ".rar", ".jar", ".war", ".ear",
    ])
}

fn default_exclude_graph_extensions() -> Vec<String> {
    to_strings(&["xml", "json", "md", "txt", "csv", "yml", "yaml", "html"])
}

fn default_similarity_threshold() -> f32 {
    0.7
}

fn default_fallback_floor() -> f32 {
    0.1
}

fn default_max_results() -> usize {
    10
}

fn default_structural_timeout() -> u64 {
    30
}

fn default_symbol_limit() -> usize {
    20
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            timeout_secs: default_embedding_timeout(),
            max_concurrent: default_embedding_concurrency(),
            model_instances: default_model_instances(),
        }
    }
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            lancedb_path: default_lancedb_path(),
            table_name: default_table_name(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: default_graph_uri(),
            username: default_graph_username(),
            password: String::new(),
            cypher_shell: default_cypher_shell(),
            timeout_secs: default_graph_timeout(),
            batch_size: default_graph_batch_size(),
            max_concurrent_batches: default_max_concurrent_batches(),
            max_concurrent_statements: default_max_concurrent_statements(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            max_semantic_chunk_lines: default_max_semantic_chunk_lines(),
            fallback_chunk_size: default_fallback_chunk_size(),
            max_file_size: default_max_file_size(),
            batch_size: default_index_batch_size(),
            max_concurrent_files: default_max_concurrent_files(),
            extensions: default_extensions(),
            exclude_dirs: default_exclude_dirs(),
            exclude_files: default_exclude_files(),
            exclude_graph_extensions: default_exclude_graph_extensions(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            fallback_floor: default_fallback_floor(),
            max_results: default_max_results(),
            structural_timeout_secs: default_structural_timeout(),
            symbol_limit: default_symbol_limit(),
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> RagError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
    .into()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, RagError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, RagError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), RagError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), RagError> {
        let positive = [
            ("embedding.max_concurrent", self.embedding.max_concurrent),
            ("embedding.model_instances", self.embedding.model_instances),
            ("graph.batch_size", self.graph.batch_size),
            ("graph.max_concurrent_batches", self.graph.max_concurrent_batches),
            (
                "graph.max_concurrent_statements",
                self.graph.max_concurrent_statements,
            ),
            (
                "indexing.max_semantic_chunk_lines",
                self.indexing.max_semantic_chunk_lines,
            ),
            (
                "indexing.fallback_chunk_size",
                self.indexing.fallback_chunk_size,
            ),
            ("indexing.max_file_size", self.indexing.max_file_size),
            ("indexing.batch_size", self.indexing.batch_size),
            (
                "indexing.max_concurrent_files",
                self.indexing.max_concurrent_files,
            ),
            ("query.max_results", self.query.max_results),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(invalid(key, "must be greater than 0"));
            }
        }

        if self.indexing.fallback_chunk_size > self.indexing.max_semantic_chunk_lines {
            return Err(invalid(
                "indexing.fallback_chunk_size",
                format!(
                    "must not exceed indexing.max_semantic_chunk_lines ({})",
                    self.indexing.max_semantic_chunk_lines
                ),
            ));
        }

        for (key, value) in [
            ("query.similarity_threshold", self.query.similarity_threshold),
            ("query.fallback_floor", self.query.fallback_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(
                    key,
                    format!("must be between 0.0 and 1.0, got {}", value),
                ));
            }
        }

        if self.query.fallback_floor > self.query.similarity_threshold {
            return Err(invalid(
                "query.fallback_floor",
                format!(
                    "must not exceed query.similarity_threshold ({})",
                    self.query.similarity_threshold
                ),
            ));
        }

        if self.embedding.timeout_secs == 0 || self.graph.timeout_secs == 0 {
            return Err(invalid("timeout_secs", "must be greater than 0"));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        let var = |name: &str| std::env::var(format!("{}{}", ENV_PREFIX, name));

        if let Ok(path) = var("LANCEDB_PATH") {
            self.vector_db.lancedb_path = PathBuf::from(path);
        }

        if let Ok(model) = var("MODEL") {
            self.embedding.model_name = model;
        }

        if let Ok(uri) = var("GRAPH_URI") {
            self.graph.uri = uri;
        }

        if let Ok(username) = var("GRAPH_USERNAME") {
            self.graph.username = username;
        }

        if let Ok(password) = var("GRAPH_PASSWORD") {
            self.graph.password = password;
        }

        if let Ok(max) = var("MAX_CONCURRENT_FILES")
            && let Ok(max) = max.parse()
        {
            self.indexing.max_concurrent_files = max;
        }

        if let Ok(size) = var("BATCH_SIZE")
            && let Ok(size) = size.parse()
        {
            self.indexing.batch_size = size;
        }

        if let Ok(threshold) = var("SIMILARITY_THRESHOLD")
            && let Ok(threshold) = threshold.parse()
        {
            self.query.similarity_threshold = threshold;
        }
    }

    /// Load a config from `path` (or the default location), then apply
    /// environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self, RagError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::load_or_default()?,
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, RagError> {
        Self::load(None)
    }
}

#[cfg(test)]
mod tests;
