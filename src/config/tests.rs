use super::*;
use tempfile::NamedTempFile;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.embedding.model_name, "all-MiniLM-L6-v2");
    assert_eq!(config.indexing.max_semantic_chunk_lines, 200);
    assert_eq!(config.indexing.fallback_chunk_size, 50);
    assert_eq!(config.indexing.batch_size, 10);
    assert_eq!(config.graph.batch_size, 5);
    assert_eq!(config.graph.max_concurrent_batches, 8);
    assert_eq!(config.query.similarity_threshold, 0.7);
    assert_eq!(config.query.fallback_floor, 0.1);
    assert_eq!(config.query.structural_timeout_secs, 30);
}

#[test]
fn test_validate_valid_config() {
    assert!(Config::default().validate().is_ok());
}

#[test]
fn test_validate_zero_batch_size() {
    let mut config = Config::default();
    config.graph.batch_size = 0;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("graph.batch_size"));
    assert!(err.is_user_error());
}

#[test]
fn test_validate_fallback_larger_than_semantic_limit() {
    let mut config = Config::default();
    config.indexing.fallback_chunk_size = 300;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_threshold_out_of_range() {
    let mut config = Config::default();
    config.query.similarity_threshold = 1.5;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_floor_above_threshold() {
    let mut config = Config::default();
    config.query.similarity_threshold = 0.05;
    config.query.fallback_floor = 0.1;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("query.fallback_floor"));
}

#[test]
fn test_save_and_load() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    let mut config = Config::default();
    config.indexing.max_concurrent_files = 3;
    config.query.similarity_threshold = 0.8;
    config.graph.password = "secret".to_string();

    config.save(path).unwrap();
    let loaded = Config::from_file(path).unwrap();

    assert_eq!(loaded.indexing.max_concurrent_files, 3);
    assert_eq!(loaded.query.similarity_threshold, 0.8);
    assert!(loaded.graph.password.is_empty());

    let raw = std::fs::read_to_string(path).unwrap();
    assert!(!raw.contains("secret"));
}

#[test]
fn test_partial_file_uses_defaults() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(
        temp_file.path(),
        "[query]\nmax_results = 4\n\n[graph]\nuri = \"bolt://graph:7687\"\n",
    )
    .unwrap();

    let loaded = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(loaded.query.max_results, 4);
    assert_eq!(loaded.query.similarity_threshold, 0.7);
    assert_eq!(loaded.graph.uri, "bolt://graph:7687");
    assert_eq!(loaded.graph.username, "neo4j");
    assert_eq!(loaded.indexing.fallback_chunk_size, 50);
}

#[test]
fn test_load_nonexistent_file() {
    let result = Config::from_file(Path::new("/nonexistent/config.toml"));
    assert!(matches!(
        result,
        Err(RagError::Config(ConfigError::FileNotFound(_)))
    ));
}

#[test]
fn test_load_invalid_toml() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), "this is not [valid toml").unwrap();
    let result = Config::from_file(temp_file.path());
    assert!(matches!(
        result,
        Err(RagError::Config(ConfigError::ParseFailed(_)))
    ));
}

#[test]
fn test_default_exclusions_cover_build_output() {
    let config = IndexingConfig::default();
    assert!(config.exclude_dirs.contains(&"node_modules".to_string()));
    assert!(config.exclude_dirs.contains(&"__pycache__".to_string()));
    assert!(config.exclude_files.contains(&".min.js".to_string()));
    assert!(config.exclude_graph_extensions.contains(&"md".to_string()));
    assert!(config.extensions.contains(&"py".to_string()));
}
