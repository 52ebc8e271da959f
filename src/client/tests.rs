use super::*;
use crate::graph::InMemoryGraphStore;
use crate::vector_db::InMemoryVectorStore;
use tempfile::TempDir;

async fn create_test_client() -> (GraphRagClient, Arc<InMemoryVectorStore>, Arc<InMemoryGraphStore>) {
    let vectors = Arc::new(InMemoryVectorStore::new());
    let graph = Arc::new(InMemoryGraphStore::new());
    let client = GraphRagClient::with_components(
        Config::default(),
        Arc::new(HashEmbedder::default()),
        vectors.clone(),
        graph.clone(),
    )
    .await
    .unwrap();
    (client, vectors, graph)
}

async fn indexed_client() -> (GraphRagClient, Arc<InMemoryVectorStore>, Arc<InMemoryGraphStore>, TempDir) {
    let (client, vectors, graph) = create_test_client().await;
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("db.py"),
        "def open_connection(url):\n    return connect(url)\n\ndef close_connection(conn):\n    conn.close()\n",
    )
    .unwrap();
    client.index_repository(dir.path()).await.unwrap();
    (client, vectors, graph, dir)
}

#[tokio::test]
async fn test_embedding_dimension_accessor() {
    let (client, _, _) = create_test_client().await;
    assert_eq!(client.embedding_dimension(), HashEmbedder::DEFAULT_DIMENSION);
    assert_eq!(client.config().query.max_results, 10);
}

#[tokio::test]
async fn test_query_uses_configured_defaults() {
    let (client, _, _, _dir) = indexed_client().await;
    let result = client
        .query(QueryRequest::new("open_connection url"))
        .await
        .unwrap();
    assert_eq!(result.metadata.parameters.similarity_threshold, 0.7);
    assert_eq!(result.metadata.parameters.max_results, 10);
}

#[tokio::test]
async fn test_query_finds_indexed_code() {
    let (client, _, graph, _dir) = indexed_client().await;
    let result = client
        .query(QueryRequest::new("open_connection url").with_threshold(Some(0.1)))
        .await
        .unwrap();

    assert_eq!(result.relevant_files, vec!["db.py".to_string()]);
    assert!(
        result
            .structural_data
            .symbols
            .iter()
            .any(|s| s.name == "open_connection")
    );
    assert!(graph.lookups().iter().all(|l| l.files == result.relevant_files));
}

#[tokio::test]
async fn test_rejects_invalid_requests() {
    let (client, _, _) = create_test_client().await;
    assert!(client.query(QueryRequest::new("   ")).await.is_err());
    assert!(
        client
            .query(QueryRequest::new("q").with_threshold(Some(1.5)))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_search_returns_semantic_matches_only() {
    let (client, _, graph, _dir) = indexed_client().await;
    let outcome = client
        .search(QueryRequest::new("close_connection conn").with_threshold(Some(0.1)))
        .await
        .unwrap();
    assert!(!outcome.matches.is_empty());
    assert!(graph.lookups().is_empty());
}

#[tokio::test]
async fn test_debug_query_renders_text() {
    let (client, _, _, _dir) = indexed_client().await;
    let out = client
        .debug_query(
            QueryRequest::new("open_connection").with_threshold(Some(0.1)),
            OutputFormat::Text,
            false,
        )
        .await
        .unwrap();
    assert!(out.starts_with("=== QUERY DEBUG INFO ==="));
    assert!(out.contains("=== RESULTS SUMMARY ==="));
}

#[tokio::test]
async fn test_clear_selected_stores() {
    let (client, vectors, graph, _dir) = indexed_client().await;
    assert!(vectors.count().await.unwrap() > 0);

    let report = client.clear(true, false).await.unwrap();
    assert!(report.vectors_cleared);
    assert!(!report.graph_cleared);
    assert_eq!(vectors.count().await.unwrap(), 0);
    assert!(graph.stats().files > 0);

    client.clear(false, true).await.unwrap();
    assert_eq!(graph.stats().files, 0);
}

#[tokio::test]
async fn test_client_clone_shares_stores() {
    let (client, vectors, _, _dir) = indexed_client().await;
    let cloned = client.clone();
    cloned.clear(true, false).await.unwrap();
    assert_eq!(vectors.count().await.unwrap(), 0);
}
