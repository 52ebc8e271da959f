use super::*;
use crate::config::Config;
use crate::embedding::HashEmbedder;
use crate::graph::{EdgeKind, InMemoryGraphStore, NodeRef, SymbolKey};
use crate::vector_db::{InMemoryVectorStore, VectorStore};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const SERVICE: &str = r#"from .models import User

class Database:
    def connect(self):
        return open_pool()

def load_user(db):
    db.connect()
    return User()
"#;

const MODELS: &str = "class User:\n    def save(self):\n        pass\n";

struct Harness {
    client: GraphRagClient,
    vectors: Arc<InMemoryVectorStore>,
    graph: Arc<InMemoryGraphStore>,
}

async fn harness(config: Config) -> Harness {
    let vectors = Arc::new(InMemoryVectorStore::new());
    let graph = Arc::new(InMemoryGraphStore::new());
    let client = GraphRagClient::with_components(
        config,
        Arc::new(HashEmbedder::new(32)),
        vectors.clone(),
        graph.clone(),
    )
    .await
    .unwrap();
    Harness {
        client,
        vectors,
        graph,
    }
}

fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
    std::fs::write(full, content).unwrap();
}

fn repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "app/service.py", SERVICE);
    write(dir.path(), "app/models.py", MODELS);
    dir
}

#[tokio::test]
async fn test_indexes_into_both_stores() {
    let h = harness(Config::default()).await;
    let dir = repo();

    let report = h.client.index_repository(dir.path()).await.unwrap();
    assert_eq!(report.files_processed, 2);
    assert!(report.chunks_indexed >= 2);
    assert_eq!(report.failures, 0, "errors: {:?}", report.errors);
    assert_eq!(h.vectors.count().await.unwrap(), report.chunks_indexed);

    let stats = h.graph.stats();
    assert_eq!(stats.files, 2);
    assert!(stats.symbols >= 5);
    assert!(report.graph_statements_ok > 0);
    assert_eq!(report.graph_statements_failed, 0);
}

#[tokio::test]
async fn test_cross_file_call_is_linked() {
    let h = harness(Config::default()).await;
    let dir = repo();
    h.client.index_repository(dir.path()).await.unwrap();

    let service = parser::parse(SERVICE, "app/service.py");
    let models = parser::parse(MODELS, "app/models.py");
    let caller = service.symbols.iter().find(|s| s.name == "load_user").unwrap();
    let target = models.symbols.iter().find(|s| s.name == "User").unwrap();

    assert!(h.graph.has_edge(
        EdgeKind::Calls,
        &NodeRef::Symbol(SymbolKey::for_symbol(caller, "app/service.py")),
        &NodeRef::Symbol(SymbolKey::for_symbol(target, "app/models.py")),
    ));
    assert!(h.graph.has_edge(
        EdgeKind::Imports,
        &NodeRef::File("app/service.py".to_string()),
        &NodeRef::File("app/models.py".to_string()),
    ));
}

#[tokio::test]
async fn test_empty_file_short_circuits() {
    let h = harness(Config::default()).await;
    let dir = TempDir::new().unwrap();
    write(dir.path(), "empty.py", "");

    let report = h.client.index_repository(dir.path()).await.unwrap();
    assert_eq!(report.files_processed, 1);
    assert_eq!(report.chunks_indexed, 0);
    assert_eq!(report.graph_statements_ok + report.graph_statements_failed, 0);
    assert_eq!(h.graph.calls(), 0);
    assert_eq!(h.vectors.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_oversized_file_is_skipped() {
    let mut config = Config::default();
    config.indexing.max_file_size = 16;
    let h = harness(config).await;
    let dir = repo();

    let report = h.client.index_repository(dir.path()).await.unwrap();
    assert_eq!(report.chunks_indexed, 0);
    assert_eq!(h.graph.stats().files, 0);
}

#[tokio::test]
async fn test_reindexing_is_idempotent() {
    let h = harness(Config::default()).await;
    let dir = repo();

    let first = h.client.index_repository(dir.path()).await.unwrap();
    let stats = h.graph.stats();
    let rows = h.vectors.count().await.unwrap();

    let second = h.client.index_repository(dir.path()).await.unwrap();
    assert_eq!(first.chunks_indexed, second.chunks_indexed);
    assert_eq!(h.graph.stats(), stats);
    assert_eq!(h.vectors.count().await.unwrap(), rows);
}

#[tokio::test]
async fn test_graph_failures_are_counted_not_fatal() {
    let h = harness(Config::default()).await;
    h.graph.fail_calls_containing("DEFINED_IN");
    let dir = repo();

    let report = h.client.index_repository(dir.path()).await.unwrap();
    assert_eq!(report.files_processed, 2);
    assert!(report.chunks_indexed > 0);
    assert!(report.graph_statements_failed > 0);
    assert!(report.failures >= report.graph_statements_failed);
    assert_eq!(h.graph.stats().files, 2);
}

#[tokio::test]
async fn test_cancelled_run_processes_nothing() {
    let h = harness(Config::default()).await;
    let dir = repo();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = h
        .client
        .index_repository_with_cancel(dir.path(), &cancel)
        .await
        .unwrap();
    assert_eq!(report.files_processed, 0);
    assert_eq!(report.failures, 0);
    assert!(report.errors.iter().any(|e| e.contains("cancelled")));
    assert_eq!(h.vectors.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_missing_root_is_an_error() {
    let h = harness(Config::default()).await;
    let result = h.client.index_repository(Path::new("/no/such/repo")).await;
    assert!(result.is_err());
}
