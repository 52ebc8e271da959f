/// Benchmarks for parsing, chunking and end-to-end indexing throughput
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use project_graph_rag::config::Config;
use project_graph_rag::embedding::HashEmbedder;
use project_graph_rag::graph::InMemoryGraphStore;
use project_graph_rag::indexer::{ChunkerConfig, SemanticChunker};
use project_graph_rag::parser;
use project_graph_rag::vector_db::InMemoryVectorStore;
use project_graph_rag::GraphRagClient;
use rayon::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::runtime::Runtime;

fn module_source(i: usize) -> String {
    format!(
        r#"from .module_{prev} import Helper{prev}

MAX_ITEMS_{i} = {i}

class Helper{i}(Helper{prev}):
    """Helper number {i}"""

    def __init__(self, value):
        self.value = value

    def process(self):
        return helper_function_{i}(self.value) * MAX_ITEMS_{i}


def helper_function_{i}(x):
    total = 0
    for n in range(x):
        total += n
    return total
"#,
        prev = i.saturating_sub(1)
    )
}

fn create_test_files(dir: &TempDir, count: usize) -> anyhow::Result<()> {
    let src_dir = dir.path().join("pkg");
    std::fs::create_dir_all(&src_dir)?;
    for i in 0..count {
        std::fs::write(src_dir.join(format!("module_{}.py", i)), module_source(i))?;
    }
    Ok(())
}

fn benchmark_indexing(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("indexing");

    for file_count in [10, 50, 100].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_files", file_count)),
            file_count,
            |b, &count| {
                b.iter(|| {
                    rt.block_on(async {
                        let codebase_dir = TempDir::new().unwrap();
                        create_test_files(&codebase_dir, count).unwrap();

                        let client = GraphRagClient::with_components(
                            Config::default(),
                            Arc::new(HashEmbedder::default()),
                            Arc::new(InMemoryVectorStore::new()),
                            Arc::new(InMemoryGraphStore::new()),
                        )
                        .await
                        .unwrap();

                        client
                            .index_repository(black_box(codebase_dir.path()))
                            .await
                            .unwrap()
                    })
                });
            },
        );
    }

    group.finish();
}

fn benchmark_parsing_and_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_and_chunk");
    let chunker = SemanticChunker::new(ChunkerConfig::default()).unwrap();

    for file_count in [10, 50, 100].iter() {
        let sources: Vec<(String, String)> = (0..*file_count)
            .map(|i| (format!("pkg/module_{}.py", i), module_source(i)))
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_files", file_count)),
            &sources,
            |b, sources| {
                b.iter(|| {
                    let _chunks: Vec<_> = sources
                        .par_iter()
                        .flat_map(|(path, content)| {
                            let file = parser::parse(black_box(content), path);
                            let lines: Vec<&str> = content.lines().collect();
                            chunker.chunk(&file, &lines)
                        })
                        .collect();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_indexing, benchmark_parsing_and_chunking);
criterion_main!(benches);
