use anyhow::Result;
use clap::{Parser, Subcommand};
use project_graph_rag::{
    Config, GraphRagClient, OutputFormat, QueryRequest, render_json, render_text,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "project-graph-rag")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ", built ", env!("BUILD_TIMESTAMP"), ")"))]
#[command(about = "Hybrid vector and graph indexing for source repositories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the platform config path)
    #[arg(short, long, global = true, env = "PROJECT_GRAPH_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Use the deterministic hash embedder instead of downloading a model
    #[arg(long, global = true)]
    offline: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a repository into the vector and graph stores
    Index {
        /// Repository root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Clear both stores first
        #[arg(long)]
        clear: bool,
    },

    /// Hybrid query: vector search, then graph lookups for the matched files
    Query {
        question: String,

        /// Minimum similarity score (0.0 to 1.0)
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Maximum number of semantic matches
        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Vector search only
    Search {
        question: String,

        #[arg(short, long)]
        threshold: Option<f32>,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Run a query and print timings and raw results
    Debug {
        question: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Include every semantic match and structural row
        #[arg(long)]
        raw: bool,
    },

    /// Remove stored data. With neither flag, clears both stores.
    Clear {
        #[arg(long)]
        vectors: bool,

        #[arg(long)]
        graph: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only rendered output
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let client = if cli.offline {
        GraphRagClient::offline(config).await?
    } else {
        GraphRagClient::with_config(config).await?
    };

    match cli.command {
        Commands::Index { path, clear } => {
            if clear {
                client.clear(true, true).await?;
            }
            let report = client.index_repository(&path).await?;
            for error in &report.errors {
                tracing::warn!("{}", error);
            }
            println!("{}", report);
        }
        Commands::Query {
            question,
            threshold,
            limit,
            format,
        } => {
            let request = QueryRequest::new(question)
                .with_threshold(threshold)
                .with_max_results(limit);
            let result = client.query(request).await?;
            match format {
                OutputFormat::Text => println!("{}", render_text(&result)),
                OutputFormat::Json => println!("{}", render_json(&result)?),
            }
        }
        Commands::Search {
            question,
            threshold,
            limit,
        } => {
            let request = QueryRequest::new(question)
                .with_threshold(threshold)
                .with_max_results(limit);
            let outcome = client.search(request).await?;
            if outcome.fallback_used {
                println!("(threshold lowered to {})", outcome.threshold_used);
            }
            for (i, m) in outcome.matches.iter().enumerate() {
                println!(
                    "{}. {}:{}-{} (score: {:.2})",
                    i + 1,
                    m.filepath,
                    m.start_line,
                    m.end_line,
                    m.score
                );
            }
        }
        Commands::Debug {
            question,
            format,
            raw,
        } => {
            let out = client
                .debug_query(QueryRequest::new(question), format, raw)
                .await?;
            println!("{}", out);
        }
        Commands::Clear { vectors, graph } => {
            let both = !vectors && !graph;
            let report = client.clear(vectors || both, graph || both).await?;
            println!(
                "vectors cleared: {}, graph cleared: {}",
                report.vectors_cleared, report.graph_cleared
            );
        }
    }

    Ok(())
}
