//! # Project Graph RAG - hybrid vector and graph indexing for code
//!
//! Indexes a source repository into two stores at once: chunk embeddings in
//! a vector store, and files, symbols and their relationships in a property
//! graph. Queries search the vectors first, then read the graph only for the
//! files the matches came from.
//!
//! ## Pipeline
//!
//! ```text
//! index:  repository ─► parser ─┬─► chunker ─► embedding indexer ─► vector store
//!                               └─► graph builder ─► coordinator ─► graph store
//! query:  question ─► embed ─► vector search ─► relevant files ─► graph lookups
//! ```
//!
//! ## Modules
//!
//! - [`parser`]: per-language symbol and import extraction
//! - [`indexer`]: repository walking, semantic chunking, embedding persistence
//! - [`embedding`]: FastEmbed and a deterministic hash embedder
//! - [`vector_db`]: LanceDB and in-memory vector stores
//! - [`graph`]: typed Cypher statements, the per-file builder, graph stores
//! - [`concurrency`]: bounded fan-out for files, chunks and statement batches
//! - [`query`]: the hybrid query engine and its text, JSON and debug renderings
//! - [`client`]: [`GraphRagClient`], which wires everything to concrete stores
//! - [`config`]: TOML configuration with environment overrides
//! - [`error`]: error taxonomy
//!
//! ## Usage Example
//!
//! ```no_run
//! use project_graph_rag::{Config, GraphRagClient, QueryRequest, render_text};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = GraphRagClient::with_config(Config::new()?).await?;
//!     client.index_repository("/path/to/repo".as_ref()).await?;
//!
//!     let result = client.query(QueryRequest::new("database connection logic")).await?;
//!     println!("{}", render_text(&result));
//!     Ok(())
//! }
//! ```

/// Library client tying indexing and querying to concrete stores
pub mod client;

/// Bounded-concurrency execution of files, chunks and statement batches
pub mod concurrency;

/// Configuration management with environment variable overrides
pub mod config;

/// Embedding generation using FastEmbed, or offline hashing
pub mod embedding;

/// Error types and utilities
pub mod error;

/// Property graph statements, construction and stores
pub mod graph;

/// File walking, semantic chunking and embedding persistence
pub mod indexer;

/// Symbol and import extraction
pub mod parser;

/// Platform data and config directories
pub mod paths;

/// Hybrid query engine and result rendering
pub mod query;

/// Request and report types
pub mod types;

/// Vector store abstraction with LanceDB and in-memory backends
pub mod vector_db;

pub use client::GraphRagClient;
pub use config::Config;
pub use error::RagError;
pub use query::{OutputFormat, QueryResult, render_debug, render_json, render_text};
pub use types::{ClearReport, IndexReport, QueryRequest};
