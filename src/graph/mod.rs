//! Property graph of files, symbols and their relationships
//!
//! Statements are typed values rendered to Cypher only at the store edge.
//! The builder produces them per file, the [`Coordinator`](crate::concurrency::Coordinator)
//! executes them in batches, and lookups read them back through
//! [`parse_rows`].

mod builder;
mod cypher_shell;
mod memory;
mod resolve;
mod result_parser;
mod statement;
mod store;

pub use builder::{ExternalCall, FileGraph, GraphBuilder, SymbolRef, link_across_files};
pub use cypher_shell::CypherShellStore;
pub use memory::{GraphStats, InMemoryGraphStore};
pub use resolve::ImportResolver;
pub use result_parser::{Row, Value, parse_rows};
pub use statement::{
    Constraint, EdgeKind, Lookup, LookupKind, NodeRef, Statement, SymbolKey, SymbolNode,
    constraint_statements, escape, render_batch,
};
pub use store::GraphStore;
