//! Repository walking, semantic chunking and embedding persistence
//!
//! Files come from a [`RepositorySource`], are cut into [`Chunk`]s along
//! symbol boundaries and written to a vector store by the
//! [`EmbeddingIndexer`].

mod chunker;
mod embedding_indexer;
mod file_walker;

pub use chunker::{ChunkerConfig, SemanticChunker};
pub use embedding_indexer::{EmbeddingIndexer, IndexOutcome, chunk_id};
pub use file_walker::{ExclusionPolicy, LocalRepository, RepositorySource};

use crate::parser::{Language, Symbol};

/// A contiguous line range of one file, ready for embedding
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub content: String,
    pub filepath: String,
    /// 1-based, inclusive
    pub start_line: usize,
    /// 1-based, inclusive
    pub end_line: usize,
    pub language: Language,
    /// Symbols that start inside the range
    pub symbols: Vec<Symbol>,
    /// One-line description prepended to the content when embedding
    pub context: String,
}

impl Chunk {
    /// Text handed to the embedding model
    pub fn embedding_text(&self) -> String {
        if self.context.is_empty() {
            self.content.clone()
        } else {
            format!("{}\n{}", self.context, self.content)
        }
    }

    pub fn line_count(&self) -> usize {
        (self.end_line + 1).saturating_sub(self.start_line)
    }
}
