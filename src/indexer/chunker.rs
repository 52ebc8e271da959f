use super::Chunk;
use crate::config::IndexingConfig;
use crate::error::ChunkingError;
use crate::parser::{CodeFile, Symbol};

/// Line limits for semantic chunking
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Block symbols longer than this are split into sub-chunks
    pub max_semantic_chunk_lines: usize,
    /// Window size for sub-chunks and for whole-file fallback
    pub fallback_chunk_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_semantic_chunk_lines: 200,
            fallback_chunk_size: 50,
        }
    }
}

impl From<&IndexingConfig> for ChunkerConfig {
    fn from(config: &IndexingConfig) -> Self {
        Self {
            max_semantic_chunk_lines: config.max_semantic_chunk_lines,
            fallback_chunk_size: config.fallback_chunk_size,
        }
    }
}

/// Splits parsed files into chunks along symbol boundaries
pub struct SemanticChunker {
    config: ChunkerConfig,
}

impl SemanticChunker {
    pub fn new(config: ChunkerConfig) -> Result<Self, ChunkingError> {
        if config.fallback_chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize(
                "fallback_chunk_size must be greater than 0".to_string(),
            ));
        }
        if config.max_semantic_chunk_lines == 0 {
            return Err(ChunkingError::InvalidChunkSize(
                "max_semantic_chunk_lines must be greater than 0".to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkerConfig {
        self.config
    }

    /// Chunk one file. Block symbols (functions, methods, classes) become
    /// one chunk each, or several when longer than the semantic limit. A
    /// file that yields no semantic chunk is cut into fixed windows.
    pub fn chunk(&self, file: &CodeFile, lines: &[&str]) -> Vec<Chunk> {
        if lines.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        for symbol in file.symbols.iter().filter(|s| s.kind.is_block()) {
            let end_line = match validate(symbol, &file.filepath, lines.len()) {
                Ok(end_line) => end_line,
                Err(e) => {
                    tracing::debug!("Skipping symbol: {}", e);
                    continue;
                }
            };

            let span = &lines[symbol.start_line - 1..end_line];
            if span.len() > self.config.max_semantic_chunk_lines {
                tracing::debug!(
                    "Sub-chunking {} {} in {} ({} lines)",
                    symbol.kind,
                    symbol.name,
                    file.filepath,
                    span.len()
                );
                chunks.extend(self.sub_chunks(file, symbol, span));
                continue;
            }

            let content = span.join("\n");
            if content.trim().is_empty() {
                continue;
            }

            let mut attached = symbols_in_range(&file.symbols, symbol.start_line, end_line);
            if !attached.iter().any(|s| s == symbol) {
                attached.push(symbol.clone());
            }

            let context = symbol
                .docstring
                .clone()
                .unwrap_or_else(|| format!("{} {}", symbol.kind, symbol.name));

            chunks.push(Chunk {
                content,
                filepath: file.filepath.clone(),
                start_line: symbol.start_line,
                end_line,
                language: file.language,
                symbols: attached,
                context,
            });
        }

        if chunks.is_empty() {
            return self.fallback_chunks(file, lines);
        }
        chunks
    }

    fn sub_chunks(&self, file: &CodeFile, symbol: &Symbol, span: &[&str]) -> Vec<Chunk> {
        let size = self.config.fallback_chunk_size;
        span.chunks(size)
            .enumerate()
            .filter_map(|(idx, piece)| {
                let content = piece.join("\n");
                if content.trim().is_empty() {
                    return None;
                }
                let start_line = symbol.start_line + idx * size;
                let end_line = start_line + piece.len() - 1;
                Some(Chunk {
                    content,
                    filepath: file.filepath.clone(),
                    start_line,
                    end_line,
                    language: file.language,
                    symbols: symbols_in_range(&file.symbols, start_line, end_line),
                    context: format!(
                        "Part of {} {} (lines {}-{})",
                        symbol.kind, symbol.name, start_line, end_line
                    ),
                })
            })
            .collect()
    }

    /// Fixed windows `[1..n], [n+1..2n], ...` over the whole file
    fn fallback_chunks(&self, file: &CodeFile, lines: &[&str]) -> Vec<Chunk> {
        let size = self.config.fallback_chunk_size;
        tracing::debug!("Creating fallback chunks for {}", file.filepath);

        lines
            .chunks(size)
            .enumerate()
            .filter_map(|(idx, window)| {
                let content = window.join("\n");
                if content.trim().is_empty() {
                    return None;
                }
                let start_line = idx * size + 1;
                let end_line = start_line + window.len() - 1;
                Some(Chunk {
                    content,
                    filepath: file.filepath.clone(),
                    start_line,
                    end_line,
                    language: file.language,
                    symbols: symbols_in_range(&file.symbols, start_line, end_line),
                    context: format!(
                        "Lines {}-{} from file {}",
                        start_line, end_line, file.filepath
                    ),
                })
            })
            .collect()
    }
}

/// End line of a block symbol that can be sliced from a file of `total` lines
fn validate(symbol: &Symbol, filepath: &str, total: usize) -> Result<usize, ChunkingError> {
    let end_line = symbol.end_line.ok_or_else(|| ChunkingError::MissingEndLine {
        filepath: filepath.to_string(),
        symbol: symbol.name.clone(),
    })?;
    if symbol.start_line < 1 || end_line < symbol.start_line || end_line > total {
        return Err(ChunkingError::SymbolOutOfBounds {
            filepath: filepath.to_string(),
            symbol: symbol.name.clone(),
            start_line: symbol.start_line,
            end_line,
            total_lines: total,
        });
    }
    Ok(end_line)
}

fn symbols_in_range(symbols: &[Symbol], start: usize, end: usize) -> Vec<Symbol> {
    symbols
        .iter()
        .filter(|s| (start..=end).contains(&s.start_line))
        .cloned()
        .collect()
}
