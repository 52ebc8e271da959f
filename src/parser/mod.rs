//! Symbol and import extraction
//!
//! [`parse`] maps a file's extension to a [`Language`] and hands the text to
//! that language's [`LanguageParser`]. Python goes through tree-sitter, Ruby
//! through an `end`-keyword scanner, and every other language through a
//! table of declaration regexes driven by brace depth. Extraction is
//! best-effort: a strategy that fails yields an empty symbol set, and the
//! chunker then falls back to fixed-size windows.

mod language;
mod languages;
mod python;
mod ruby;
mod rules;
mod scan;
mod spans;
mod types;

pub use language::Language;
pub use types::{CodeFile, Import, Symbol, SymbolKind, Visibility};

use crate::error::ParseError;
use rules::RuleParser;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Extraction strategy for one language
pub trait LanguageParser: Send + Sync {
    fn language(&self) -> Language;

    /// Declared symbols, in source order. End lines may be left unset for
    /// block kinds and are resolved afterwards.
    fn symbols(&self, content: &str) -> Result<Vec<Symbol>, ParseError>;

    /// Raw import targets, unresolved
    fn imports(&self, content: &str) -> Vec<Import>;
}

struct Registry {
    parsers: HashMap<Language, Box<dyn LanguageParser>>,
    generic: Option<Box<dyn LanguageParser>>,
}

impl Registry {
    fn build() -> Self {
        let mut parsers: HashMap<Language, Box<dyn LanguageParser>> = HashMap::new();

        let mut register = |language: Language, parser: Result<Box<dyn LanguageParser>, ParseError>| {
            match parser {
                Ok(parser) => {
                    parsers.insert(language, parser);
                }
                Err(e) => tracing::warn!("No {} parser available: {}", language, e),
            }
        };

        fn rules(set: Result<rules::RuleSet, ParseError>) -> Result<Box<dyn LanguageParser>, ParseError> {
            Ok(Box::new(RuleParser::new(set?)?))
        }

        register(
            Language::Python,
            python::PythonParser::new().map(|p| Box::new(p) as Box<dyn LanguageParser>),
        );
        register(
            Language::Ruby,
            ruby::RubyParser::new().map(|p| Box::new(p) as Box<dyn LanguageParser>),
        );
        register(
            Language::JavaScript,
            rules(languages::javascript(Language::JavaScript)),
        );
        register(
            Language::TypeScript,
            rules(languages::javascript(Language::TypeScript)),
        );
        register(Language::Java, rules(languages::java()));
        register(Language::C, rules(languages::c_family(Language::C)));
        register(Language::Cpp, rules(languages::c_family(Language::Cpp)));
        register(Language::Go, rules(languages::go()));
        register(Language::Rust, rules(languages::rust()));
        register(Language::Php, rules(languages::php()));
        register(Language::Swift, rules(languages::swift()));
        register(Language::Kotlin, rules(languages::kotlin()));
        register(Language::CSharp, rules(languages::csharp()));

        let generic = match rules(languages::generic()) {
            Ok(parser) => Some(parser),
            Err(e) => {
                tracing::warn!("No generic parser available: {}", e);
                None
            }
        };

        Self { parsers, generic }
    }

    fn get(&self, language: Language) -> Option<&dyn LanguageParser> {
        self.parsers
            .get(&language)
            .or(self.generic.as_ref())
            .map(|p| p.as_ref())
    }
}

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::build);

/// Parse one file. Never fails: malformed input yields zero symbols.
pub fn parse(content: &str, filepath: &str) -> CodeFile {
    let language = Language::from_path(filepath);
    let mut file = CodeFile::empty(filepath, language);

    if content.trim().is_empty() {
        return file;
    }
    let Some(parser) = REGISTRY.get(language) else {
        return file;
    };

    file.imports = parser.imports(content);

    let mut symbols = match parser.symbols(content) {
        Ok(symbols) => symbols,
        Err(e) => {
            tracing::debug!("Parsing {} produced no symbols: {}", filepath, e);
            return file;
        }
    };

    spans::resolve_end_lines(language, filepath, content, &mut symbols);

    let mut seen = HashSet::new();
    symbols.retain(|s| seen.insert((s.name.clone(), s.kind, s.start_line)));
    symbols.sort_by_key(|s| (s.start_line, s.column));

    file.symbols = symbols;
    file
}

#[cfg(test)]
mod tests;
