//! Core types produced by the symbol parser

use super::language::Language;
use serde::{Deserialize, Serialize};

/// Kind of a named code entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Interface,
    Enum,
    Struct,
    Trait,
    Constant,
    Variable,
    Property,
    Module,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Struct => "struct",
            Self::Trait => "trait",
            Self::Constant => "constant",
            Self::Variable => "variable",
            Self::Property => "property",
            Self::Module => "module",
        }
    }

    /// Graph node label for this kind
    pub fn label(&self) -> &'static str {
        match self {
            Self::Function => "Function",
            Self::Method => "Method",
            Self::Class => "Class",
            Self::Interface => "Interface",
            Self::Enum => "Enum",
            Self::Struct => "Struct",
            Self::Trait => "Trait",
            Self::Constant => "Constant",
            Self::Variable => "Variable",
            Self::Property => "Property",
            Self::Module => "Module",
        }
    }

    /// Kinds the semantic chunker cuts along
    pub fn is_block(&self) -> bool {
        matches!(self, Self::Function | Self::Method | Self::Class)
    }

    /// Kinds with a body whose end line is worth resolving
    pub fn has_body(&self) -> bool {
        !matches!(self, Self::Constant | Self::Variable | Self::Property)
    }

    /// Graph identity includes the start line for these kinds. The others are
    /// file-scoped and keyed by `(name, filepath)`.
    pub fn is_line_addressable(&self) -> bool {
        matches!(
            self,
            Self::Function
                | Self::Method
                | Self::Class
                | Self::Interface
                | Self::Enum
                | Self::Struct
                | Self::Trait
        )
    }

    /// Function-like kinds that can be the source of a call edge
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function | Self::Method)
    }

    pub const ALL: [SymbolKind; 11] = [
        Self::Function,
        Self::Method,
        Self::Class,
        Self::Interface,
        Self::Enum,
        Self::Struct,
        Self::Trait,
        Self::Constant,
        Self::Variable,
        Self::Property,
        Self::Module,
    ];
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared visibility, when the language expresses one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
    Protected,
    Internal,
}

impl Visibility {
    /// Infer visibility from modifier keywords on a declaration line
    pub fn from_keywords(line: &str) -> Option<Self> {
        let words: Vec<&str> = line
            .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '(' || c == ')'))
            .filter(|w| !w.is_empty())
            .collect();

        if words.iter().any(|w| w.starts_with("pub(")) {
            return Some(Self::Internal);
        }
        for word in words {
            match word {
                "private" => return Some(Self::Private),
                "protected" => return Some(Self::Protected),
                "internal" | "fileprivate" => return Some(Self::Internal),
                "public" | "pub" | "export" | "open" => return Some(Self::Public),
                _ => {}
            }
        }
        None
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Protected => "protected",
            Self::Internal => "internal",
        }
    }
}

/// A named code entity with its source location. Lines are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub start_line: usize,
    pub end_line: Option<usize>,
    pub column: usize,
    /// Dotted path of enclosing symbols
    pub scope: Option<String>,
    pub signature: Option<String>,
    pub visibility: Option<Visibility>,
    pub docstring: Option<String>,
    /// Declared base classes or super-traits, unresolved
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, start_line: usize, column: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            start_line,
            end_line: None,
            column,
            scope: None,
            signature: None,
            visibility: None,
            docstring: None,
            bases: Vec::new(),
        }
    }

    pub fn with_end_line(mut self, end_line: usize) -> Self {
        self.end_line = Some(end_line);
        self
    }

    pub fn with_scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope.filter(|s| !s.is_empty());
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_visibility(mut self, visibility: Option<Visibility>) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_docstring(mut self, docstring: Option<String>) -> Self {
        self.docstring = docstring.filter(|d| !d.is_empty());
        self
    }

    pub fn with_bases(mut self, bases: Vec<String>) -> Self {
        self.bases = bases;
        self
    }

    /// Whether `line` lies inside the declared span
    pub fn contains_line(&self, line: usize) -> bool {
        match self.end_line {
            Some(end) => self.start_line <= line && line <= end,
            None => self.start_line == line,
        }
    }

    /// Number of lines the symbol spans, if its end is known
    pub fn span_len(&self) -> Option<usize> {
        self.end_line
            .filter(|end| *end >= self.start_line)
            .map(|end| end - self.start_line + 1)
    }
}

/// A raw, unresolved dependency reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub target: String,
    pub line: usize,
}

impl Import {
    pub fn new(target: impl Into<String>, line: usize) -> Self {
        Self {
            target: target.into(),
            line,
        }
    }
}

/// Parser output for one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeFile {
    pub filepath: String,
    pub language: Language,
    pub symbols: Vec<Symbol>,
    pub imports: Vec<Import>,
}

impl CodeFile {
    pub fn empty(filepath: impl Into<String>, language: Language) -> Self {
        Self {
            filepath: filepath.into(),
            language,
            symbols: Vec::new(),
            imports: Vec::new(),
        }
    }

    pub fn symbols_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Symbol> {
        self.symbols.iter().filter(move |s| s.name == name)
    }
}
