//! Per-file graph construction
//!
//! Building is pure: a [`GraphBuilder`] turns one parsed file into a
//! [`FileGraph`] of statements without touching any store. Workers build
//! files independently and the caller merges the results afterwards.

use super::resolve::ImportResolver;
use super::statement::{EdgeKind, NodeRef, Statement, SymbolKey, SymbolNode};
use crate::parser::{CodeFile, Symbol, SymbolKind};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// A symbol-to-symbol edge found inside one file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SymbolRef {
    pub kind: EdgeKind,
    pub from: SymbolKey,
    pub to: SymbolKey,
}

/// A call from a local function to a name this file does not define
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ExternalCall {
    pub caller: SymbolKey,
    pub name: String,
}

/// Everything one file contributes to the graph
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileGraph {
    pub filepath: String,
    pub node_statements: Vec<Statement>,
    pub edge_statements: Vec<Statement>,
    /// Resolved `(importer, imported)` file pairs
    pub import_pairs: Vec<(String, String)>,
    pub symbol_refs: Vec<SymbolRef>,
    pub external_calls: Vec<ExternalCall>,
    /// Keys of the callable and class-like symbols defined here
    pub definitions: Vec<SymbolKey>,
}

impl FileGraph {
    pub fn empty(filepath: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            ..Self::default()
        }
    }

    pub fn statement_count(&self) -> usize {
        self.node_statements.len() + self.edge_statements.len()
    }
}

const KEYWORDS: [&str; 16] = [
    "if", "for", "while", "switch", "match", "return", "catch", "elif", "and", "or", "not",
    "def", "fn", "func", "function", "new",
];

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_class_like(kind: SymbolKind) -> bool {
    matches!(
        kind,
        SymbolKind::Class | SymbolKind::Interface | SymbolKind::Trait | SymbolKind::Struct
    )
}

/// Byte offsets where `name` occurs as a whole word
fn word_matches<'a>(line: &'a str, name: &'a str) -> impl Iterator<Item = usize> + 'a {
    line.match_indices(name).filter_map(move |(i, _)| {
        let before = line[..i].chars().next_back();
        let after = line[i + name.len()..].chars().next();
        let bounded = !before.is_some_and(is_ident) && !after.is_some_and(is_ident);
        bounded.then_some(i)
    })
}

/// Identifiers directly followed by `(`
fn call_names(line: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in line.char_indices() {
        if is_ident(c) {
            if start.is_none() {
                start = Some(i);
            }
            continue;
        }
        if let Some(s) = start.take()
            && c == '('
        {
            let name = &line[s..i];
            if !name.starts_with(|c: char| c.is_ascii_digit()) {
                names.push(name);
            }
        }
    }
    names
}

/// Innermost function or method containing `line`, else the innermost
/// class-like symbol
fn container(symbols: &[Symbol], line: usize) -> Option<&Symbol> {
    innermost(symbols, line, |k| k.is_callable())
        .or_else(|| innermost(symbols, line, is_class_like))
}

fn innermost(symbols: &[Symbol], line: usize, accept: impl Fn(SymbolKind) -> bool) -> Option<&Symbol> {
    symbols
        .iter()
        .filter(|s| accept(s.kind) && s.end_line.is_some() && s.contains_line(line))
        .min_by_key(|s| s.span_len().unwrap_or(usize::MAX))
}

/// Builds [`FileGraph`]s for one indexing run
pub struct GraphBuilder<'a> {
    resolver: ImportResolver<'a>,
    excluded_extensions: &'a [String],
}

impl<'a> GraphBuilder<'a> {
    /// `known_files` is the full set of files in the run, used to resolve
    /// imports
    pub fn new(known_files: &'a HashSet<String>, excluded_extensions: &'a [String]) -> Self {
        Self {
            resolver: ImportResolver::new(known_files),
            excluded_extensions,
        }
    }

    /// Files of these extensions contribute no statements
    pub fn is_excluded(&self, filepath: &str) -> bool {
        let Some(ext) = std::path::Path::new(filepath)
            .extension()
            .and_then(|e| e.to_str())
        else {
            return false;
        };
        self.excluded_extensions
            .iter()
            .any(|x| x.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    pub fn build(&self, file: &CodeFile, content: &str) -> FileGraph {
        let filepath = file.filepath.as_str();
        if self.is_excluded(filepath) {
            tracing::debug!("Skipping graph build for excluded file {}", filepath);
            return FileGraph::empty(filepath);
        }

        let mut graph = FileGraph::empty(filepath);
        let file_node = NodeRef::File(filepath.to_string());

        graph
            .node_statements
            .push(Statement::merge_file(filepath, file.language.as_str()));

        for symbol in &file.symbols {
            let node = SymbolNode::new(symbol, filepath);
            let key = node.key.clone();
            graph.node_statements.push(Statement::MergeSymbol(node));
            graph.edge_statements.push(Statement::edge(
                EdgeKind::DefinedIn,
                NodeRef::Symbol(key.clone()),
                file_node.clone(),
            ));
            if symbol.kind.is_callable() || is_class_like(symbol.kind) {
                graph.definitions.push(key);
            }
        }

        let mut seen_imports = HashSet::new();
        for import in &file.imports {
            let Some(target) = self.resolver.resolve(filepath, &import.target) else {
                continue;
            };
            if target == filepath || !seen_imports.insert(target.clone()) {
                continue;
            }
            graph.edge_statements.push(Statement::MergeImport {
                from: filepath.to_string(),
                to: target.clone(),
            });
            graph.import_pairs.push((filepath.to_string(), target));
        }

        for (from, to) in inheritance(file) {
            graph.edge_statements.push(Statement::edge(
                EdgeKind::InheritsFrom,
                NodeRef::Symbol(from),
                NodeRef::Symbol(to),
            ));
        }

        let (refs, external) = references(file, content);
        for r in &refs {
            graph.edge_statements.push(Statement::edge(
                r.kind,
                NodeRef::Symbol(r.from.clone()),
                NodeRef::Symbol(r.to.clone()),
            ));
        }
        graph.symbol_refs = refs;
        graph.external_calls = external;

        tracing::debug!(
            "Built graph for {}: {} node(s), {} edge(s), {} import(s)",
            filepath,
            graph.node_statements.len(),
            graph.edge_statements.len(),
            graph.import_pairs.len()
        );
        graph
    }
}

/// INHERITS_FROM pairs whose base is declared in the same file
fn inheritance(file: &CodeFile) -> Vec<(SymbolKey, SymbolKey)> {
    let mut pairs = Vec::new();
    for symbol in file.symbols.iter().filter(|s| !s.bases.is_empty()) {
        for base in &symbol.bases {
            let short = base
                .rsplit(['.', ':'])
                .next()
                .unwrap_or(base.as_str());
            let target = file
                .symbols
                .iter()
                .find(|s| s.name == short && is_class_like(s.kind) && *s != symbol);
            if let Some(target) = target {
                pairs.push((
                    SymbolKey::for_symbol(symbol, &file.filepath),
                    SymbolKey::for_symbol(target, &file.filepath),
                ));
            }
        }
    }
    pairs
}

/// CALLS and REFERENCES between symbols of one file, plus calls to names
/// the file does not define. A line that mentions `name(` calls it; any
/// other whole-word mention references it. Definition lines are skipped.
fn references(file: &CodeFile, content: &str) -> (Vec<SymbolRef>, Vec<ExternalCall>) {
    let filepath = file.filepath.as_str();
    let mut targets: BTreeMap<&str, &Symbol> = BTreeMap::new();
    for symbol in &file.symbols {
        targets.entry(symbol.name.as_str()).or_insert(symbol);
    }

    let mut refs = BTreeSet::new();
    let mut external = BTreeSet::new();

    for (idx, line) in content.lines().enumerate() {
        let number = idx + 1;
        let Some(holder) = container(&file.symbols, number) else {
            continue;
        };
        let holder_key = SymbolKey::for_symbol(holder, filepath);

        for (name, target) in &targets {
            if target.start_line == number {
                continue;
            }
            let mut mentions = word_matches(line, name).peekable();
            if mentions.peek().is_none() {
                continue;
            }
            let calls = mentions.any(|i| line[i + name.len()..].starts_with('('));
            let kind = if calls {
                EdgeKind::Calls
            } else {
                EdgeKind::References
            };
            if kind == EdgeKind::References && *target == holder {
                continue;
            }
            refs.insert(SymbolRef {
                kind,
                from: holder_key.clone(),
                to: SymbolKey::for_symbol(target, filepath),
            });
        }

        if holder.kind.is_callable() && holder.start_line != number {
            for name in call_names(line) {
                if targets.contains_key(name) || KEYWORDS.contains(&name) {
                    continue;
                }
                external.insert(ExternalCall {
                    caller: holder_key.clone(),
                    name: name.to_string(),
                });
            }
        }
    }

    (refs.into_iter().collect(), external.into_iter().collect())
}

/// CALLS edges from a file's external calls to matching definitions in the
/// files it imports. Run once every file's graph is built.
pub fn link_across_files(graphs: &[FileGraph]) -> Vec<Statement> {
    let definitions: HashMap<&str, HashMap<&str, &SymbolKey>> = graphs
        .iter()
        .map(|g| {
            let mut by_name = HashMap::new();
            for key in &g.definitions {
                by_name.entry(key.name.as_str()).or_insert(key);
            }
            (g.filepath.as_str(), by_name)
        })
        .collect();

    let mut edges = BTreeSet::new();
    for graph in graphs {
        for (_, imported) in &graph.import_pairs {
            let Some(defined) = definitions.get(imported.as_str()) else {
                continue;
            };
            for call in &graph.external_calls {
                if let Some(target) = defined.get(call.name.as_str()) {
                    edges.insert((call.caller.clone(), (*target).clone()));
                }
            }
        }
    }

    edges
        .into_iter()
        .map(|(from, to)| Statement::edge(EdgeKind::Calls, NodeRef::Symbol(from), NodeRef::Symbol(to)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphStore, InMemoryGraphStore, constraint_statements};
    use crate::parser;

    const SERVICE: &str = r#"from .models import User

class Base:
    pass

class Service(Base):
    def handle(self, request):
        return helper(User(request))

def helper(value):
    return value + MAX

MAX = 10
"#;

    const MODELS: &str = "class User:\n    def __init__(self, raw):\n        self.raw = raw\n";

    fn known() -> HashSet<String> {
        ["app/service.py", "app/models.py"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn excluded() -> Vec<String> {
        vec!["json".to_string(), "md".to_string()]
    }

    fn key_of<'a>(graph: &'a FileGraph, name: &str) -> &'a SymbolKey {
        graph.definitions.iter().find(|k| k.name == name).unwrap()
    }

    #[test]
    fn test_nodes_and_defined_in_edges() {
        let files = known();
        let exclusions = excluded();
        let builder = GraphBuilder::new(&files, &exclusions);
        let file = parser::parse(SERVICE, "app/service.py");
        let graph = builder.build(&file, SERVICE);

        assert_eq!(graph.node_statements.len(), 1 + file.symbols.len());
        let defined_in = graph
            .edge_statements
            .iter()
            .filter(|s| matches!(s, Statement::MergeEdge { kind: EdgeKind::DefinedIn, .. }))
            .count();
        assert_eq!(defined_in, file.symbols.len());
    }

    #[test]
    fn test_imports_resolve_to_known_files() {
        let files = known();
        let exclusions = excluded();
        let builder = GraphBuilder::new(&files, &exclusions);
        let graph = builder.build(&parser::parse(SERVICE, "app/service.py"), SERVICE);
        assert_eq!(
            graph.import_pairs,
            vec![("app/service.py".to_string(), "app/models.py".to_string())]
        );
    }

    #[test]
    fn test_calls_references_and_inheritance() {
        let files = known();
        let exclusions = excluded();
        let builder = GraphBuilder::new(&files, &exclusions);
        let graph = builder.build(&parser::parse(SERVICE, "app/service.py"), SERVICE);

        let summary: Vec<(EdgeKind, &str, &str)> = graph
            .symbol_refs
            .iter()
            .map(|r| (r.kind, r.from.name.as_str(), r.to.name.as_str()))
            .collect();
        assert!(summary.contains(&(EdgeKind::Calls, "handle", "helper")));
        assert!(summary.contains(&(EdgeKind::References, "helper", "MAX")));
        assert!(summary.contains(&(EdgeKind::References, "Service", "Base")));
        assert!(!summary.iter().any(|(_, from, to)| from == to));

        let inherits = graph
            .edge_statements
            .iter()
            .filter(|s| matches!(s, Statement::MergeEdge { kind: EdgeKind::InheritsFrom, .. }))
            .count();
        assert_eq!(inherits, 1);

        let external: Vec<&str> = graph.external_calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(external, vec!["User"]);
    }

    #[test]
    fn test_excluded_extensions_build_nothing() {
        let files = known();
        let exclusions = excluded();
        let builder = GraphBuilder::new(&files, &exclusions);
        let file = parser::parse("{\"a\": 1}", "package.json");
        let graph = builder.build(&file, "{\"a\": 1}");
        assert_eq!(graph.statement_count(), 0);
        assert!(builder.is_excluded("docs/README.MD"));
        assert!(!builder.is_excluded("Makefile"));
    }

    #[test]
    fn test_cross_file_calls_follow_imports() {
        let files = known();
        let exclusions = excluded();
        let builder = GraphBuilder::new(&files, &exclusions);
        let service = builder.build(&parser::parse(SERVICE, "app/service.py"), SERVICE);
        let models = builder.build(&parser::parse(MODELS, "app/models.py"), MODELS);

        let links = link_across_files(&[service.clone(), models.clone()]);
        assert_eq!(
            links,
            vec![Statement::edge(
                EdgeKind::Calls,
                NodeRef::Symbol(key_of(&service, "handle").clone()),
                NodeRef::Symbol(key_of(&models, "User").clone()),
            )]
        );
    }

    #[tokio::test]
    async fn test_running_twice_is_idempotent() {
        let files = known();
        let exclusions = excluded();
        let builder = GraphBuilder::new(&files, &exclusions);
        let graph = builder.build(&parser::parse(SERVICE, "app/service.py"), SERVICE);

        let store = InMemoryGraphStore::new();
        store.execute(&constraint_statements()).await.unwrap();
        for _ in 0..2 {
            store.execute(&graph.node_statements).await.unwrap();
            store.execute(&graph.edge_statements).await.unwrap();
        }
        let twice = store.stats();

        let fresh = InMemoryGraphStore::new();
        fresh.execute(&graph.node_statements).await.unwrap();
        fresh.execute(&graph.edge_statements).await.unwrap();
        let once = fresh.stats();

        assert_eq!(twice.nodes(), once.nodes());
        assert_eq!(twice.edges, once.edges);
        assert_eq!(once.files, 2);
    }

    #[test]
    fn test_word_matching() {
        assert_eq!(word_matches("run(runner)", "run").count(), 1);
        assert_eq!(call_names("x = foo(bar(1)) + 2(3)"), vec!["foo", "bar"]);
    }
}
