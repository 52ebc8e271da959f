//! Typed graph mutations and lookups, rendered to Cypher on demand

use crate::parser::{Symbol, SymbolKind};
use serde::Serialize;
use std::fmt::Write;

/// Escape a value for a double-quoted Cypher string literal
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", escape(value))
}

/// Relationship types written by the builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EdgeKind {
    DefinedIn,
    Imports,
    InheritsFrom,
    Calls,
    References,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DefinedIn => "DEFINED_IN",
            Self::Imports => "IMPORTS",
            Self::InheritsFrom => "INHERITS_FROM",
            Self::Calls => "CALLS",
            Self::References => "REFERENCES",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a symbol node.
///
/// Block kinds are keyed by `(name, filepath, start_line)`; the rest are
/// file-scoped and keyed by `(name, filepath)`, with `line` left unset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolKey {
    pub kind: SymbolKind,
    pub name: String,
    pub filepath: String,
    pub line: Option<usize>,
}

impl SymbolKey {
    pub fn for_symbol(symbol: &Symbol, filepath: &str) -> Self {
        Self {
            kind: symbol.kind,
            name: symbol.name.clone(),
            filepath: filepath.to_string(),
            line: symbol
                .kind
                .is_line_addressable()
                .then_some(symbol.start_line),
        }
    }

    fn pattern(&self, var: &str) -> String {
        let mut out = format!(
            "({}:{} {{name: {}, filepath: {}",
            var,
            self.kind.label(),
            quoted(&self.name),
            quoted(&self.filepath)
        );
        if let Some(line) = self.line {
            let _ = write!(out, ", start_line: {}", line);
        }
        out.push_str("})");
        out
    }
}

/// Endpoint of an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum NodeRef {
    File(String),
    Symbol(SymbolKey),
}

impl NodeRef {
    fn pattern(&self, var: &str) -> String {
        match self {
            Self::File(filepath) => format!("({}:File {{filepath: {}}})", var, quoted(filepath)),
            Self::Symbol(key) => key.pattern(var),
        }
    }
}

/// Scalar properties written onto a symbol node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolNode {
    pub key: SymbolKey,
    /// Declaration line, stored as `line_number` for file-scoped kinds
    pub line: usize,
    pub end_line: Option<usize>,
    pub scope: Option<String>,
    pub signature: Option<String>,
    pub visibility: Option<String>,
    pub docstring: Option<String>,
}

impl SymbolNode {
    pub fn new(symbol: &Symbol, filepath: &str) -> Self {
        Self {
            key: SymbolKey::for_symbol(symbol, filepath),
            line: symbol.start_line,
            end_line: symbol.end_line,
            scope: symbol.scope.clone(),
            signature: symbol.signature.clone(),
            visibility: symbol.visibility.map(|v| v.as_str().to_string()),
            docstring: symbol.docstring.clone(),
        }
    }

    fn assignments(&self) -> Vec<String> {
        let mut sets = Vec::new();
        if self.key.line.is_none() {
            sets.push(format!("s.line_number = {}", self.line));
        }
        if let Some(end) = self.end_line {
            sets.push(format!("s.end_line = {}", end));
        }
        let optional = [
            ("scope", &self.scope),
            ("signature", &self.signature),
            ("visibility", &self.visibility),
            ("docstring", &self.docstring),
        ];
        for (property, value) in optional {
            if let Some(value) = value {
                sets.push(format!("s.{} = {}", property, quoted(value)));
            }
        }
        sets
    }
}

/// Uniqueness declaration on one label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constraint {
    pub name: String,
    pub label: String,
    pub properties: Vec<String>,
}

/// The three structural lookups of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    Symbols,
    Imports,
    References,
}

impl LookupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Symbols => "symbols",
            Self::Imports => "imports",
            Self::References => "references",
        }
    }

    /// Column order of the RETURN clause
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::Symbols => &["name", "type", "filepath", "start_line", "end_line"],
            Self::Imports => &["source_file", "imported_file"],
            Self::References => &[
                "symbol_name",
                "symbol_type",
                "defined_in",
                "referenced_by",
                "referenced_in",
            ],
        }
    }
}

/// A read restricted to a set of files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lookup {
    pub kind: LookupKind,
    pub files: Vec<String>,
    pub limit: usize,
}

impl Lookup {
    pub fn new(kind: LookupKind, files: &[String], limit: usize) -> Self {
        Self {
            kind,
            files: files.to_vec(),
            limit,
        }
    }

    fn file_list(&self) -> String {
        self.files
            .iter()
            .map(|f| quoted(f))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn to_cypher(&self) -> String {
        let files = self.file_list();
        match self.kind {
            LookupKind::Symbols => format!(
                "MATCH (s)-[:DEFINED_IN]->(f:File) WHERE f.filepath IN [{}] \
                 RETURN s.name AS name, labels(s)[0] AS type, f.filepath AS filepath, \
                 coalesce(s.start_line, s.line_number) AS start_line, s.end_line AS end_line \
                 LIMIT {};",
                files, self.limit
            ),
            LookupKind::Imports => format!(
                "MATCH (f:File)-[:IMPORTS]->(imported:File) \
                 WHERE f.filepath IN [{0}] OR imported.filepath IN [{0}] \
                 RETURN f.filepath AS source_file, imported.filepath AS imported_file \
                 LIMIT {1};",
                files, self.limit
            ),
            LookupKind::References => format!(
                "MATCH (ref)-[:CALLS|REFERENCES]->(s)-[:DEFINED_IN]->(f:File) \
                 WHERE f.filepath IN [{}] \
                 MATCH (ref)-[:DEFINED_IN]->(refFile:File) \
                 RETURN s.name AS symbol_name, labels(s)[0] AS symbol_type, f.filepath AS defined_in, \
                 ref.name AS referenced_by, refFile.filepath AS referenced_in \
                 LIMIT {};",
                files, self.limit
            ),
        }
    }
}

/// One unit of work for a graph store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Statement {
    Constraint(Constraint),
    MergeFile { filepath: String, language: String },
    MergeSymbol(SymbolNode),
    /// Both file nodes are merged along with the edge
    MergeImport { from: String, to: String },
    /// Endpoints are matched, never created
    MergeEdge {
        kind: EdgeKind,
        from: NodeRef,
        to: NodeRef,
    },
    Lookup(Lookup),
    DetachDeleteAll,
}

impl Statement {
    pub fn merge_file(filepath: impl Into<String>, language: &str) -> Self {
        Self::MergeFile {
            filepath: filepath.into(),
            language: language.to_string(),
        }
    }

    pub fn edge(kind: EdgeKind, from: NodeRef, to: NodeRef) -> Self {
        Self::MergeEdge { kind, from, to }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Lookup(_))
    }

    pub fn to_cypher(&self) -> String {
        match self {
            Self::Constraint(c) => {
                let properties: Vec<String> =
                    c.properties.iter().map(|p| format!("n.{}", p)).collect();
                let target = if properties.len() == 1 {
                    properties[0].clone()
                } else {
                    format!("({})", properties.join(", "))
                };
                format!(
                    "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n:{}) REQUIRE {} IS UNIQUE;",
                    c.name, c.label, target
                )
            }
            Self::MergeFile { filepath, language } => format!(
                "MERGE (f:File {{filepath: {0}}}) ON CREATE SET f.language = {1}, f.path = {0} \
                 ON MATCH SET f.language = {1};",
                quoted(filepath),
                quoted(language)
            ),
            Self::MergeSymbol(node) => {
                let sets = node.assignments();
                if sets.is_empty() {
                    format!("MERGE {};", node.key.pattern("s"))
                } else {
                    format!("MERGE {} SET {};", node.key.pattern("s"), sets.join(", "))
                }
            }
            Self::MergeImport { from, to } => format!(
                "MERGE {} MERGE {} MERGE (from)-[:IMPORTS]->(to);",
                NodeRef::File(from.clone()).pattern("from"),
                NodeRef::File(to.clone()).pattern("to")
            ),
            Self::MergeEdge { kind, from, to } => format!(
                "MATCH {} MATCH {} MERGE (a)-[:{}]->(b);",
                from.pattern("a"),
                to.pattern("b"),
                kind
            ),
            Self::Lookup(lookup) => lookup.to_cypher(),
            Self::DetachDeleteAll => "MATCH (n) DETACH DELETE n;".to_string(),
        }
    }
}

/// Render a batch as one script, one statement per line
pub fn render_batch(statements: &[Statement]) -> String {
    statements
        .iter()
        .map(Statement::to_cypher)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Uniqueness constraints issued once per indexing run
pub fn constraint_statements() -> Vec<Statement> {
    let mut statements = vec![Statement::Constraint(Constraint {
        name: "file_filepath_unique".to_string(),
        label: "File".to_string(),
        properties: vec!["filepath".to_string()],
    })];

    for kind in SymbolKind::ALL {
        let label = kind.label();
        let (suffix, properties) = if kind.is_line_addressable() {
            ("name_path_line", vec!["name", "filepath", "start_line"])
        } else {
            ("name_path", vec!["name", "filepath"])
        };
        statements.push(Statement::Constraint(Constraint {
            name: format!("{}_{}", kind.as_str(), suffix),
            label: label.to_string(),
            properties: properties.into_iter().map(String::from).collect(),
        }));
    }
    statements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Visibility;

    #[test]
    fn test_escape_quotes_and_backslashes() {
        assert_eq!(escape(r#"a "b" 'c' \d"#), r#"a \"b\" \'c\' \\d"#);
        assert_eq!(escape("one\ntwo"), "one\\ntwo");
    }

    #[test]
    fn test_merge_file() {
        let cypher = Statement::merge_file("src/a.py", "python").to_cypher();
        assert_eq!(
            cypher,
            r#"MERGE (f:File {filepath: "src/a.py"}) ON CREATE SET f.language = "python", f.path = "src/a.py" ON MATCH SET f.language = "python";"#
        );
    }

    #[test]
    fn test_merge_block_symbol_keys_on_start_line() {
        let symbol = Symbol::new("handle", SymbolKind::Method, 11, 4)
            .with_end_line(12)
            .with_scope(Some("Service".to_string()))
            .with_visibility(Some(Visibility::Public));
        let cypher = Statement::MergeSymbol(SymbolNode::new(&symbol, "app.py")).to_cypher();
        assert_eq!(
            cypher,
            r#"MERGE (s:Method {name: "handle", filepath: "app.py", start_line: 11}) SET s.end_line = 12, s.scope = "Service", s.visibility = "public";"#
        );
    }

    #[test]
    fn test_merge_file_scoped_symbol_keys_without_line() {
        let symbol = Symbol::new("MAX", SymbolKind::Constant, 5, 0).with_end_line(5);
        let cypher = Statement::MergeSymbol(SymbolNode::new(&symbol, "app.py")).to_cypher();
        assert_eq!(
            cypher,
            r#"MERGE (s:Constant {name: "MAX", filepath: "app.py"}) SET s.line_number = 5, s.end_line = 5;"#
        );
    }

    #[test]
    fn test_import_merges_both_files() {
        let cypher = Statement::MergeImport {
            from: "a.js".to_string(),
            to: "b.js".to_string(),
        }
        .to_cypher();
        assert_eq!(
            cypher,
            r#"MERGE (from:File {filepath: "a.js"}) MERGE (to:File {filepath: "b.js"}) MERGE (from)-[:IMPORTS]->(to);"#
        );
    }

    #[test]
    fn test_edge_matches_endpoints() {
        let symbol = Symbol::new("main", SymbolKind::Function, 3, 0);
        let cypher = Statement::edge(
            EdgeKind::DefinedIn,
            NodeRef::Symbol(SymbolKey::for_symbol(&symbol, "m.py")),
            NodeRef::File("m.py".to_string()),
        )
        .to_cypher();
        assert_eq!(
            cypher,
            r#"MATCH (a:Function {name: "main", filepath: "m.py", start_line: 3}) MATCH (b:File {filepath: "m.py"}) MERGE (a)-[:DEFINED_IN]->(b);"#
        );
    }

    #[test]
    fn test_constraints_cover_every_label() {
        let statements = constraint_statements();
        assert_eq!(statements.len(), 1 + SymbolKind::ALL.len());
        let rendered: Vec<String> = statements.iter().map(Statement::to_cypher).collect();
        assert_eq!(
            rendered[0],
            "CREATE CONSTRAINT file_filepath_unique IF NOT EXISTS FOR (n:File) REQUIRE n.filepath IS UNIQUE;"
        );
        assert!(rendered.contains(
            &"CREATE CONSTRAINT function_name_path_line IF NOT EXISTS FOR (n:Function) REQUIRE (n.name, n.filepath, n.start_line) IS UNIQUE;"
                .to_string()
        ));
        assert!(rendered.contains(
            &"CREATE CONSTRAINT variable_name_path IF NOT EXISTS FOR (n:Variable) REQUIRE (n.name, n.filepath) IS UNIQUE;"
                .to_string()
        ));
    }

    #[test]
    fn test_lookup_is_scoped_to_files() {
        let files = vec!["a.py".to_string(), "b/c.py".to_string()];
        let cypher = Statement::Lookup(Lookup::new(LookupKind::Symbols, &files, 20)).to_cypher();
        assert!(cypher.contains(r#"WHERE f.filepath IN ["a.py", "b/c.py"]"#));
        assert!(cypher.ends_with("LIMIT 20;"));
        assert!(!Statement::Lookup(Lookup::new(LookupKind::Imports, &files, 20)).is_mutation());
    }

    #[test]
    fn test_render_batch_one_per_line() {
        let batch = vec![
            Statement::merge_file("a.py", "python"),
            Statement::DetachDeleteAll,
        ];
        let script = render_batch(&batch);
        assert_eq!(script.lines().count(), 2);
        assert!(script.ends_with("MATCH (n) DETACH DELETE n;"));
    }
}
