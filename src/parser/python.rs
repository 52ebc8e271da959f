//! Python symbols from the tree-sitter grammar

use super::LanguageParser;
use super::language::Language;
use super::scan::is_all_caps;
use super::types::{Import, Symbol, SymbolKind, Visibility};
use crate::error::ParseError;
use regex::Regex;
use std::collections::HashSet;
use tree_sitter::{Node, Parser};

struct Frame {
    name: String,
    is_class: bool,
}

pub(crate) struct PythonParser {
    import_re: Regex,
    from_re: Regex,
}

impl PythonParser {
    pub fn new() -> Result<Self, ParseError> {
        let compile = |p: &str| {
            Regex::new(p).map_err(|e| ParseError::Syntax {
                language: "pattern".to_string(),
                reason: e.to_string(),
            })
        };
        Ok(Self {
            import_re: compile(r"^\s*import\s+(.+?)\s*(?:#.*)?$")?,
            from_re: compile(r"^\s*from\s+(\.*[\w.]*)\s+import\s+\(?\s*([^#)]*)")?,
        })
    }
}

fn text<'a>(node: Node<'_>, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or_default()
}

fn field_text<'a>(node: Node<'_>, field: &str, src: &'a [u8]) -> Option<&'a str> {
    node.child_by_field_name(field).map(|n| text(n, src))
}

fn visibility(name: &str) -> Visibility {
    if name.starts_with("__") && name.ends_with("__") {
        Visibility::Public
    } else if name.starts_with('_') {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

/// First statement of a body when it is a bare string literal
fn docstring(node: Node<'_>, src: &[u8]) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let mut cursor = body.walk();
    let first = body.named_children(&mut cursor).next()?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let mut inner = first.walk();
    let literal = first.named_children(&mut inner).next()?;
    if literal.kind() != "string" {
        return None;
    }

    let raw = text(literal, src).trim_start_matches(['r', 'R', 'u', 'U', 'b', 'B']);
    let stripped = ["\"\"\"", "'''", "\"", "'"]
        .iter()
        .find_map(|q| raw.strip_prefix(q).and_then(|r| r.strip_suffix(q)))
        .unwrap_or(raw);
    let cleaned = stripped.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

fn scope_path(frames: &[Frame]) -> Option<String> {
    (!frames.is_empty()).then(|| {
        frames
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    })
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn visit(node: Node<'_>, start_row: usize, src: &[u8], frames: &mut Vec<Frame>, out: &mut Vec<Symbol>) {
    match node.kind() {
        "decorated_definition" => {
            if let Some(definition) = node.child_by_field_name("definition") {
                visit(definition, node.start_position().row, src, frames, out);
            }
        }
        "function_definition" => {
            let Some(name) = field_text(node, "name", src) else {
                return;
            };
            let in_class = frames.last().is_some_and(|f| f.is_class);
            let kind = if in_class {
                SymbolKind::Method
            } else {
                SymbolKind::Function
            };
            let params = field_text(node, "parameters", src).unwrap_or("()");
            let prefix = if text(node, src).starts_with("async") {
                "async def"
            } else {
                "def"
            };

            out.push(
                Symbol::new(name, kind, start_row + 1, node.start_position().column)
                    .with_end_line(node.end_position().row + 1)
                    .with_scope(scope_path(frames))
                    .with_signature(collapse_whitespace(&format!("{} {}{}", prefix, name, params)))
                    .with_visibility(Some(visibility(name)))
                    .with_docstring(docstring(node, src)),
            );

            frames.push(Frame {
                name: name.to_string(),
                is_class: false,
            });
            if let Some(body) = node.child_by_field_name("body") {
                visit_children(body, src, frames, out);
            }
            frames.pop();
        }
        "class_definition" => {
            let Some(name) = field_text(node, "name", src) else {
                return;
            };
            let bases = node
                .child_by_field_name("superclasses")
                .map(|args| {
                    let mut cursor = args.walk();
                    args.named_children(&mut cursor)
                        .filter(|n| matches!(n.kind(), "identifier" | "attribute"))
                        .map(|n| text(n, src).to_string())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();

            out.push(
                Symbol::new(name, SymbolKind::Class, start_row + 1, node.start_position().column)
                    .with_end_line(node.end_position().row + 1)
                    .with_scope(scope_path(frames))
                    .with_signature(format!("class {}", name))
                    .with_visibility(Some(visibility(name)))
                    .with_docstring(docstring(node, src))
                    .with_bases(bases),
            );

            frames.push(Frame {
                name: name.to_string(),
                is_class: true,
            });
            if let Some(body) = node.child_by_field_name("body") {
                visit_children(body, src, frames, out);
            }
            frames.pop();
        }
        "assignment" => {
            if let Some(left) = node.child_by_field_name("left") {
                for target in assignment_targets(left) {
                    let name = text(target, src);
                    let kind = if is_all_caps(name) {
                        SymbolKind::Constant
                    } else {
                        SymbolKind::Variable
                    };
                    let line = target.start_position().row + 1;
                    out.push(
                        Symbol::new(name, kind, line, target.start_position().column)
                            .with_end_line(line)
                            .with_scope(scope_path(frames))
                            .with_visibility(Some(visibility(name))),
                    );
                }
            }
            // Chained assignments (`a = b = 1`) nest on the right
            if let Some(right) = node.child_by_field_name("right")
                && right.kind() == "assignment"
            {
                visit(right, right.start_position().row, src, frames, out);
            }
        }
        _ => visit_children(node, src, frames, out),
    }
}

fn visit_children(node: Node<'_>, src: &[u8], frames: &mut Vec<Frame>, out: &mut Vec<Symbol>) {
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
    for child in children {
        visit(child, child.start_position().row, src, frames, out);
    }
}

/// Plain-name targets of an assignment, unpacking tuples and lists
fn assignment_targets(left: Node<'_>) -> Vec<Node<'_>> {
    match left.kind() {
        "identifier" => vec![left],
        "pattern_list" | "tuple_pattern" | "list_pattern" => {
            let mut cursor = left.walk();
            left.named_children(&mut cursor)
                .filter(|n| n.kind() == "identifier")
                .collect()
        }
        _ => Vec::new(),
    }
}

impl LanguageParser for PythonParser {
    fn language(&self) -> Language {
        Language::Python
    }

    fn symbols(&self, content: &str) -> Result<Vec<Symbol>, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ParseError::GrammarUnavailable(format!("python: {}", e)))?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| ParseError::Syntax {
                language: "python".to_string(),
                reason: "parser produced no tree".to_string(),
            })?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(ParseError::Syntax {
                language: "python".to_string(),
                reason: "source contains syntax errors".to_string(),
            });
        }

        let mut symbols = Vec::new();
        let mut frames = Vec::new();
        visit_children(root, content.as_bytes(), &mut frames, &mut symbols);
        Ok(symbols)
    }

    fn imports(&self, content: &str) -> Vec<Import> {
        let mut imports = Vec::new();
        let mut seen = HashSet::new();

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            let mut targets = Vec::new();

            if let Some(caps) = self.from_re.captures(line) {
                let module = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                if !module.is_empty() && module.chars().all(|c| c == '.') {
                    // `from . import a, b` names sibling modules
                    let names = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                    for name in names.split(',') {
                        let name = name.split_whitespace().next().unwrap_or_default();
                        if !name.is_empty() && name != "*" {
                            targets.push(format!("{}{}", module, name));
                        }
                    }
                } else if !module.is_empty() {
                    targets.push(module.to_string());
                }
            } else if let Some(caps) = self.import_re.captures(line) {
                let modules = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                for module in modules.split(',') {
                    if let Some(module) = module.split_whitespace().next() {
                        targets.push(module.to_string());
                    }
                }
            }

            for target in targets {
                if seen.insert(target.clone()) {
                    imports.push(Import::new(target, line_no));
                }
            }
        }

        imports
    }
}
