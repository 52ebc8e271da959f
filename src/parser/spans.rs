//! End-line resolution for symbols found by line scanning
//!
//! Definition nodes from the tree-sitter grammar give exact spans. Where no
//! grammar is available, or no node starts on the symbol's line, brace
//! matching from the declaration line is used instead.

use super::language::Language;
use super::scan::{Lexical, brace_block_end};
use super::types::Symbol;
use std::collections::HashMap;
use tree_sitter::Parser;

fn grammar(language: Language, extension: &str) -> Option<tree_sitter::Language> {
    let grammar = match language {
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::TypeScript if extension.eq_ignore_ascii_case("tsx") => {
            tree_sitter_typescript::LANGUAGE_TSX.into()
        }
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::Go => tree_sitter_go::LANGUAGE.into(),
        Language::Java => tree_sitter_java::LANGUAGE.into(),
        Language::Swift => tree_sitter_swift::LANGUAGE.into(),
        Language::C => tree_sitter_c::LANGUAGE.into(),
        Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        Language::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
        Language::Ruby => tree_sitter_ruby::LANGUAGE.into(),
        Language::Php => tree_sitter_php::LANGUAGE_PHP.into(),
        Language::Kotlin | Language::Unknown => return None,
    };
    Some(grammar)
}

fn definition_kinds(language: Language) -> &'static [&'static str] {
    match language {
        Language::Rust => &[
            "function_item",
            "function_signature_item",
            "impl_item",
            "trait_item",
            "struct_item",
            "enum_item",
            "union_item",
            "mod_item",
        ],
        Language::Python => &["function_definition", "class_definition"],
        Language::JavaScript | Language::TypeScript => &[
            "function_declaration",
            "generator_function_declaration",
            "function_expression",
            "arrow_function",
            "method_definition",
            "class_declaration",
            "abstract_class_declaration",
            "interface_declaration",
            "enum_declaration",
            "lexical_declaration",
        ],
        Language::Go => &[
            "function_declaration",
            "method_declaration",
            "type_declaration",
        ],
        Language::Java => &[
            "method_declaration",
            "constructor_declaration",
            "class_declaration",
            "interface_declaration",
            "enum_declaration",
            "record_declaration",
        ],
        Language::Swift => &[
            "function_declaration",
            "class_declaration",
            "protocol_declaration",
            "init_declaration",
        ],
        Language::C => &[
            "function_definition",
            "struct_specifier",
            "enum_specifier",
            "union_specifier",
            "type_definition",
        ],
        Language::Cpp => &[
            "function_definition",
            "class_specifier",
            "struct_specifier",
            "enum_specifier",
            "union_specifier",
            "template_declaration",
        ],
        Language::CSharp => &[
            "method_declaration",
            "constructor_declaration",
            "class_declaration",
            "struct_declaration",
            "interface_declaration",
            "enum_declaration",
            "record_declaration",
            "property_declaration",
        ],
        Language::Ruby => &["method", "singleton_method", "class", "module"],
        Language::Php => &[
            "function_definition",
            "method_declaration",
            "class_declaration",
            "interface_declaration",
            "trait_declaration",
            "enum_declaration",
        ],
        Language::Kotlin | Language::Unknown => &[],
    }
}

fn lexical_for(language: Language) -> Lexical {
    match language {
        Language::JavaScript | Language::TypeScript | Language::Kotlin => Lexical::JS,
        Language::Go => Lexical::GO,
        Language::Php => Lexical::PHP,
        Language::Python | Language::Ruby | Language::Unknown => Lexical::SCRIPT,
        _ => Lexical::C_LIKE,
    }
}

/// Furthest end line of any definition node, keyed by its 1-based start line
pub struct SpanIndex {
    ends: HashMap<usize, usize>,
}

impl SpanIndex {
    pub fn build(language: Language, extension: &str, content: &str) -> Option<Self> {
        let grammar = grammar(language, extension)?;
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&grammar) {
            tracing::debug!("Failed to set {} grammar: {}", language, e);
            return None;
        }
        let tree = parser.parse(content, None)?;
        let kinds = definition_kinds(language);

        let mut ends: HashMap<usize, usize> = HashMap::new();
        let mut cursor = tree.walk();
        'walk: loop {
            let node = cursor.node();
            if kinds.contains(&node.kind()) {
                let start = node.start_position().row + 1;
                let end = node.end_position().row + 1;
                let entry = ends.entry(start).or_insert(end);
                *entry = (*entry).max(end);
            }

            if cursor.goto_first_child() {
                continue;
            }
            while !cursor.goto_next_sibling() {
                if !cursor.goto_parent() {
                    break 'walk;
                }
            }
        }

        Some(Self { ends })
    }

    pub fn end_for(&self, start_line: usize) -> Option<usize> {
        self.ends.get(&start_line).copied()
    }

    pub fn len(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }
}

/// Fill in missing end lines. Bodiless kinds end where they start; block
/// kinds with no resolvable end keep `None` and are later skipped by the
/// chunker.
pub(crate) fn resolve_end_lines(
    language: Language,
    filepath: &str,
    content: &str,
    symbols: &mut [Symbol],
) {
    if symbols.iter().all(|s| s.end_line.is_some()) {
        return;
    }

    let extension = std::path::Path::new(filepath)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let index = SpanIndex::build(language, extension, content);
    let lines: Vec<&str> = content.lines().collect();
    let lexical = lexical_for(language);

    for symbol in symbols.iter_mut().filter(|s| s.end_line.is_none()) {
        if !symbol.kind.has_body() {
            symbol.end_line = Some(symbol.start_line);
            continue;
        }
        symbol.end_line = index
            .as_ref()
            .and_then(|idx| idx.end_for(symbol.start_line))
            .or_else(|| {
                symbol
                    .start_line
                    .checked_sub(1)
                    .and_then(|start_idx| brace_block_end(&lines, start_idx, lexical))
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::types::SymbolKind;

    #[test]
    fn test_rust_span_index() {
        let source = "fn main() {\n    println!(\"hi\");\n}\n\nstruct Point {\n    x: i32,\n}\n";
        let index = SpanIndex::build(Language::Rust, "rs", source).unwrap();
        assert_eq!(index.end_for(1), Some(3));
        assert_eq!(index.end_for(5), Some(7));
        assert_eq!(index.end_for(2), None);
    }

    #[test]
    fn test_kotlin_has_no_grammar() {
        assert!(SpanIndex::build(Language::Kotlin, "kt", "fun main() {}").is_none());
    }

    #[test]
    fn test_resolve_falls_back_to_braces() {
        let source = "fun greet(name: String) {\n    println(name)\n}\nval X = 1\n";
        let mut symbols = vec![
            Symbol::new("greet", SymbolKind::Function, 1, 4),
            Symbol::new("X", SymbolKind::Constant, 4, 4),
        ];
        resolve_end_lines(Language::Kotlin, "Main.kt", source, &mut symbols);
        assert_eq!(symbols[0].end_line, Some(3));
        assert_eq!(symbols[1].end_line, Some(4));
    }

    #[test]
    fn test_resolve_keeps_existing_end_lines() {
        let mut symbols = vec![Symbol::new("f", SymbolKind::Function, 1, 0).with_end_line(9)];
        resolve_end_lines(Language::Go, "a.go", "func f() {\n}\n", &mut symbols);
        assert_eq!(symbols[0].end_line, Some(9));
    }
}
