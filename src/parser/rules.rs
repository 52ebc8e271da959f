//! Table-driven line scanner used by the brace-delimited languages
//!
//! Each language supplies declaration rules and import rules. The scanner
//! tracks brace depth so that a callable directly inside a type body becomes a
//! `method` scoped to that type, and a binding there becomes a `property`.

use super::LanguageParser;
use super::language::Language;
use super::scan::{BraceCounter, Lexical, Token, is_all_caps, signature_of, split_bases};
use super::types::{Import, Symbol, SymbolKind, Visibility};
use crate::error::ParseError;
use regex::Regex;
use std::collections::HashSet;

/// Names a declaration regex can capture that are never symbols
const KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "else", "new", "do", "try",
    "typeof", "super", "this", "foreach", "elif", "using", "sizeof", "defined", "await", "yield",
    "throw", "case", "with", "when", "match", "delete", "in", "of",
];

/// Lines a type declaration may take before its body opens
const MAX_PENDING_LINES: usize = 2;

/// What a matching declaration rule produces
#[derive(Debug, Clone, Copy)]
pub(crate) enum Emit {
    /// Symbol whose brace body becomes an enclosing scope
    Container(SymbolKind),
    /// Type scope without a symbol of its own (`impl X`, `extension X`)
    ScopeOnly,
    /// Scope that only contributes to the dotted path (`namespace x`)
    Namespace,
    /// Function at free level, method directly inside a type body
    Callable,
    /// Fires only directly inside a type body
    Member(SymbolKind),
    Plain(SymbolKind),
    /// Constant when ALL_CAPS, property in a type body, otherwise variable
    Binding,
    /// `Binding` restricted to brace depth zero
    TopLevelBinding,
    /// Opens a parenthesized group (`const (`) declaring one symbol per line
    Group(SymbolKind),
}

pub(crate) struct DeclRule {
    regex: Regex,
    emit: Emit,
    name_group: usize,
    bases_group: Option<usize>,
    scope_group: Option<usize>,
}

fn compile(pattern: &str) -> Result<Regex, ParseError> {
    Regex::new(pattern).map_err(|e| ParseError::Syntax {
        language: "pattern".to_string(),
        reason: e.to_string(),
    })
}

impl DeclRule {
    pub fn new(pattern: &str, emit: Emit) -> Result<Self, ParseError> {
        Ok(Self {
            regex: compile(pattern)?,
            emit,
            name_group: 1,
            bases_group: None,
            scope_group: None,
        })
    }

    pub fn name_group(mut self, group: usize) -> Self {
        self.name_group = group;
        self
    }

    pub fn bases(mut self, group: usize) -> Self {
        self.bases_group = Some(group);
        self
    }

    /// Capture group naming the owning type (Go receivers)
    pub fn scope(mut self, group: usize) -> Self {
        self.scope_group = Some(group);
        self
    }
}

pub(crate) enum ImportRule {
    Line {
        regex: Regex,
        rewrite: fn(&str) -> String,
    },
    Group {
        open: Regex,
        item: Regex,
        close: Regex,
    },
}

impl ImportRule {
    /// Every match of capture group 1 on a line is an import target
    pub fn line(pattern: &str) -> Result<Self, ParseError> {
        Ok(Self::Line {
            regex: compile(pattern)?,
            rewrite: |s| s.to_string(),
        })
    }

    pub fn line_with(pattern: &str, rewrite: fn(&str) -> String) -> Result<Self, ParseError> {
        Ok(Self::Line {
            regex: compile(pattern)?,
            rewrite,
        })
    }

    pub fn group(open: &str, item: &str, close: &str) -> Result<Self, ParseError> {
        Ok(Self::Group {
            open: compile(open)?,
            item: compile(item)?,
            close: compile(close)?,
        })
    }
}

/// Rules for one language
pub(crate) struct RuleSet {
    pub language: Language,
    pub lexical: Lexical,
    pub decls: Vec<DeclRule>,
    pub imports: Vec<ImportRule>,
    pub visibility: fn(&str, &str) -> Option<Visibility>,
}

/// Default visibility: modifier keywords on the declaration line
pub(crate) fn keyword_visibility(line: &str, _name: &str) -> Option<Visibility> {
    Visibility::from_keywords(line)
}

struct OpenScope {
    name: String,
    is_type: bool,
    open_depth: i64,
    entered: bool,
    pending_lines: usize,
}

pub(crate) struct RuleParser {
    rules: RuleSet,
    group_item: Regex,
    group_close: Regex,
}

impl RuleParser {
    pub fn new(rules: RuleSet) -> Result<Self, ParseError> {
        Ok(Self {
            rules,
            group_item: compile(r"^\s*([A-Za-z_]\w*)")?,
            group_close: compile(r"^\s*\)")?,
        })
    }

    fn scan(&self, content: &str) -> Vec<Symbol> {
        let mut counter = BraceCounter::default();
        let mut scopes: Vec<OpenScope> = Vec::new();
        let mut group: Option<SymbolKind> = None;
        let mut symbols = Vec::new();

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            let depth = counter.depth();
            let innermost = scopes.iter().rev().find(|s| s.entered);
            let in_type_body =
                innermost.is_some_and(|s| s.is_type && depth == s.open_depth + 1);
            let scope_path = {
                let names: Vec<&str> = scopes
                    .iter()
                    .filter(|s| s.entered)
                    .map(|s| s.name.as_str())
                    .collect();
                (!names.is_empty()).then(|| names.join("."))
            };
            let mut pending: Option<(String, bool)> = None;

            if let Some(kind) = group {
                if self.group_close.is_match(line) {
                    group = None;
                } else if let Some(m) = self.group_item.captures(line).and_then(|c| c.get(1)) {
                    let name = m.as_str();
                    let kind = if is_all_caps(name) {
                        SymbolKind::Constant
                    } else {
                        kind
                    };
                    symbols.push(
                        Symbol::new(name, kind, line_no, m.start())
                            .with_end_line(line_no)
                            .with_scope(scope_path.clone())
                            .with_visibility((self.rules.visibility)(line, name)),
                    );
                }
            } else {
                for rule in &self.rules.decls {
                    let Some(caps) = rule.regex.captures(line) else {
                        continue;
                    };
                    let Some(name_match) = caps.get(rule.name_group) else {
                        continue;
                    };
                    let name = name_match.as_str();
                    if KEYWORDS.contains(&name) {
                        continue;
                    }

                    let kind = match rule.emit {
                        Emit::Container(kind) => {
                            pending = Some((name.to_string(), kind != SymbolKind::Module));
                            kind
                        }
                        Emit::ScopeOnly => {
                            pending = Some((name.to_string(), true));
                            break;
                        }
                        Emit::Namespace => {
                            pending = Some((name.to_string(), false));
                            break;
                        }
                        Emit::Callable if in_type_body => SymbolKind::Method,
                        Emit::Callable => SymbolKind::Function,
                        Emit::Member(SymbolKind::Property) if in_type_body && is_all_caps(name) => {
                            SymbolKind::Constant
                        }
                        Emit::Member(kind) if in_type_body => kind,
                        Emit::Member(_) => continue,
                        Emit::Plain(kind) => kind,
                        Emit::TopLevelBinding if depth != 0 => continue,
                        Emit::Binding | Emit::TopLevelBinding => {
                            if is_all_caps(name) {
                                SymbolKind::Constant
                            } else if in_type_body {
                                SymbolKind::Property
                            } else {
                                SymbolKind::Variable
                            }
                        }
                        Emit::Group(kind) => {
                            group = Some(kind);
                            break;
                        }
                    };

                    let visibility = (self.rules.visibility)(line, name);
                    let mut scope = rule
                        .scope_group
                        .and_then(|g| caps.get(g))
                        .map(|m| m.as_str().to_string())
                        .or_else(|| scope_path.clone());
                    let mut kind = kind;
                    let mut name = name;
                    // Out-of-line definitions such as `Shape::area`
                    if let Some((owner, member)) = name.rsplit_once("::") {
                        scope = Some(owner.to_string());
                        name = member;
                        if kind == SymbolKind::Function {
                            kind = SymbolKind::Method;
                        }
                    }

                    let column = name_match.start() + (name_match.as_str().len() - name.len());
                    let mut symbol = Symbol::new(name, kind, line_no, column)
                        .with_scope(scope)
                        .with_visibility(visibility);
                    if kind.has_body() {
                        symbol = symbol.with_signature(signature_of(line));
                    } else {
                        symbol = symbol.with_end_line(line_no);
                    }
                    if let Some(bases) = rule.bases_group.and_then(|g| caps.get(g)) {
                        symbol = symbol.with_bases(split_bases(bases.as_str()));
                    }
                    symbols.push(symbol);
                    break;
                }
            }

            if let Some((name, is_type)) = pending {
                scopes.push(OpenScope {
                    name,
                    is_type,
                    open_depth: depth,
                    entered: false,
                    pending_lines: 0,
                });
            }

            counter.feed(line, self.rules.lexical, |token, depth_after| match token {
                Token::Open => {
                    if let Some(top) = scopes.last_mut()
                        && !top.entered
                        && depth_after == top.open_depth + 1
                    {
                        top.entered = true;
                    }
                }
                Token::Close => {
                    while scopes
                        .last()
                        .is_some_and(|top| top.entered && depth_after <= top.open_depth)
                    {
                        scopes.pop();
                    }
                }
                Token::Semicolon => {
                    if scopes
                        .last()
                        .is_some_and(|top| !top.entered && depth_after == top.open_depth)
                    {
                        scopes.pop();
                    }
                }
            });

            if let Some(top) = scopes.last_mut()
                && !top.entered
            {
                top.pending_lines += 1;
                if top.pending_lines > MAX_PENDING_LINES {
                    scopes.pop();
                }
            }
        }

        symbols
    }

    fn scan_imports(&self, content: &str) -> Vec<Import> {
        let mut imports = Vec::new();
        let mut seen = HashSet::new();
        let mut active_group: Option<(&Regex, &Regex)> = None;

        let mut record = |target: String, line: usize, imports: &mut Vec<Import>| {
            let target = target.trim().to_string();
            if !target.is_empty() && seen.insert(target.clone()) {
                imports.push(Import::new(target, line));
            }
        };

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;

            if let Some((item, close)) = active_group {
                if close.is_match(line) {
                    active_group = None;
                } else if let Some(m) = item.captures(line).and_then(|c| c.get(1)) {
                    record(m.as_str().to_string(), line_no, &mut imports);
                }
                continue;
            }

            for rule in &self.rules.imports {
                match rule {
                    ImportRule::Line { regex, rewrite } => {
                        for caps in regex.captures_iter(line) {
                            if let Some(m) = caps.get(1) {
                                record(rewrite(m.as_str()), line_no, &mut imports);
                            }
                        }
                    }
                    ImportRule::Group { open, item, close } => {
                        if open.is_match(line) {
                            active_group = Some((item, close));
                        }
                    }
                }
            }
        }

        imports
    }
}

impl LanguageParser for RuleParser {
    fn language(&self) -> Language {
        self.rules.language
    }

    fn symbols(&self, content: &str) -> Result<Vec<Symbol>, ParseError> {
        Ok(self.scan(content))
    }

    fn imports(&self, content: &str) -> Vec<Import> {
        self.scan_imports(content)
    }
}
