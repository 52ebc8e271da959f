//! Ruby symbols from `end`-keyword depth

use super::LanguageParser;
use super::language::Language;
use super::scan::{is_all_caps, signature_of};
use super::types::{Import, Symbol, SymbolKind, Visibility};
use crate::error::ParseError;
use regex::Regex;
use std::collections::HashSet;

/// Keywords that open an `end`-terminated block at the start of a statement
const STATEMENT_OPENERS: &[&str] = &["if", "unless", "while", "until", "case", "begin", "for"];

/// Loops whose optional `do` must not be counted twice
const LOOP_OPENERS: &[&str] = &["while", "until", "for"];

enum Frame {
    Namespace {
        name: String,
        visibility: Visibility,
        symbol: Option<usize>,
    },
    Def(Option<usize>),
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Open,
    Close,
}

pub(crate) struct RubyParser {
    class_re: Regex,
    module_re: Regex,
    def_re: Regex,
    endless_def_re: Regex,
    constant_re: Regex,
    attr_re: Regex,
    attr_name_re: Regex,
    visibility_re: Regex,
    assign_opener_re: Regex,
    require_re: Regex,
}

fn compile(pattern: &str) -> Result<Regex, ParseError> {
    Regex::new(pattern).map_err(|e| ParseError::Syntax {
        language: "pattern".to_string(),
        reason: e.to_string(),
    })
}

/// Code portion of a line with string contents blanked and comments removed
fn code_of(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in line.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
                out.push(c);
                continue;
            }
            out.push(' ');
            continue;
        }
        match c {
            '#' => break,
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Identifier-like words with their byte offsets, skipping `.end` and `:end`
fn words(code: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let bytes = code.as_bytes();
    let mut start: Option<usize> = None;

    for (i, c) in code.char_indices().chain(std::iter::once((code.len(), ' '))) {
        let is_word = c.is_alphanumeric() || c == '_';
        match (start, is_word) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                let preceded = s > 0 && matches!(bytes[s - 1], b'.' | b':' | b'@' | b'$');
                if !preceded {
                    out.push((s, &code[s..i]));
                }
                start = None;
            }
            _ => {}
        }
    }
    out
}

impl RubyParser {
    pub fn new() -> Result<Self, ParseError> {
        Ok(Self {
            class_re: compile(r"^\s*class\s+([A-Z][\w:]*)(?:\s*<\s*([A-Z][\w:]*))?")?,
            module_re: compile(r"^\s*module\s+([A-Z][\w:]*)")?,
            def_re: compile(
                r"^\s*(?:(private|protected|public)\s+)?def\s+(?:self\.)?([A-Za-z_]\w*[?!=]?)",
            )?,
            endless_def_re: compile(r"^\s*(?:\w+\s+)?def\s+[\w.?!]+(?:\([^)]*\))?\s*=[^=~>]")?,
            constant_re: compile(r"^\s*([A-Z][A-Z0-9_]*)\s*=[^=~]")?,
            attr_re: compile(r"^\s*attr_(?:accessor|reader|writer)\s+(.+)$")?,
            attr_name_re: compile(r":(\w+)")?,
            visibility_re: compile(r"^\s*(private|protected|public)\s*$")?,
            assign_opener_re: compile(r"=\s*(if|unless|case|begin|while|until)\b")?,
            require_re: compile(r#"^\s*(require|require_relative)\s*\(?\s*['"]([^'"]+)['"]"#)?,
        })
    }

    fn scope_path(frames: &[Frame]) -> Option<String> {
        let names: Vec<&str> = frames
            .iter()
            .filter_map(|f| match f {
                Frame::Namespace { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        (!names.is_empty()).then(|| names.join("."))
    }

    fn namespace_visibility(frames: &[Frame]) -> Option<Visibility> {
        frames.iter().rev().find_map(|f| match f {
            Frame::Namespace { visibility, .. } => Some(*visibility),
            _ => None,
        })
    }

    fn scan(&self, content: &str) -> Vec<Symbol> {
        let mut frames: Vec<Frame> = Vec::new();
        let mut symbols: Vec<Symbol> = Vec::new();
        let mut comments: Vec<String> = Vec::new();

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim_start();

            if let Some(comment) = trimmed.strip_prefix('#') {
                comments.push(comment.trim().to_string());
                continue;
            }
            let docstring = (!comments.is_empty()).then(|| comments.join("\n"));
            comments.clear();

            let code = code_of(line);
            let tokens = words(&code);
            let first = tokens.first().map(|(_, w)| *w);
            let in_namespace = Self::namespace_visibility(&frames).is_some();
            let column = line.len() - trimmed.len();

            // The block this line opens, if any, applied at the first word
            let mut opener: Option<Frame> = None;

            if let Some(caps) = self.visibility_re.captures(line) {
                let toggled = match &caps[1] {
                    "private" => Visibility::Private,
                    "protected" => Visibility::Protected,
                    _ => Visibility::Public,
                };
                if let Some(Frame::Namespace { visibility, .. }) = frames
                    .iter_mut()
                    .rev()
                    .find(|f| matches!(f, Frame::Namespace { .. }))
                {
                    *visibility = toggled;
                }
            } else if first == Some("class") {
                opener = Some(match self.class_re.captures(line) {
                    Some(caps) => {
                        let name = caps[1].to_string();
                        let bases: Vec<String> =
                            caps.get(2).map(|b| vec![b.as_str().to_string()]).unwrap_or_default();
                        symbols.push(
                            Symbol::new(name.clone(), SymbolKind::Class, line_no, column)
                                .with_scope(Self::scope_path(&frames))
                                .with_signature(signature_of(line))
                                .with_visibility(Some(Visibility::Public))
                                .with_docstring(docstring)
                                .with_bases(bases),
                        );
                        Frame::Namespace {
                            name,
                            visibility: Visibility::Public,
                            symbol: Some(symbols.len() - 1),
                        }
                    }
                    // `class << self`
                    None => Frame::Block,
                });
            } else if first == Some("module") {
                opener = Some(match self.module_re.captures(line) {
                    Some(caps) => {
                        let name = caps[1].to_string();
                        symbols.push(
                            Symbol::new(name.clone(), SymbolKind::Module, line_no, column)
                                .with_scope(Self::scope_path(&frames))
                                .with_signature(signature_of(line))
                                .with_docstring(docstring),
                        );
                        Frame::Namespace {
                            name,
                            visibility: Visibility::Public,
                            symbol: Some(symbols.len() - 1),
                        }
                    }
                    None => Frame::Block,
                });
            } else if let Some(caps) = self.def_re.captures(line) {
                let name = &caps[2];
                let kind = if in_namespace {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                };
                let visibility = match caps.get(1).map(|m| m.as_str()) {
                    Some("private") => Visibility::Private,
                    Some("protected") => Visibility::Protected,
                    Some(_) => Visibility::Public,
                    None => Self::namespace_visibility(&frames).unwrap_or(Visibility::Public),
                };
                let symbol = Symbol::new(name, kind, line_no, column)
                    .with_scope(Self::scope_path(&frames))
                    .with_signature(signature_of(line))
                    .with_visibility(Some(visibility))
                    .with_docstring(docstring);

                if self.endless_def_re.is_match(line) {
                    symbols.push(symbol.with_end_line(line_no));
                } else {
                    symbols.push(symbol);
                    opener = Some(Frame::Def(Some(symbols.len() - 1)));
                }
            } else if first == Some("def") {
                // Operator methods such as `def ==(other)`
                if !self.endless_def_re.is_match(line) {
                    opener = Some(Frame::Def(None));
                }
            } else if let Some(caps) = self.constant_re.captures(line) {
                let name = &caps[1];
                if is_all_caps(name) {
                    symbols.push(
                        Symbol::new(name, SymbolKind::Constant, line_no, column)
                            .with_end_line(line_no)
                            .with_scope(Self::scope_path(&frames)),
                    );
                }
            } else if let Some(caps) = self.attr_re.captures(line)
                && in_namespace
            {
                let visibility = Self::namespace_visibility(&frames);
                for attr in self.attr_name_re.captures_iter(&caps[1]) {
                    symbols.push(
                        Symbol::new(&attr[1], SymbolKind::Property, line_no, column)
                            .with_end_line(line_no)
                            .with_scope(Self::scope_path(&frames))
                            .with_visibility(visibility),
                    );
                }
            }

            if opener.is_none()
                && let Some(word) = first
                && STATEMENT_OPENERS.contains(&word)
            {
                opener = Some(Frame::Block);
            }

            let mut events: Vec<(usize, Event)> = Vec::new();
            let loop_line = first.is_some_and(|w| LOOP_OPENERS.contains(&w));
            if opener.is_some() {
                events.push((tokens.first().map(|(pos, _)| *pos).unwrap_or(0), Event::Open));
            }
            for (pos, word) in &tokens {
                match *word {
                    "end" => events.push((*pos, Event::Close)),
                    "do" if !loop_line => events.push((*pos, Event::Open)),
                    _ => {}
                }
            }
            for m in self.assign_opener_re.find_iter(&code) {
                events.push((m.start(), Event::Open));
            }
            events.sort_by_key(|(pos, _)| *pos);

            for (_, event) in events {
                match event {
                    Event::Open => frames.push(opener.take().unwrap_or(Frame::Block)),
                    Event::Close => {
                        let symbol = match frames.pop() {
                            Some(Frame::Namespace { symbol, .. }) => symbol,
                            Some(Frame::Def(symbol)) => symbol,
                            _ => None,
                        };
                        if let Some(sym) = symbol.and_then(|i| symbols.get_mut(i)) {
                            sym.end_line = Some(line_no);
                        }
                    }
                }
            }
        }

        symbols
    }
}

impl LanguageParser for RubyParser {
    fn language(&self) -> Language {
        Language::Ruby
    }

    fn symbols(&self, content: &str) -> Result<Vec<Symbol>, ParseError> {
        Ok(self.scan(content))
    }

    fn imports(&self, content: &str) -> Vec<Import> {
        let mut seen = HashSet::new();
        content
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| {
                let caps = self.require_re.captures(line)?;
                let path = &caps[2];
                let target = if &caps[1] == "require_relative" && !path.starts_with('.') {
                    format!("./{}", path)
                } else {
                    path.to_string()
                };
                seen.insert(target.clone()).then(|| Import::new(target, idx + 1))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_skip_method_calls_named_end() {
        let code = code_of("range.end + x.do # end");
        let found: Vec<&str> = words(&code).into_iter().map(|(_, w)| w).collect();
        assert_eq!(found, vec!["range", "x"]);
    }

    #[test]
    fn test_code_of_blanks_strings() {
        assert_eq!(code_of("puts \"end\" # end"), "puts \"   \" ");
    }
}
