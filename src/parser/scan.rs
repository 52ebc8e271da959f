//! Line-level lexical helpers shared by the regex strategies

/// Upper bound on lines scanned when looking for the end of a block
const MAX_BLOCK_SCAN: usize = 10_000;

/// Longest signature kept on a symbol
const MAX_SIGNATURE_CHARS: usize = 200;

/// How a language spells strings and comments
#[derive(Debug, Clone, Copy)]
pub(crate) struct Lexical {
    pub single_quote_strings: bool,
    pub backtick_strings: bool,
    pub hash_comments: bool,
    pub slash_comments: bool,
}

impl Lexical {
    /// `'x'` is a character literal, `'a` may be a lifetime
    pub const C_LIKE: Lexical = Lexical {
        single_quote_strings: false,
        backtick_strings: false,
        hash_comments: false,
        slash_comments: true,
    };

    pub const JS: Lexical = Lexical {
        single_quote_strings: true,
        backtick_strings: true,
        hash_comments: false,
        slash_comments: true,
    };

    pub const GO: Lexical = Lexical {
        single_quote_strings: false,
        backtick_strings: true,
        hash_comments: false,
        slash_comments: true,
    };

    pub const PHP: Lexical = Lexical {
        single_quote_strings: true,
        backtick_strings: false,
        hash_comments: true,
        slash_comments: true,
    };

    pub const SCRIPT: Lexical = Lexical {
        single_quote_strings: true,
        backtick_strings: false,
        hash_comments: true,
        slash_comments: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token {
    Open,
    Close,
    Semicolon,
}

/// Tracks brace depth across lines, skipping string literals and comments
#[derive(Debug, Default)]
pub(crate) struct BraceCounter {
    depth: i64,
    in_block_comment: bool,
    in_backtick: bool,
}

impl BraceCounter {
    pub fn depth(&self) -> i64 {
        self.depth
    }

    /// Feed one line, reporting every structural token with the depth after it
    pub fn feed(&mut self, line: &str, lex: Lexical, mut on_token: impl FnMut(Token, i64)) {
        let chars: Vec<char> = line.chars().collect();
        let mut quote: Option<char> = self.in_backtick.then_some('`');
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();

            if self.in_block_comment {
                if c == '*' && next == Some('/') {
                    self.in_block_comment = false;
                    i += 2;
                } else {
                    i += 1;
                }
                continue;
            }

            if let Some(q) = quote {
                if c == '\\' {
                    i += 2;
                    continue;
                }
                if c == q {
                    quote = None;
                    if q == '`' {
                        self.in_backtick = false;
                    }
                }
                i += 1;
                continue;
            }

            match c {
                '/' if lex.slash_comments && next == Some('/') => break,
                '/' if lex.slash_comments && next == Some('*') => {
                    self.in_block_comment = true;
                    i += 2;
                    continue;
                }
                '#' if lex.hash_comments => break,
                '"' => quote = Some('"'),
                '\'' if lex.single_quote_strings => quote = Some('\''),
                '\'' => {
                    // Character literal; anything else is a lifetime or label
                    if next == Some('\\') {
                        if let Some(close) = chars[i + 2..].iter().take(10).position(|&ch| ch == '\'') {
                            i += close + 3;
                            continue;
                        }
                    } else if chars.get(i + 2) == Some(&'\'') {
                        i += 3;
                        continue;
                    }
                }
                '`' if lex.backtick_strings => {
                    quote = Some('`');
                    self.in_backtick = true;
                }
                '{' => {
                    self.depth += 1;
                    on_token(Token::Open, self.depth);
                }
                '}' => {
                    self.depth = (self.depth - 1).max(0);
                    on_token(Token::Close, self.depth);
                }
                ';' => on_token(Token::Semicolon, self.depth),
                _ => {}
            }
            i += 1;
        }
    }
}

/// Find the 1-based line where the brace block starting at `start_idx`
/// (0-based) closes. A `;` before any opening brace marks a bodiless
/// declaration that ends on the line it appears.
pub(crate) fn brace_block_end(lines: &[&str], start_idx: usize, lex: Lexical) -> Option<usize> {
    let mut counter = BraceCounter::default();
    let mut opened = false;

    for (offset, line) in lines.iter().skip(start_idx).take(MAX_BLOCK_SCAN).enumerate() {
        let mut closed = false;
        counter.feed(line, lex, |token, depth| match token {
            Token::Open => opened = true,
            Token::Close if opened && depth == 0 => closed = true,
            Token::Semicolon if !opened && depth == 0 => closed = true,
            _ => {}
        });
        if closed {
            return Some(start_idx + offset + 1);
        }
    }
    None
}

/// Uppercase identifier in the `str.isupper` sense: at least one letter and
/// no lowercase letters
pub(crate) fn is_all_caps(name: &str) -> bool {
    name.chars().any(char::is_alphabetic) && !name.chars().any(char::is_lowercase)
}

/// Declaration line trimmed to a single-line signature
pub(crate) fn signature_of(line: &str) -> String {
    let trimmed = line.trim().trim_end_matches('{').trim_end();
    if trimmed.chars().count() > MAX_SIGNATURE_CHARS {
        trimmed.chars().take(MAX_SIGNATURE_CHARS).collect()
    } else {
        trimmed.to_string()
    }
}

/// Split a captured base list (`A, B<T>`, `Base + Send`) into names
pub(crate) fn split_bases(raw: &str) -> Vec<String> {
    let mut depth = 0usize;
    let mut cleaned = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => cleaned.push(c),
            _ => {}
        }
    }
    cleaned
        .split([',', '+', ' ', '\t'])
        .map(|s| s.trim().trim_end_matches('{').trim())
        .filter(|s| !s.is_empty())
        .filter(|s| {
            !matches!(
                *s,
                "public" | "private" | "protected" | "virtual" | "implements" | "extends"
            )
        })
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brace_block_end_simple() {
        let lines = vec!["fn a() {", "    let x = 1;", "}", "fn b() {}"];
        assert_eq!(brace_block_end(&lines, 0, Lexical::C_LIKE), Some(3));
        assert_eq!(brace_block_end(&lines, 3, Lexical::C_LIKE), Some(4));
    }

    #[test]
    fn test_brace_block_end_ignores_strings_and_comments() {
        let lines = vec![
            "function f() {",
            "  const s = \"}\";",
            "  // }",
            "  const t = '{';",
            "  /* } */",
            "}",
        ];
        assert_eq!(brace_block_end(&lines, 0, Lexical::JS), Some(6));
    }

    #[test]
    fn test_brace_block_end_declaration_only() {
        let lines = vec!["    fn required(&self) -> u32;", "}"];
        assert_eq!(brace_block_end(&lines, 0, Lexical::C_LIKE), Some(1));
    }

    #[test]
    fn test_lifetimes_do_not_open_strings() {
        let lines = vec!["impl<'a> Parser<'a> {", "    fn c(&self) -> char { '{' }", "}"];
        assert_eq!(brace_block_end(&lines, 0, Lexical::C_LIKE), Some(3));
    }

    #[test]
    fn test_signature_on_next_line_brace() {
        let lines = vec!["public void run()", "{", "  go();", "}"];
        assert_eq!(brace_block_end(&lines, 0, Lexical::C_LIKE), Some(4));
    }

    #[test]
    fn test_unterminated_block() {
        let lines = vec!["fn broken() {", "  let x = 1;"];
        assert_eq!(brace_block_end(&lines, 0, Lexical::C_LIKE), None);
    }

    #[test]
    fn test_is_all_caps() {
        assert!(is_all_caps("MAX_SIZE"));
        assert!(is_all_caps("A1"));
        assert!(!is_all_caps("MaxSize"));
        assert!(!is_all_caps("_"));
        assert!(!is_all_caps("123"));
    }

    #[test]
    fn test_split_bases() {
        assert_eq!(split_bases("Base, Mixin<T>"), vec!["Base", "Mixin"]);
        assert_eq!(split_bases("Display + Send"), vec!["Display", "Send"]);
        assert_eq!(split_bases("public Shape"), vec!["Shape"]);
    }

    #[test]
    fn test_signature_of() {
        assert_eq!(signature_of("  pub fn run(&self) -> u8 {  "), "pub fn run(&self) -> u8");
    }
}
