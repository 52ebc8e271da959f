//! Parsing of textual graph-shell output
//!
//! The shell prints a header line followed by one row per line, values
//! separated by whitespace (and, in plain format, commas). Column order is
//! the order of the RETURN clause that produced the text. This is the only
//! place that knows the textual format.

use serde::Serialize;
use std::collections::BTreeMap;

/// A single cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Text(String),
    Null,
}

impl Value {
    fn parse(token: &str) -> Self {
        let token = token.trim_end_matches(',');
        let token = token.trim_matches('"');
        if token.eq_ignore_ascii_case("null") {
            return Self::Null;
        }
        if !token.is_empty()
            && token.bytes().all(|b| b.is_ascii_digit())
            && let Ok(n) = token.parse()
        {
            return Self::Int(n);
        }
        Self::Text(token.to_string())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Text form of any non-null cell
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Int(n) => Some(n.to_string()),
            Self::Text(s) => Some(s.clone()),
            Self::Null => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "\"{}\"", s),
            Self::Null => f.write_str("NULL"),
        }
    }
}

/// One parsed row, keyed by column name
pub type Row = BTreeMap<String, Value>;

/// Parse shell output into rows.
///
/// The first non-blank line is the header. Rows with fewer fields than
/// `columns` are skipped; extra fields are ignored.
pub fn parse_rows(text: &str, columns: &[&str]) -> Vec<Row> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    if lines.next().is_none() {
        return Vec::new();
    }

    let mut rows = Vec::new();
    for (index, line) in lines.enumerate() {
        let fields: Vec<&str> = line
            .split_whitespace()
            .filter(|f| *f != ",")
            .collect();
        if fields.len() < columns.len() {
            tracing::warn!(
                "Row {} has {} field(s), expected {}",
                index + 1,
                fields.len(),
                columns.len()
            );
            continue;
        }
        let row: Row = columns
            .iter()
            .zip(fields)
            .map(|(column, field)| (column.to_string(), Value::parse(field)))
            .collect();
        rows.push(row);
    }
    tracing::debug!("Parsed {} row(s)", rows.len());
    rows
}

/// Render rows in the shell's plain format
pub fn render_rows(columns: &[&str], rows: &[Vec<Value>]) -> String {
    let mut out = columns.join(", ");
    for row in rows {
        out.push('\n');
        let cells: Vec<String> = row.iter().map(Value::to_string).collect();
        out.push_str(&cells.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: [&str; 3] = ["name", "type", "start_line"];

    #[test]
    fn test_header_only_is_empty() {
        assert!(parse_rows("name, type, start_line\n", &COLUMNS).is_empty());
        assert!(parse_rows("", &COLUMNS).is_empty());
        assert!(parse_rows("  \n \n", &COLUMNS).is_empty());
    }

    #[test]
    fn test_plain_format_rows() {
        let text = "name, type, start_line\n\"main\", \"Function\", 3\n\n\"Service\", \"Class\", 8\n";
        let rows = parse_rows(text, &COLUMNS);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], Value::Text("main".to_string()));
        assert_eq!(rows[0]["type"].as_text(), Some("Function"));
        assert_eq!(rows[1]["start_line"].as_int(), Some(8));
    }

    #[test]
    fn test_whitespace_only_rows() {
        let rows = parse_rows("a b c\nx   y  42", &COLUMNS);
        assert_eq!(rows[0]["name"].as_text(), Some("x"));
        assert_eq!(rows[0]["start_line"], Value::Int(42));
    }

    #[test]
    fn test_short_rows_are_skipped_and_nulls_kept() {
        let text = "header\n\"only\", \"two\"\n\"f\", \"Function\", NULL";
        let rows = parse_rows(text, &COLUMNS);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["start_line"], Value::Null);
    }

    #[test]
    fn test_mixed_tokens_stay_text() {
        let rows = parse_rows("h\n\"v2\" \"12a\" \"007\"", &COLUMNS);
        assert_eq!(rows[0]["name"].as_text(), Some("v2"));
        assert_eq!(rows[0]["type"].as_text(), Some("12a"));
        assert_eq!(rows[0]["start_line"].as_int(), Some(7));
    }

    #[test]
    fn test_render_then_parse_matches_columns() {
        let text = render_rows(
            &COLUMNS,
            &[vec![
                Value::Text("run".to_string()),
                Value::Text("Method".to_string()),
                Value::Int(10),
            ]],
        );
        assert_eq!(text, "name, type, start_line\n\"run\", \"Method\", 10");
        let rows = parse_rows(&text, &COLUMNS);
        assert_eq!(rows[0]["name"].as_text(), Some("run"));
    }
}
