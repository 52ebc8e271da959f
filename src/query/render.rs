use super::QueryResult;
use anyhow::Result;
use serde_json::json;
use std::fmt::Write;

/// Entries shown per structural category in debug output
const DEBUG_PREVIEW: usize = 5;
const TEXT_MATCHES: usize = 3;
const TEXT_SYMBOLS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Content longer than 300 chars is cut to 297 plus `...`
fn truncate(content: &str) -> String {
    if content.chars().count() > 300 {
        let head: String = content.chars().take(297).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}

/// Human-readable report: the top matches as fenced code, then key symbols
pub fn render_text(result: &QueryResult) -> String {
    let mut out = vec!["=== Code Query Results ===\n".to_string()];

    if !result.semantic_results.is_empty() {
        out.push("Relevant code sections:".to_string());
        for (i, m) in result.semantic_results.iter().take(TEXT_MATCHES).enumerate() {
            out.push(format!("\n{}. {} (score: {:.2}):", i + 1, m.filepath, m.score));
            out.push(format!("```{}\n{}\n```", m.language, truncate(&m.content)));
        }
    }

    if !result.structural_data.symbols.is_empty() {
        out.push("\nKey symbols:".to_string());
        for s in result.structural_data.symbols.iter().take(TEXT_SYMBOLS) {
            out.push(format!("- {} {} in {}", s.kind, s.name, s.filepath));
        }
    }

    out.join("\n")
}

pub fn render_json(result: &QueryResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Diagnostic view of one query. Without `include_raw` only result counts
/// are shown.
pub fn render_debug(result: &QueryResult, format: OutputFormat, include_raw: bool) -> Result<String> {
    match format {
        OutputFormat::Json => debug_json(result, include_raw),
        OutputFormat::Text => Ok(debug_text(result, include_raw)),
    }
}

fn debug_json(result: &QueryResult, include_raw: bool) -> Result<String> {
    let meta = &result.metadata;
    let structural = &result.structural_data;
    let results = if include_raw {
        json!({
            "semantic": result.semantic_results,
            "structural": structural,
            "lookups": meta.raw,
        })
    } else {
        json!({
            "semantic_count": result.semantic_results.len(),
            "structural": {
                "symbols_count": structural.symbols.len(),
                "imports_count": structural.imports.len(),
                "references_count": structural.references.len(),
            },
        })
    };

    let value = json!({
        "query": result.query,
        "parameters": meta.parameters,
        "threshold_used": meta.threshold_used,
        "fallback_used": meta.fallback_used,
        "timings": meta.timings,
        "file_paths_found": result.relevant_files,
        "errors": meta.errors,
        "results": results,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

fn debug_text(result: &QueryResult, include_raw: bool) -> String {
    let meta = &result.metadata;
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "=== QUERY DEBUG INFO ===");
    let _ = writeln!(out, "Query: {}", result.query);
    let _ = writeln!(
        out,
        "Parameters: similarity_threshold={}, max_results={}",
        meta.parameters.similarity_threshold, meta.parameters.max_results
    );
    if meta.fallback_used {
        let _ = writeln!(out, "Fallback threshold used: {}", meta.threshold_used);
    }

    let _ = writeln!(out, "\n=== TIMINGS ===");
    let _ = writeln!(out, "Semantic search: {:.2}ms", meta.timings.semantic_search_ms);
    let _ = writeln!(out, "Structural data: {:.2}ms", meta.timings.structural_data_ms);
    let _ = writeln!(out, "Total query time: {:.2}ms", meta.timings.total_query_ms);

    let _ = writeln!(out, "\n=== FILES FOUND ===");
    if result.relevant_files.is_empty() {
        let _ = writeln!(out, "No files found");
    }
    for (i, path) in result.relevant_files.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, path);
    }

    if !meta.errors.is_empty() {
        let _ = writeln!(out, "\n=== ERRORS ===");
        for e in &meta.errors {
            let _ = writeln!(out, "- {}", e);
        }
    }

    let structural = &result.structural_data;
    if !include_raw {
        let _ = writeln!(out, "\n=== RESULTS SUMMARY ===");
        let _ = writeln!(out, "Semantic results: {}", result.semantic_results.len());
        let _ = writeln!(out, "Symbols: {}", structural.symbols.len());
        let _ = writeln!(out, "Imports: {}", structural.imports.len());
        let _ = write!(out, "References: {}", structural.references.len());
        return out;
    }

    let _ = writeln!(out, "\n=== SEMANTIC RESULTS ===");
    for (i, m) in result.semantic_results.iter().enumerate() {
        let _ = writeln!(out, "\nResult {}:", i + 1);
        let _ = writeln!(out, "  File: {}", m.filepath);
        let _ = writeln!(out, "  Score: {:.4}", m.score);
        let _ = writeln!(out, "  Language: {}", m.language);
        let _ = writeln!(out, "  Lines: {}-{}", m.start_line, m.end_line);
        let _ = writeln!(out, "  Content: {}", truncate(&m.content));
    }

    let _ = writeln!(out, "\n=== STRUCTURAL DATA ===");
    section(
        &mut out,
        "Symbols",
        "symbols",
        structural
            .symbols
            .iter()
            .map(|s| format!("{} {} in {}", s.kind, s.name, s.filepath)),
        structural.symbols.len(),
    );
    section(
        &mut out,
        "Imports",
        "imports",
        structural
            .imports
            .iter()
            .map(|imp| format!("{} imports {}", imp.source_file, imp.imported_file)),
        structural.imports.len(),
    );
    section(
        &mut out,
        "References",
        "references",
        structural.references.iter().map(|r| {
            format!(
                "{} in {} referenced by {} in {}",
                r.symbol_name, r.defined_in, r.referenced_by, r.referenced_in
            )
        }),
        structural.references.len(),
    );

    if let Some(raw) = &meta.raw {
        let _ = writeln!(out, "\n=== LOOKUP STATEMENTS ===");
        let _ = writeln!(out, "{}", raw.symbols);
        let _ = writeln!(out, "{}", raw.imports);
        let _ = writeln!(out, "{}", raw.references);
    }

    out.truncate(out.trim_end().len());
    out
}

fn section(
    out: &mut String,
    title: &str,
    noun: &str,
    lines: impl Iterator<Item = String>,
    total: usize,
) {
    let _ = writeln!(out, "\n{} ({}):", title, total);
    for (i, line) in lines.take(DEBUG_PREVIEW).enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, line);
    }
    if total > DEBUG_PREVIEW {
        let _ = writeln!(out, "  ... and {} more {}", total - DEBUG_PREVIEW, noun);
    }
}
