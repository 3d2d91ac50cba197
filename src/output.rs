//! Plain-text rendering for CLI output.

use file_search_store_core::models::{Citation, Document, QueryResult, Store};

/// Renders rows as a left-aligned table: a header line, a dashed rule, then
/// one line per row. Columns are separated by two spaces.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let render = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<width$}", cell, width = w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render(headers.to_vec()));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(render(row.iter().map(String::as_str).collect()));
    }
    lines.join("\n")
}

fn or_dash(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_string()
}

pub fn stores_table(stores: &[Store]) -> String {
    let rows: Vec<Vec<String>> = stores
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                or_dash(s.display_name.as_deref()),
                s.create_time
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    format_table(&["NAME", "DISPLAY NAME", "CREATE TIME"], &rows)
}

pub fn documents_table(documents: &[Document]) -> String {
    let rows: Vec<Vec<String>> = documents
        .iter()
        .map(|d| {
            vec![
                d.name.clone(),
                or_dash(d.display_name.as_deref()),
                d.state.to_string(),
                d.create_time
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    format_table(&["NAME", "DISPLAY NAME", "STATE", "CREATE TIME"], &rows)
}

fn citation_line(index: usize, citation: &Citation) -> String {
    let source = citation
        .title
        .as_deref()
        .or(citation.uri.as_deref())
        .unwrap_or("(untitled)");
    let span = match (citation.start_index, citation.end_index) {
        (Some(start), Some(end)) => format!(" [{}..{}]", start, end),
        (Some(start), None) => format!(" [{}..]", start),
        _ => String::new(),
    };
    let mut line = format!("[{}] {}{}", index + 1, source, span);
    if let Some(snippet) = citation.snippet.as_deref() {
        let flat: String = snippet.split_whitespace().collect::<Vec<_>>().join(" ");
        let short: String = flat.chars().take(160).collect();
        let ellipsis = if flat.chars().count() > 160 { "..." } else { "" };
        line.push_str(&format!("\n    {}{}", short, ellipsis));
    }
    line
}

/// Answer text, followed by a numbered citation list when requested.
pub fn query_text(result: &QueryResult, show_citations: bool) -> String {
    let mut out = result.text.clone();
    if show_citations {
        out.push_str("\n\nCitations:");
        if result.citations.is_empty() {
            out.push_str("\n  (none)");
        }
        for (i, c) in result.citations.iter().enumerate() {
            out.push('\n');
            out.push_str(&citation_line(i, c));
        }
    }
    out
}
