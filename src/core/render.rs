use crate::domain::model::{ReportOutput, Table};
use std::fmt::Write;

const MAX_CELL_WIDTH: usize = 40;

fn clip(cell: &str) -> String {
    if cell.chars().count() <= MAX_CELL_WIDTH {
        cell.to_string()
    } else {
        let mut clipped: String = cell.chars().take(MAX_CELL_WIDTH - 1).collect();
        clipped.push('…');
        clipped
    }
}

fn pad(cell: &str, width: usize) -> String {
    let len = cell.chars().count();
    format!("{}{}", cell, " ".repeat(width.saturating_sub(len)))
}

/// Aligned plain-text table showing at most `max_rows` rows.
pub fn render_table(table: &Table, max_rows: usize) -> String {
    let header: Vec<String> = table.columns.iter().map(|c| clip(c)).collect();
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .take(max_rows)
        .map(|record| table.row_cells(record).iter().map(|c| clip(c)).collect())
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| pad(cell, *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", line(&header[..]));
    let _ = writeln!(
        out,
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ")
    );
    for row in &rows {
        let _ = writeln!(out, "{}", line(&row[..]));
    }
    if table.len() > max_rows {
        let _ = writeln!(out, "... {} more rows", table.len() - max_rows);
    }
    if table.is_empty() {
        let _ = writeln!(out, "(no rows)");
    }
    out
}

pub fn render_report(output: &ReportOutput, max_rows: usize) -> String {
    let mut out = String::new();

    if !output.metrics.is_empty() {
        let width = output
            .metrics
            .iter()
            .map(|m| m.label.chars().count())
            .max()
            .unwrap_or(0);
        for metric in &output.metrics {
            let _ = writeln!(out, "{}  {}", pad(&metric.label, width), metric.value);
        }
        out.push('\n');
    }

    for note in &output.notes {
        let _ = writeln!(out, "• {}", note);
    }
    if !output.notes.is_empty() {
        out.push('\n');
    }

    for named in &output.tables {
        let _ = writeln!(out, "== {} ({} rows)", named.title, named.table.len());
        out.push_str(&render_table(&named.table, max_rows));
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Record;

    #[test]
    fn test_render_table_aligns_and_truncates() {
        let mut table = Table::from_columns(&["Agent", "Yes"]);
        table.push(Record::new().with("Agent", "ACME").with("Yes", 12));
        table.push(Record::new().with("Agent", "MEDITERRANEAN").with("Yes", 3));
        table.push(Record::new().with("Agent", "ONE").with("Yes", 1));

        let text = render_table(&table, 2);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Agent          Yes");
        assert_eq!(lines[1], "-------------  ---");
        assert_eq!(lines[2], "ACME           12");
        assert_eq!(lines[3], "MEDITERRANEAN  3");
        assert_eq!(lines[4], "... 1 more rows");
    }

    #[test]
    fn test_render_report_sections() {
        let mut output = ReportOutput::new("search");
        output.metric("Found", 0);
        output.note("No matching containers found.");
        output.table("container_search", "Container Search", Table::from_columns(&["Company"]));

        let text = render_report(&output, 10);
        assert!(text.starts_with("Found  0\n"));
        assert!(text.contains("• No matching containers found."));
        assert!(text.contains("== Container Search (0 rows)"));
        assert!(text.contains("(no rows)"));
    }

    #[test]
    fn test_long_cells_are_clipped() {
        let long = "X".repeat(60);
        assert_eq!(clip(&long).chars().count(), MAX_CELL_WIDTH);
    }
}
