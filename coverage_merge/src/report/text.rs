//! Text table summary for the console

use crate::merger::CoverageMap;
use crate::missing::uncovered_lines;
use crate::summary::{CoverageSummary, Metric};

const HEADERS: [&str; 6] = [
    "File",
    "% Stmts",
    "% Branch",
    "% Funcs",
    "% Lines",
    "Uncovered Line #s",
];

const ALL_FILES: &str = "All files";

fn metric_cell(metric: &Metric) -> String {
    format!("{} ({}/{})", metric.pct, metric.covered, metric.total)
}

fn row(name: String, summary: &CoverageSummary, missing: String) -> [String; 6] {
    [
        name,
        metric_cell(&summary.statements),
        metric_cell(&summary.branches),
        metric_cell(&summary.functions),
        metric_cell(&summary.lines),
        missing,
    ]
}

/// Render the merged map as a table: an `All files` row, then one row per
/// file in path order.
pub fn render_text_summary(map: &CoverageMap) -> String {
    let mut rows = vec![row(ALL_FILES.to_string(), &map.summary(), String::new())];
    for (path, file) in map.iter() {
        let summary = file.to_summary();
        let missing = uncovered_lines(&summary, file);
        rows.push(row(format!(" {path}"), &summary, missing));
    }

    let mut widths = HEADERS.map(str::len);
    for cells in &rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.len());
        }
    }

    let separator = widths
        .iter()
        .map(|width| "-".repeat(width + 2))
        .collect::<Vec<_>>()
        .join("|");

    let mut output = String::new();
    output.push_str(&separator);
    output.push('\n');
    output.push_str(&format_row(&HEADERS.map(String::from), &widths));
    output.push_str(&separator);
    output.push('\n');
    for cells in &rows {
        output.push_str(&format_row(cells, &widths));
    }
    output.push_str(&separator);
    output.push('\n');
    output
}

fn format_row(cells: &[String; 6], widths: &[usize; 6]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(column, (cell, &width))| {
            // File and uncovered-lines columns read left to right, numbers align right
            if column == 0 || column == cells.len() - 1 {
                format!(" {cell:<width$} ")
            } else {
                format!(" {cell:>width$} ")
            }
        })
        .collect::<Vec<_>>()
        .join("|");
    format!("{}\n", line.trim_end())
}
