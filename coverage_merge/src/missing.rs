//! Uncovered line ranges
//!
//! Collapses a file's per-line hit data into compact notation such as
//! `3-5,9`. A file whose lines are all covered is inspected at branch
//! granularity instead, so partially taken branches still show up.

use crate::coverage::FileCoverage;
use crate::summary::{CoverageSummary, Percent};

/// Inclusive run of missed lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineRange {
    start: u32,
    end: Option<u32>,
}

impl LineRange {
    fn render(&self) -> String {
        match self.end {
            Some(end) => format!("{}-{}", self.start, end),
            None => self.start.to_string(),
        }
    }
}

/// Render the uncovered lines of `file` as comma-joined ranges.
///
/// `summary` must be `file.to_summary()`; it is passed in because callers
/// already hold it for reporting.
pub fn uncovered_lines(summary: &CoverageSummary, file: &FileCoverage) -> String {
    let lines_pct = if summary.is_empty() {
        Percent::Known(0.0)
    } else {
        summary.lines.pct
    };

    let line_hits: Vec<(u32, bool)> = if lines_pct == Percent::Known(100.0) {
        file.branch_coverage_by_line()
            .into_iter()
            .map(|(line, branches)| (line, branches.is_fully_covered()))
            .collect()
    } else {
        file.line_coverage()
            .into_iter()
            .map(|(line, hits)| (line, hits > 0))
            .collect()
    };

    collapse(line_hits)
        .iter()
        .map(LineRange::render)
        .collect::<Vec<_>>()
        .join(",")
}

fn collapse(line_hits: impl IntoIterator<Item = (u32, bool)>) -> Vec<LineRange> {
    let mut ranges: Vec<LineRange> = Vec::new();
    let mut new_range = true;

    for (line, hit) in line_hits {
        if hit {
            new_range = true;
            continue;
        }
        if new_range {
            ranges.push(LineRange {
                start: line,
                end: None,
            });
            new_range = false;
        } else if let Some(current) = ranges.last_mut() {
            current.end = Some(line);
        }
    }

    ranges
}
