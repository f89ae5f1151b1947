//! Per-file coverage records
//!
//! Records follow the istanbul JSON layout: location tables keyed by a
//! string index (`statementMap`, `fnMap`, `branchMap`) and hit tables keyed by
//! the same index (`s`, `f`, `b`, optionally `bT`).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::summary::{CoverageSummary, Metric};

/// One coverage-data document: file key to record
pub type CoverageDocument = BTreeMap<String, FileCoverage>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Position {
    pub line: u32,
    #[serde(default)]
    pub column: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
    /// Set by ignore hints; a skipped entry counts as covered
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FunctionMapping {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decl: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BranchMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<Range>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub locations: Vec<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl BranchMapping {
    /// Line the branch is reported on
    pub fn reported_line(&self) -> Option<u32> {
        let non_zero = |line: &u32| *line != 0;
        self.line
            .filter(non_zero)
            .or_else(|| self.loc.map(|loc| loc.start.line).filter(non_zero))
            .or_else(|| self.locations.first().map(|loc| loc.start.line))
    }
}

/// Branch hits aggregated on a single source line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineBranchCoverage {
    pub covered: u64,
    pub total: u64,
}

impl LineBranchCoverage {
    /// Percentage of the line's branch locations that were taken.
    ///
    /// `None` when the line carries no branch locations at all.
    pub fn coverage(&self) -> Option<f64> {
        (self.total > 0).then(|| (self.covered as f64 / self.total as f64) * 100.0)
    }

    pub fn is_fully_covered(&self) -> bool {
        self.coverage() == Some(100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FileCoverage {
    #[serde(default)]
    pub path: String,
    #[serde(rename = "statementMap")]
    pub statement_map: BTreeMap<String, Range>,
    #[serde(rename = "fnMap")]
    pub fn_map: BTreeMap<String, FunctionMapping>,
    #[serde(rename = "branchMap")]
    pub branch_map: BTreeMap<String, BranchMapping>,
    pub s: BTreeMap<String, u64>,
    pub f: BTreeMap<String, u64>,
    pub b: BTreeMap<String, Vec<u64>>,
    #[serde(rename = "bT", default, skip_serializing_if = "Option::is_none")]
    pub b_t: Option<BTreeMap<String, Vec<u64>>>,
    #[serde(
        rename = "inputSourceMap",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub input_source_map: Option<serde_json::Value>,
}

impl FileCoverage {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Add another run's hits for the same file.
    ///
    /// Counts are summed index by index. Location entries only known to
    /// `other` are adopted so that the merged record stays self-consistent.
    pub fn merge(&mut self, other: &FileCoverage) {
        for (key, hits) in &other.s {
            *self.s.entry(key.clone()).or_insert(0) += hits;
        }
        for (key, loc) in &other.statement_map {
            self.statement_map.entry(key.clone()).or_insert(*loc);
        }

        for (key, hits) in &other.f {
            *self.f.entry(key.clone()).or_insert(0) += hits;
        }
        for (key, mapping) in &other.fn_map {
            self.fn_map
                .entry(key.clone())
                .or_insert_with(|| mapping.clone());
        }

        merge_branch_hits(&mut self.b, &other.b);
        if let Some(other_true) = &other.b_t {
            merge_branch_hits(self.b_t.get_or_insert_with(BTreeMap::new), other_true);
        }
        for (key, mapping) in &other.branch_map {
            self.branch_map
                .entry(key.clone())
                .or_insert_with(|| mapping.clone());
        }

        if self.input_source_map.is_none() {
            self.input_source_map = other.input_source_map.clone();
        }
    }

    /// Hit count per line: the highest count among statements starting on it
    pub fn line_coverage(&self) -> BTreeMap<u32, u64> {
        let mut lines = BTreeMap::new();
        for (key, &count) in &self.s {
            let Some(loc) = self.statement_map.get(key) else {
                continue;
            };
            let entry = lines.entry(loc.start.line).or_insert(count);
            if *entry < count {
                *entry = count;
            }
        }
        lines
    }

    /// Branch hits grouped by the line each branch is reported on
    pub fn branch_coverage_by_line(&self) -> BTreeMap<u32, LineBranchCoverage> {
        let mut by_line: BTreeMap<u32, LineBranchCoverage> = BTreeMap::new();
        for (key, mapping) in &self.branch_map {
            let Some(line) = mapping.reported_line() else {
                continue;
            };
            let hits = self.b.get(key).map(Vec::as_slice).unwrap_or_default();
            let entry = by_line.entry(line).or_insert(LineBranchCoverage {
                covered: 0,
                total: 0,
            });
            entry.total += hits.len() as u64;
            entry.covered += hits.iter().filter(|&&hit| hit > 0).count() as u64;
        }
        by_line
    }

    pub fn to_summary(&self) -> CoverageSummary {
        let lines = self.line_coverage();
        CoverageSummary {
            lines: Metric::new(
                lines.values().filter(|&&hits| hits > 0).count() as u64,
                lines.len() as u64,
            ),
            statements: simple_totals(&self.s, |key| {
                self.statement_map.get(key).is_some_and(|loc| loc.skip)
            }),
            functions: simple_totals(&self.f, |key| {
                self.fn_map.get(key).is_some_and(|mapping| mapping.skip)
            }),
            branches: branch_totals(&self.b),
            branches_true: self.b_t.as_ref().map(branch_totals),
        }
    }
}

fn merge_branch_hits(into: &mut BTreeMap<String, Vec<u64>>, from: &BTreeMap<String, Vec<u64>>) {
    for (key, hits) in from {
        let existing = into.entry(key.clone()).or_default();
        if existing.len() < hits.len() {
            existing.resize(hits.len(), 0);
        }
        for (slot, hit) in existing.iter_mut().zip(hits) {
            *slot += hit;
        }
    }
}

/// Entries with a hit count as covered, so do skipped ones. A skipped entry
/// that was never hit is also counted in `skipped`.
fn simple_totals(hits: &BTreeMap<String, u64>, is_skipped: impl Fn(&str) -> bool) -> Metric {
    let (mut covered, mut skipped) = (0, 0);
    for (key, &hit) in hits {
        let skip = is_skipped(key);
        if hit > 0 || skip {
            covered += 1;
        }
        if hit == 0 && skip {
            skipped += 1;
        }
    }
    Metric {
        skipped,
        ..Metric::new(covered, hits.len() as u64)
    }
}

fn branch_totals(hits: &BTreeMap<String, Vec<u64>>) -> Metric {
    let (covered, total) = hits.values().fold((0, 0), |(covered, total), branch| {
        (
            covered + branch.iter().filter(|&&hit| hit > 0).count() as u64,
            total + branch.len() as u64,
        )
    });
    Metric::new(covered, total)
}

/// Parse a coverage-data document from JSON text.
///
/// Every record must carry the location and hit tables. Records without a
/// `path` take the key they are stored under.
pub fn parse_document(content: &str) -> serde_json::Result<CoverageDocument> {
    let raw: HashMap<String, FileCoverage> = serde_json::from_str(content)?;
    Ok(raw
        .into_iter()
        .map(|(key, mut record)| {
            if record.path.is_empty() {
                record.path = key.clone();
            }
            (key, record)
        })
        .collect())
}
