//! Coverage summaries
//!
//! A summary is a derived snapshot of a file (or of the whole map): for each
//! metric the number of covered items, the total, and a percentage rounded
//! down to two decimals.

use std::fmt;

use serde::{Serialize, Serializer};

/// Coverage percentage of a metric.
///
/// The aggregate summary starts out as `Unknown` and only becomes a number
/// once at least one file summary has been merged into it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Percent {
    Known(f64),
    #[default]
    Unknown,
}

impl Percent {
    pub fn value(self) -> Option<f64> {
        match self {
            Percent::Known(value) => Some(value),
            Percent::Unknown => None,
        }
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Percent::Known(value) if value.fract() == 0.0 => write!(f, "{}", *value as i64),
            Percent::Known(value) => write!(f, "{value}"),
            Percent::Unknown => f.write_str("Unknown"),
        }
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Percent::Known(value) if value.fract() == 0.0 && value >= 0.0 => {
                serializer.serialize_u64(value as u64)
            }
            Percent::Known(value) => serializer.serialize_f64(value),
            Percent::Unknown => serializer.serialize_str("Unknown"),
        }
    }
}

/// Percentage of `covered` over `total`, floored to two decimals.
///
/// A metric with nothing to cover counts as fully covered.
pub fn percent(covered: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let scaled = (1000.0 * 100.0 * covered as f64) / total as f64;
    (scaled / 10.0).floor() / 100.0
}

/// Covered/total counts for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct Metric {
    pub total: u64,
    pub covered: u64,
    pub skipped: u64,
    pub pct: Percent,
}

impl Metric {
    pub fn new(covered: u64, total: u64) -> Self {
        Self {
            total,
            covered,
            skipped: 0,
            pct: Percent::Known(percent(covered, total)),
        }
    }

    fn merge(&mut self, other: &Metric) {
        self.total += other.total;
        self.covered += other.covered;
        self.skipped += other.skipped;
        self.pct = Percent::Known(percent(self.covered, self.total));
    }
}

/// Metric names as they appear in reports and threshold specs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Lines,
    Statements,
    Functions,
    Branches,
    BranchesTrue,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Lines => "lines",
            MetricKind::Statements => "statements",
            MetricKind::Functions => "functions",
            MetricKind::Branches => "branches",
            MetricKind::BranchesTrue => "branchesTrue",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageSummary {
    pub lines: Metric,
    pub statements: Metric,
    pub functions: Metric,
    pub branches: Metric,
    #[serde(rename = "branchesTrue", skip_serializing_if = "Option::is_none")]
    pub branches_true: Option<Metric>,
}

impl CoverageSummary {
    /// An aggregate with no files merged yet: every metric is zero and its
    /// percentage unknown.
    pub fn blank() -> Self {
        Self {
            lines: Metric::default(),
            statements: Metric::default(),
            functions: Metric::default(),
            branches: Metric::default(),
            branches_true: Some(Metric::default()),
        }
    }

    /// Accumulate another summary into this one, recomputing percentages
    pub fn merge(&mut self, other: &CoverageSummary) {
        self.lines.merge(&other.lines);
        self.statements.merge(&other.statements);
        self.functions.merge(&other.functions);
        self.branches.merge(&other.branches);
        if let Some(other_true) = &other.branches_true {
            self.branches_true
                .get_or_insert_with(Metric::default)
                .merge(other_true);
        }
    }

    pub fn metric(&self, kind: MetricKind) -> Option<&Metric> {
        match kind {
            MetricKind::Lines => Some(&self.lines),
            MetricKind::Statements => Some(&self.statements),
            MetricKind::Functions => Some(&self.functions),
            MetricKind::Branches => Some(&self.branches),
            MetricKind::BranchesTrue => self.branches_true.as_ref(),
        }
    }

    /// No coverable lines at all
    pub fn is_empty(&self) -> bool {
        self.lines.total == 0
    }
}
