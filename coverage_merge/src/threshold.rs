//! Coverage threshold checks
//!
//! Thresholds are advisory: violations are reported, never escalated into a
//! failure of the run.

use std::fmt;

use serde::Deserialize;
use tracing::debug;

use crate::merger::CoverageMap;
use crate::summary::{CoverageSummary, MetricKind};

/// Minimum percentages from the manifest's `coverage_threshold` object
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ThresholdSpec {
    /// Check every file on its own instead of the total
    #[serde(default, alias = "perFile")]
    pub perfile: bool,
    #[serde(default)]
    pub lines: Option<f64>,
    #[serde(default)]
    pub branches: Option<f64>,
    #[serde(default)]
    pub functions: Option<f64>,
    #[serde(default)]
    pub statements: Option<f64>,
    #[serde(default, rename = "branchesTrue")]
    pub branches_true: Option<f64>,
}

impl ThresholdSpec {
    /// Configured minimums, in reporting order
    pub fn minimums(&self) -> impl Iterator<Item = (MetricKind, f64)> {
        [
            (MetricKind::Lines, self.lines),
            (MetricKind::Branches, self.branches),
            (MetricKind::Functions, self.functions),
            (MetricKind::Statements, self.statements),
            (MetricKind::BranchesTrue, self.branches_true),
        ]
        .into_iter()
        .filter_map(|(kind, minimum)| minimum.map(|minimum| (kind, minimum)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdViolation {
    pub metric: MetricKind,
    pub actual: f64,
    pub required: f64,
    /// Set when checking per file
    pub file: Option<String>,
}

impl fmt::Display for ThresholdViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ERROR: Coverage for {} ({}%) does not meet ",
            self.metric,
            Number(self.actual)
        )?;
        match &self.file {
            Some(file) => write!(f, "threshold ({}%) for {}", Number(self.required), file),
            None => write!(f, "global threshold ({}%)", Number(self.required)),
        }
    }
}

/// Percentages print without a trailing `.0`
struct Number(f64);

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Compare one summary against the spec.
///
/// Metrics missing from the summary, or whose percentage is still unknown,
/// are skipped.
pub fn check_summary(
    summary: &CoverageSummary,
    spec: &ThresholdSpec,
    file: Option<&str>,
) -> Vec<ThresholdViolation> {
    debug!(?spec, ?summary, file, "Checking coverage thresholds");
    spec.minimums()
        .filter_map(|(metric, required)| {
            let actual = summary.metric(metric)?.pct.value()?;
            (actual < required).then(|| ThresholdViolation {
                metric,
                actual,
                required,
                file: file.map(str::to_string),
            })
        })
        .collect()
}

/// Check the merged map: every file when the spec is per-file, otherwise
/// the total.
pub fn check_coverage(map: &CoverageMap, spec: &ThresholdSpec) -> Vec<ThresholdViolation> {
    if spec.perfile {
        map.iter()
            .flat_map(|(path, file)| check_summary(&file.to_summary(), spec, Some(path)))
            .collect()
    } else {
        check_summary(&map.summary(), spec, None)
    }
}
