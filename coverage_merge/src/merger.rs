//! Coverage aggregation
//!
//! `CoverageMerger` is the only thing that mutates coverage state. It is
//! created empty, fed records (directly or a whole document at a time) and
//! then finalized into a read-only [`CoverageMap`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::coverage::{parse_document, CoverageDocument, FileCoverage};
use crate::error::{MergeError, Result};
use crate::remap::remap_path;
use crate::summary::CoverageSummary;

#[derive(Debug, Default)]
pub struct CoverageMerger {
    files: BTreeMap<String, FileCoverage>,
}

impl CoverageMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remap the record's path, then insert it or sum it into the record
    /// already held for that path.
    pub fn add_file_coverage(&mut self, mut record: FileCoverage) {
        let remapped = remap_path(&record.path).into_owned();
        if remapped != record.path {
            debug!(from = %record.path, to = %remapped, "Remapped build path");
        }
        record.path = remapped;
        self.merge_record(record);
    }

    /// Insert or sum a record under its path as given, without remapping.
    pub fn merge_record(&mut self, record: FileCoverage) {
        match self.files.get_mut(&record.path) {
            Some(existing) => existing.merge(&record),
            None => {
                self.files.insert(record.path.clone(), record);
            }
        }
    }

    pub fn merge_document(&mut self, document: CoverageDocument) {
        for record in document.into_values() {
            self.add_file_coverage(record);
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn finalize(self) -> CoverageMap {
        CoverageMap { files: self.files }
    }
}

/// Merged coverage for every file, keyed and ordered by path
#[derive(Debug, Clone, Default)]
pub struct CoverageMap {
    files: BTreeMap<String, FileCoverage>,
}

impl CoverageMap {
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn file_coverage_for(&self, path: &str) -> Option<&FileCoverage> {
        self.files.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileCoverage)> {
        self.files.iter().map(|(path, file)| (path.as_str(), file))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn into_records(self) -> impl Iterator<Item = FileCoverage> {
        self.files.into_values()
    }

    /// Aggregate summary over all files
    pub fn summary(&self) -> CoverageSummary {
        self.files
            .values()
            .fold(CoverageSummary::blank(), |mut total, file| {
                total.merge(&file.to_summary());
                total
            })
    }
}

/// Read and parse one coverage-data document.
pub async fn load_coverage_document(path: &Path) -> Result<CoverageDocument> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| MergeError::load(path, err))?;
    parse_document(&content).map_err(|err| MergeError::parse(path, err))
}

/// Load every document in order and merge it.
///
/// Documents are processed one at a time; the first one that cannot be read
/// or parsed aborts the whole merge.
pub async fn merge_coverage_files(paths: &[PathBuf]) -> Result<CoverageMap> {
    let mut merger = CoverageMerger::new();
    for path in paths {
        info!(file = %path.display(), "Merging coverage file");
        let document = load_coverage_document(path).await?;
        debug!(records = document.len(), "Loaded coverage document");
        merger.merge_document(document);
    }
    Ok(merger.finalize())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::coverage::fixtures::file_with_line_hits;
    use crate::summary::Percent;

    #[test]
    fn add_file_coverage__same_path_twice__then_hits_summed() {
        let mut merger = CoverageMerger::new();
        merger.add_file_coverage(file_with_line_hits("a.js", &[(1, 1), (2, 0)]));
        merger.add_file_coverage(file_with_line_hits("a.js", &[(1, 2), (2, 3)]));

        let map = merger.finalize();
        let file = map.file_coverage_for("a.js").unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(file.s.get("0"), Some(&3));
        assert_eq!(file.s.get("1"), Some(&3));
    }

    #[test]
    fn add_file_coverage__new_path__then_inserted() {
        let mut merger = CoverageMerger::new();
        merger.add_file_coverage(file_with_line_hits("a.js", &[(1, 1)]));
        merger.add_file_coverage(file_with_line_hits("b.js", &[(1, 0)]));

        let map = merger.finalize();
        assert_eq!(map.files().collect::<Vec<_>>(), vec!["a.js", "b.js"]);
    }

    #[test]
    fn add_file_coverage__build_path__then_keyed_by_source_path() {
        let mut merger = CoverageMerger::new();
        merger.add_file_coverage(file_with_line_hits("packages/foo/build/a.js", &[(1, 1)]));
        merger.add_file_coverage(file_with_line_hits("packages/foo/src/a.js", &[(1, 1)]));

        let map = merger.finalize();
        let file = map.file_coverage_for("packages/foo/src/a.js").unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(file.path, "packages/foo/src/a.js");
        assert_eq!(file.s.get("0"), Some(&2));
    }

    #[test]
    fn finalize__merge_order_swapped__then_same_totals() {
        let first = file_with_line_hits("a.js", &[(1, 1), (2, 0), (3, 0)]);
        let second = file_with_line_hits("a.js", &[(1, 0), (2, 4), (3, 0)]);

        let mut forward = CoverageMerger::new();
        forward.add_file_coverage(first.clone());
        forward.add_file_coverage(second.clone());

        let mut backward = CoverageMerger::new();
        backward.add_file_coverage(second);
        backward.add_file_coverage(first);

        let forward = forward.finalize();
        let backward = backward.finalize();
        assert_eq!(
            forward.file_coverage_for("a.js").map(|f| &f.s),
            backward.file_coverage_for("a.js").map(|f| &f.s)
        );
        assert_eq!(forward.summary(), backward.summary());
    }

    #[test]
    fn summary__no_files__then_unknown_pct() {
        let map = CoverageMerger::new().finalize();
        assert!(map.is_empty());
        assert_eq!(map.summary().lines.pct, Percent::Unknown);
    }

    #[test]
    fn summary__two_files__then_aggregated() {
        let mut merger = CoverageMerger::new();
        merger.add_file_coverage(file_with_line_hits("a.js", &[(1, 1), (2, 0)]));
        merger.add_file_coverage(file_with_line_hits("b.js", &[(1, 1), (2, 1)]));

        let summary = merger.finalize().summary();

        assert_eq!((summary.lines.covered, summary.lines.total), (3, 4));
        assert_eq!(summary.lines.pct, Percent::Known(75.0));
    }
}
