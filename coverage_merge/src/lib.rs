//! Merge istanbul coverage documents from several test runs into one report.
//!
//! The pipeline is: load each document in turn, remap build paths to source
//! paths while merging, write the JSON summary (with uncovered line ranges
//! per file) and the text table, then check the optional thresholds.

pub mod app;
pub mod coverage;
pub mod error;
pub mod manifest;
pub mod merger;
pub mod missing;
pub mod remap;
pub mod report;
pub mod source_map;
pub mod summary;
pub mod threshold;

pub use coverage::{CoverageDocument, FileCoverage};
pub use error::{MergeError, Result};
pub use merger::{CoverageMap, CoverageMerger};
pub use summary::CoverageSummary;
