//! Report writers
//!
//! Two renditions of the merged map: the streaming JSON summary written to
//! the commit directory, and the text table printed to stdout.

pub mod json;
pub mod text;

pub use json::{write_json_summary, FileSummaryEntry, JsonSummaryWriter, TOTAL_KEY};
pub use text::render_text_summary;

/// File name of the JSON summary when none is configured
pub const DEFAULT_REPORT_FILE: &str = "coverage-merged.json";
