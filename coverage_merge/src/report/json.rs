//! Streaming JSON summary
//!
//! The document is written piecewise: `{`, then one `"key": value` line per
//! entry, then `}`. Nothing is buffered beyond the underlying `BufWriter`.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{MergeError, Result};
use crate::merger::CoverageMap;
use crate::missing::uncovered_lines;
use crate::summary::CoverageSummary;

/// Key of the aggregate entry
pub const TOTAL_KEY: &str = "total";

/// Incremental writer for a single JSON object.
///
/// Writes to the sink are blocking.
///
/// The sink is owned by the writer; dropping it (including on an error
/// path) flushes what was buffered and closes the file.
pub struct JsonSummaryWriter<W: Write> {
    sink: W,
    first: bool,
}

impl JsonSummaryWriter<BufWriter<File>> {
    pub async fn create(path: &Path) -> io::Result<Self> {
        let file = tokio::fs::File::create(path).await?.into_std().await;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> JsonSummaryWriter<W> {
    pub fn new(mut sink: W) -> io::Result<Self> {
        sink.write_all(b"{")?;
        Ok(Self { sink, first: true })
    }

    pub fn append<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> io::Result<()> {
        if self.first {
            self.first = false;
        } else {
            self.sink.write_all(b",")?;
        }
        serde_json::to_writer(&mut self.sink, key)?;
        self.sink.write_all(b": ")?;
        serde_json::to_writer(&mut self.sink, value)?;
        self.sink.write_all(b"\n")
    }

    /// Close the object and flush. Returns the sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.sink.write_all(b"}\n")?;
        self.sink.flush()?;
        Ok(self.sink)
    }
}

/// A file's summary plus its uncovered line ranges
#[derive(Debug, Serialize)]
pub struct FileSummaryEntry<'a> {
    #[serde(flatten)]
    pub summary: &'a CoverageSummary,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub uncovered_lines: &'a str,
}

/// Stream the total and every file's summary into `writer`.
pub fn write_summaries<W: Write>(
    map: &CoverageMap,
    writer: &mut JsonSummaryWriter<W>,
) -> io::Result<()> {
    writer.append(TOTAL_KEY, &map.summary())?;
    for (path, file) in map.iter() {
        let summary = file.to_summary();
        let missing = uncovered_lines(&summary, file);
        writer.append(
            path,
            &FileSummaryEntry {
                summary: &summary,
                uncovered_lines: &missing,
            },
        )?;
    }
    Ok(())
}

/// Write the merged JSON summary to `path`, replacing any existing file.
pub async fn write_json_summary(map: &CoverageMap, path: &Path) -> Result<()> {
    let mut writer = JsonSummaryWriter::create(path)
        .await
        .map_err(|err| MergeError::report(path, err))?;
    write_summaries(map, &mut writer).map_err(|err| MergeError::report(path, err))?;
    writer
        .finish()
        .map_err(|err| MergeError::report(path, err))?;
    Ok(())
}
