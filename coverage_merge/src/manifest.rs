//! Coverage manifest
//!
//! The manifest is produced by the job that collected coverage. Only
//! `coverage_threshold` drives this tool; the other fields are read so that
//! they can be logged.

use std::path::Path;

use serde::Deserialize;

use crate::error::{MergeError, Result};
use crate::threshold::ThresholdSpec;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoverageManifest {
    #[serde(default)]
    pub removed_files: Vec<String>,
    #[serde(default)]
    pub all_files_executed: bool,
    #[serde(default)]
    pub coverage_threshold: Option<ThresholdSpec>,
}

impl CoverageManifest {
    fn validate(&self, path: &Path) -> Result<()> {
        let Some(spec) = &self.coverage_threshold else {
            return Ok(());
        };
        for (metric, minimum) in spec.minimums() {
            if !(0.0..=100.0).contains(&minimum) {
                return Err(MergeError::manifest(
                    path,
                    format!("{metric} threshold {minimum} is outside 0..=100"),
                ));
            }
        }
        Ok(())
    }
}

pub fn parse_manifest(path: &Path, content: &str) -> Result<CoverageManifest> {
    let manifest: CoverageManifest =
        serde_json::from_str(content).map_err(|err| MergeError::manifest(path, err))?;
    manifest.validate(path)?;
    Ok(manifest)
}

pub async fn load_manifest(path: &Path) -> Result<CoverageManifest> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| MergeError::load(path, err))?;
    parse_manifest(path, &content)
}
