use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{
    error::{MergeError, Result},
    manifest::load_manifest,
    merger::merge_coverage_files,
    report::{render_text_summary, write_json_summary, DEFAULT_REPORT_FILE},
    source_map::transform_coverage,
    threshold::{check_coverage, ThresholdViolation},
};

/// Exit status for fatal errors, the unsigned form of `-1`
pub const FAILURE_EXIT_CODE: u8 = 255;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "coverage-merge",
    author,
    version,
    about = "Merge coverage files, write a summary and check thresholds",
    long_about = None
)]
pub struct Args {
    /// Directory the merged report is written to
    #[arg(long = "commitDir", alias = "commit-dir", value_name = "DIR")]
    pub commit_dir: Option<String>,

    /// Space-separated list of coverage JSON files to merge
    #[arg(long = "coverageFiles", alias = "coverage-files", value_name = "FILES")]
    pub coverage_files: Option<String>,

    /// Manifest holding an optional `coverage_threshold` object
    #[arg(long = "coverageManifest", alias = "coverage-manifest", value_name = "FILE")]
    pub coverage_manifest: Option<String>,

    /// File name of the JSON summary inside the commit directory
    #[arg(long, default_value = DEFAULT_REPORT_FILE)]
    pub output_name: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub commit_dir: PathBuf,
    pub coverage_files: Vec<PathBuf>,
    pub coverage_manifest: Option<PathBuf>,
    pub output_name: String,
}

impl AppConfig {
    pub fn report_path(&self) -> PathBuf {
        self.commit_dir.join(&self.output_name)
    }
}

impl TryFrom<Args> for AppConfig {
    type Error = MergeError;

    fn try_from(value: Args) -> Result<Self> {
        let commit_dir = value
            .commit_dir
            .filter(|dir| !dir.is_empty())
            .ok_or_else(|| MergeError::config("--commitDir is required"))?;
        let coverage_files: Vec<PathBuf> = value
            .coverage_files
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(PathBuf::from)
            .collect();
        if coverage_files.is_empty() {
            return Err(MergeError::config("--coverageFiles is required"));
        }
        let output_name = if value.output_name.is_empty() {
            DEFAULT_REPORT_FILE.to_string()
        } else {
            value.output_name
        };

        Ok(Self {
            commit_dir: PathBuf::from(commit_dir),
            coverage_files,
            coverage_manifest: value
                .coverage_manifest
                .filter(|manifest| !manifest.is_empty())
                .map(PathBuf::from),
            output_name,
        })
    }
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report_path: PathBuf,
    pub files_merged: usize,
    pub text_summary: String,
    pub violations: Vec<ThresholdViolation>,
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Write the text table to `out`. A closed stdout surfaces as a report error.
pub fn print_text_summary(out: &mut impl Write, text_summary: &str) -> Result<()> {
    write!(out, "{text_summary}")
        .and_then(|()| out.flush())
        .map_err(|err| MergeError::report(Path::new("<stdout>"), err))
}

/// Merge, apply source maps, report, then check thresholds.
///
/// Loading failures return before anything is written. Threshold
/// violations are logged and returned, they do not fail the run.
pub async fn run(config: AppConfig) -> Result<RunOutcome> {
    let map = transform_coverage(merge_coverage_files(&config.coverage_files).await?);

    tokio::fs::create_dir_all(&config.commit_dir)
        .await
        .map_err(|err| MergeError::report(&config.commit_dir, err))?;
    let report_path = config.report_path();
    write_json_summary(&map, &report_path).await?;
    info!(
        report = %report_path.display(),
        files = map.len(),
        "Wrote merged coverage summary",
    );

    let text_summary = render_text_summary(&map);
    print_text_summary(&mut io::stdout().lock(), &text_summary)?;

    let mut violations = Vec::new();
    if let Some(manifest_path) = &config.coverage_manifest {
        let manifest = load_manifest(manifest_path).await?;
        info!(
            manifest = %manifest_path.display(),
            removed_files = manifest.removed_files.len(),
            all_files_executed = manifest.all_files_executed,
            "Loaded coverage manifest",
        );
        match &manifest.coverage_threshold {
            Some(spec) => {
                violations = check_coverage(&map, spec);
                for violation in &violations {
                    error!("{violation}");
                }
            }
            None => info!("No coverage thresholds configured"),
        }
    }

    Ok(RunOutcome {
        report_path,
        files_merged: map.len(),
        text_summary,
        violations,
    })
}
