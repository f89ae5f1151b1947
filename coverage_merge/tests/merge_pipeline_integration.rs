#![allow(non_snake_case)]

use std::fs;
use std::path::{Path, PathBuf};

use coverage_merge::app::{self, AppConfig};
use coverage_merge::error::MergeError;
use coverage_merge::merger::merge_coverage_files;
use serde_json::{json, Value};
use tempfile::TempDir;

/// Istanbul record with one statement per line in `lines`, hit when the line
/// falls inside `covered`.
fn istanbul_record(path: &str, lines: std::ops::RangeInclusive<u32>, covered: std::ops::RangeInclusive<u32>) -> Value {
    let mut statement_map = serde_json::Map::new();
    let mut hits = serde_json::Map::new();
    for (index, line) in lines.enumerate() {
        statement_map.insert(
            index.to_string(),
            json!({
                "start": {"line": line, "column": 0},
                "end": {"line": line, "column": 20}
            }),
        );
        hits.insert(index.to_string(), json!(u64::from(covered.contains(&line))));
    }
    json!({
        "path": path,
        "statementMap": statement_map,
        "fnMap": {},
        "branchMap": {},
        "s": hits,
        "f": {},
        "b": {}
    })
}

fn write_document(dir: &Path, name: &str, records: &[Value]) -> PathBuf {
    let mut document = serde_json::Map::new();
    for record in records {
        let key = record["path"].as_str().expect("path").to_string();
        document.insert(key, record.clone());
    }
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec_pretty(&Value::Object(document)).expect("bytes"))
        .expect("write document");
    path
}

fn config(commit_dir: &Path, files: &[PathBuf], manifest: Option<PathBuf>) -> AppConfig {
    AppConfig {
        commit_dir: commit_dir.to_path_buf(),
        coverage_files: files.to_vec(),
        coverage_manifest: manifest,
        output_name: "coverage-merged.json".to_string(),
    }
}

fn read_report(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("report")).expect("report json")
}

#[tokio::test]
async fn merge_pipeline__overlapping_runs__then_union_covered_and_no_missing_lines() {
    let temp = TempDir::new().expect("temp dir");
    let run_a = write_document(
        temp.path(),
        "run-a.json",
        &[istanbul_record("packages/app/build/index.js", 1..=8, 1..=5)],
    );
    let run_b = write_document(
        temp.path(),
        "run-b.json",
        &[istanbul_record("packages/app/build/index.js", 1..=8, 3..=8)],
    );
    let commit_dir = temp.path().join("commit");

    let outcome = app::run(config(&commit_dir, &[run_a, run_b], None))
        .await
        .expect("run succeeds");

    let report = read_report(&outcome.report_path);
    let object = report.as_object().expect("object");
    assert_eq!(object.len(), 2);
    assert!(object.contains_key("total"));

    let file = &report["packages/app/src/index.js"];
    assert_eq!(file["lines"]["covered"], 8);
    assert_eq!(file["lines"]["total"], 8);
    assert_eq!(file["lines"]["pct"], 100);
    assert!(file.get("uncovered_lines").is_none());
    assert_eq!(report["total"]["statements"]["covered"], 8);
    assert_eq!(outcome.files_merged, 1);
    assert!(outcome.violations.is_empty());
}

#[tokio::test]
async fn merge_pipeline__partial_coverage__then_uncovered_ranges_in_report() {
    let temp = TempDir::new().expect("temp dir");
    let run = write_document(
        temp.path(),
        "run.json",
        &[
            istanbul_record("src/a.js", 1..=10, 1..=2),
            istanbul_record("src/b.js", 1..=4, 1..=4),
        ],
    );

    let outcome = app::run(config(temp.path(), &[run], None))
        .await
        .expect("run succeeds");

    let report = read_report(&outcome.report_path);
    assert_eq!(report["src/a.js"]["uncovered_lines"], "3-10");
    assert_eq!(report["src/a.js"]["lines"]["pct"], 20);
    assert!(report["src/b.js"].get("uncovered_lines").is_none());
    assert!(outcome.text_summary.contains("src/a.js"));
    assert!(outcome.text_summary.contains("All files"));
}

#[tokio::test]
async fn merge_pipeline__record_with_source_map__then_reported_under_original_source() {
    let temp = TempDir::new().expect("temp dir");
    let generated = temp.path().join("dist").join("app.js");
    let mut record = istanbul_record(generated.to_str().expect("utf-8 path"), 1..=3, 1..=1);
    record["inputSourceMap"] = json!({
        "version": 3,
        "sources": ["../src/app.ts"],
        "names": [],
        "mappings": "AAAA;AACA;AACA"
    });
    let run = write_document(temp.path(), "run.json", &[record]);

    let outcome = app::run(config(temp.path(), &[run], None))
        .await
        .expect("run succeeds");

    let report = read_report(&outcome.report_path);
    let original = temp.path().join("src").join("app.ts");
    let file = &report[original.to_str().expect("utf-8 path")];
    assert_eq!(file["lines"]["total"], 3);
    assert_eq!(file["uncovered_lines"], "2-3");
    assert!(report.get(generated.to_str().expect("utf-8 path")).is_none());
}

#[tokio::test]
async fn merge_coverage_files__record_missing_required_tables__then_parse_error() {
    let temp = TempDir::new().expect("temp dir");
    let partial = temp.path().join("partial.json");
    fs::write(&partial, r#"{"a.js": {"path": "a.js", "s": {"0": 1}}}"#).expect("write");

    let err = merge_coverage_files(&[partial]).await.expect_err("parse fails");

    assert!(matches!(err, MergeError::Parse { .. }));
    assert!(err.to_string().contains("partial.json"));
}

#[tokio::test]
async fn merge_pipeline__unreadable_document__then_load_error_and_no_report() {
    let temp = TempDir::new().expect("temp dir");
    let good = write_document(temp.path(), "good.json", &[istanbul_record("a.js", 1..=1, 1..=1)]);
    let missing = temp.path().join("missing.json");
    let commit_dir = temp.path().join("commit");

    let err = app::run(config(&commit_dir, &[good, missing], None))
        .await
        .expect_err("missing document fails the run");

    assert!(matches!(err, MergeError::Load { .. }));
    assert!(err.to_string().contains("missing.json"));
    assert!(!commit_dir.join("coverage-merged.json").exists());
}

#[tokio::test]
async fn merge_coverage_files__malformed_document__then_parse_error() {
    let temp = TempDir::new().expect("temp dir");
    let broken = temp.path().join("broken.json");
    fs::write(&broken, "{ not json").expect("write");

    let err = merge_coverage_files(&[broken]).await.expect_err("parse fails");

    assert!(matches!(err, MergeError::Parse { .. }));
}

#[tokio::test]
async fn merge_pipeline__global_threshold_missed__then_violation_without_failure() {
    let temp = TempDir::new().expect("temp dir");
    let run = write_document(temp.path(), "run.json", &[istanbul_record("a.js", 1..=20, 1..=17)]);
    let manifest = temp.path().join("manifest.json");
    fs::write(
        &manifest,
        serde_json::to_vec(&json!({
            "removed_files": [],
            "all_files_executed": true,
            "coverage_threshold": {"lines": 90, "statements": 80}
        }))
        .expect("bytes"),
    )
    .expect("write manifest");

    let outcome = app::run(config(temp.path(), &[run], Some(manifest)))
        .await
        .expect("threshold violations do not fail the run");

    assert_eq!(outcome.violations.len(), 1);
    let message = outcome.violations[0].to_string();
    assert!(message.contains("lines"));
    assert!(message.contains("(85%)"));
    assert!(message.contains("global threshold (90%)"));
    assert!(outcome.report_path.exists());
}

#[tokio::test]
async fn merge_pipeline__perfile_threshold__then_violation_per_file() {
    let temp = TempDir::new().expect("temp dir");
    let run = write_document(
        temp.path(),
        "run.json",
        &[
            istanbul_record("a.js", 1..=4, 1..=4),
            istanbul_record("b.js", 1..=4, 1..=1),
        ],
    );
    let manifest = temp.path().join("manifest.json");
    fs::write(
        &manifest,
        r#"{"coverage_threshold": {"perfile": true, "lines": 50}}"#,
    )
    .expect("write manifest");

    let outcome = app::run(config(temp.path(), &[run], Some(manifest)))
        .await
        .expect("run succeeds");

    assert_eq!(outcome.violations.len(), 1);
    assert_eq!(outcome.violations[0].file.as_deref(), Some("b.js"));
    assert!(outcome.violations[0].to_string().ends_with("for b.js"));
}

#[tokio::test]
async fn merge_pipeline__manifest_without_thresholds__then_check_skipped() {
    let temp = TempDir::new().expect("temp dir");
    let run = write_document(temp.path(), "run.json", &[istanbul_record("a.js", 1..=4, 1..=1)]);
    let manifest = temp.path().join("manifest.json");
    fs::write(&manifest, r#"{"all_files_executed": true}"#).expect("write manifest");

    let outcome = app::run(config(temp.path(), &[run], Some(manifest)))
        .await
        .expect("run succeeds");

    assert!(outcome.violations.is_empty());
}
