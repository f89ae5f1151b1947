//! Source-map transformation
//!
//! Records that carry an `inputSourceMap` describe generated code. Each of
//! their statement, function and branch locations is looked up in the map
//! and re-filed under the original source it came from. Records without a
//! map pass through untouched.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use sourcemap::SourceMap;
use tracing::{debug, warn};

use crate::coverage::{BranchMapping, FileCoverage, FunctionMapping, Position, Range};
use crate::merger::{CoverageMap, CoverageMerger};

/// Rewrite every mapped record onto its original sources and merge the
/// results with the records that had no source map.
pub fn transform_coverage(map: CoverageMap) -> CoverageMap {
    let mut merger = CoverageMerger::new();
    for record in map.into_records() {
        let parsed = record
            .input_source_map
            .as_ref()
            .map(|raw_map| MappedSource::parse(&record.path, raw_map));
        match parsed {
            None => merger.merge_record(record),
            Some(Ok(source_map)) => {
                let transformed = source_map.transform(&record);
                debug!(
                    path = %record.path,
                    sources = transformed.len(),
                    "Applied input source map",
                );
                for mapped in transformed {
                    merger.merge_record(mapped);
                }
            }
            Some(Err(err)) => {
                warn!(path = %record.path, "Ignoring unreadable input source map: {err}");
                merger.merge_record(record);
            }
        }
    }
    merger.finalize()
}

struct MappedSource {
    map: SourceMap,
    /// Directory relative sources resolve against
    base: PathBuf,
}

impl MappedSource {
    fn parse(generated_path: &str, raw_map: &serde_json::Value) -> Result<Self, sourcemap::Error> {
        let mut raw_map = raw_map.clone();
        let source_root = raw_map
            .as_object_mut()
            .and_then(|object| object.remove("sourceRoot"))
            .and_then(|root| root.as_str().map(str::to_string))
            .unwrap_or_default();
        let map = SourceMap::from_slice(raw_map.to_string().as_bytes())?;

        let generated_dir = Path::new(generated_path)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(Self {
            map,
            base: generated_dir.join(source_root),
        })
    }

    /// Original position for a generated one. Lines are 1-based on both
    /// sides, columns 0-based.
    fn original_position(&self, position: Position) -> Option<(&str, Position)> {
        let line = position.line.checked_sub(1)?;
        let token = self
            .map
            .lookup_token(line, position.column.unwrap_or(0))
            .filter(|token| token.get_dst_line() == line)?;
        let source = token.get_source()?;
        Some((
            source,
            Position {
                line: token.get_src_line() + 1,
                column: Some(token.get_src_col()),
            },
        ))
    }

    /// Map both ends of a range; they must land in the same source.
    fn original_range(&self, range: &Range) -> Option<(String, Range)> {
        let (source, start) = self.original_position(range.start)?;
        let end_lookup = Position {
            line: range.end.line,
            column: range.end.column.map(|column| column.saturating_sub(1)),
        };
        let (end_source, mut end) = self.original_position(end_lookup)?;
        if end_source != source || end.line < start.line {
            return None;
        }
        if end.line == start.line && end.column < start.column {
            end.column = start.column;
        }
        Some((
            self.resolve(source),
            Range {
                start,
                end,
                skip: range.skip,
            },
        ))
    }

    fn resolve(&self, source: &str) -> String {
        normalize(&self.base.join(source))
    }

    fn transform(&self, record: &FileCoverage) -> Vec<FileCoverage> {
        let mut outputs: BTreeMap<String, SourceRecord> = BTreeMap::new();

        for (key, range) in &record.statement_map {
            let Some((path, mapped)) = self.original_range(range) else {
                continue;
            };
            let hits = record.s.get(key).copied().unwrap_or(0);
            outputs
                .entry(path.clone())
                .or_insert_with(|| SourceRecord::new(path))
                .add_statement(mapped, hits);
        }

        for (key, mapping) in &record.fn_map {
            let Some(loc) = mapping.loc.or(mapping.decl) else {
                continue;
            };
            let Some((path, loc)) = self.original_range(&loc) else {
                continue;
            };
            let decl = mapping
                .decl
                .and_then(|decl| self.original_range(&decl))
                .filter(|(decl_path, _)| *decl_path == path)
                .map_or(loc, |(_, decl)| decl);
            let hits = record.f.get(key).copied().unwrap_or(0);
            outputs
                .entry(path.clone())
                .or_insert_with(|| SourceRecord::new(path))
                .add_function(
                    FunctionMapping {
                        name: mapping.name.clone(),
                        decl: Some(decl),
                        loc: Some(loc),
                        line: Some(loc.start.line),
                        skip: mapping.skip,
                    },
                    hits,
                );
        }

        for (key, mapping) in &record.branch_map {
            let Some((path, locations)) = self.original_locations(&mapping.locations) else {
                continue;
            };
            let loc = mapping
                .loc
                .and_then(|loc| self.original_range(&loc))
                .filter(|(loc_path, _)| *loc_path == path)
                .map(|(_, loc)| loc)
                .or_else(|| locations.first().copied());
            let hits = record.b.get(key).cloned().unwrap_or_default();
            let true_hits = record
                .b_t
                .as_ref()
                .map(|b_t| b_t.get(key).cloned().unwrap_or_default());
            outputs
                .entry(path.clone())
                .or_insert_with(|| SourceRecord::new(path))
                .add_branch(
                    BranchMapping {
                        loc,
                        kind: mapping.kind.clone(),
                        line: loc.map(|loc| loc.start.line),
                        locations,
                    },
                    hits,
                    true_hits,
                );
        }

        outputs.into_values().map(|output| output.record).collect()
    }

    /// Every location of a branch must map, and into a single source.
    fn original_locations(&self, locations: &[Range]) -> Option<(String, Vec<Range>)> {
        let mut path = None;
        let mut mapped = Vec::with_capacity(locations.len());
        for location in locations {
            let (location_path, range) = self.original_range(location)?;
            match &path {
                Some(existing) if *existing != location_path => return None,
                Some(_) => {}
                None => path = Some(location_path),
            }
            mapped.push(range);
        }
        path.map(|path| (path, mapped))
    }
}

/// A record being built for one original source. Entries that map onto the
/// same original location share an index and their hits add up.
struct SourceRecord {
    record: FileCoverage,
    statements: BTreeMap<(u32, Option<u32>, u32, Option<u32>), String>,
    functions: BTreeMap<(String, u32, Option<u32>), String>,
}

impl SourceRecord {
    fn new(path: String) -> Self {
        Self {
            record: FileCoverage::new(path),
            statements: BTreeMap::new(),
            functions: BTreeMap::new(),
        }
    }

    fn add_statement(&mut self, range: Range, hits: u64) {
        let location = (range.start.line, range.start.column, range.end.line, range.end.column);
        let next = self.record.statement_map.len().to_string();
        let key = self.statements.entry(location).or_insert(next).clone();
        self.record.statement_map.entry(key.clone()).or_insert(range);
        *self.record.s.entry(key).or_insert(0) += hits;
    }

    fn add_function(&mut self, mapping: FunctionMapping, hits: u64) {
        let Some(loc) = mapping.loc else {
            return;
        };
        let identity = (mapping.name.clone(), loc.start.line, loc.start.column);
        let next = self.record.fn_map.len().to_string();
        let key = self.functions.entry(identity).or_insert(next).clone();
        self.record.fn_map.entry(key.clone()).or_insert(mapping);
        *self.record.f.entry(key).or_insert(0) += hits;
    }

    fn add_branch(&mut self, mapping: BranchMapping, hits: Vec<u64>, true_hits: Option<Vec<u64>>) {
        let key = self.record.branch_map.len().to_string();
        self.record.branch_map.insert(key.clone(), mapping);
        self.record.b.insert(key.clone(), hits);
        if let Some(true_hits) = true_hits {
            self.record
                .b_t
                .get_or_insert_with(BTreeMap::new)
                .insert(key, true_hits);
        }
    }
}

/// Lexically fold `.` and `..` out of a path.
fn normalize(path: &Path) -> String {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized.to_string_lossy().into_owned()
}
