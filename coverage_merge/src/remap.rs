//! Build-output to source path remapping

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

/// `packages/<name>/.../build/...`, matched greedily so the last `build`
/// segment under `packages/` is the one rewritten.
static BUILD_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.*packages/.*/)(build)(/.*)").expect("valid build segment pattern"));

/// Rewrite the `build` directory of a package path to `src`.
///
/// Paths outside `packages/<name>/build/` come back unchanged.
pub fn remap_path(path: &str) -> Cow<'_, str> {
    BUILD_SEGMENT.replacen(path, 1, "${1}src${3}")
}
