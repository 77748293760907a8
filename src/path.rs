//! Path composer (C3): lexical join of the document root with a request
//! path, plus the lexical `..`/`.` rejection the spec's Design Notes call
//! for (see SPEC_FULL.md §4.3 REDESIGN decision).

use crate::error::PipelineError;
use std::path::{Component, Path, PathBuf};

/// Matches the original source's `PATH_MAX` bound on composed paths.
pub const PATH_MAX_BOUND: usize = 4096;

/// Joins `document_root` (must end with `/`) and `request_path` (must begin
/// with `/`) with exactly one separating slash, then lexically resolves
/// `.`/`..` components. Returns `NotFound` if the normalized result would
/// escape `document_root`, and `UriTooLong` if the composed path is too
/// long — matching the spec's two distinct failure codes for this step.
pub fn compose(document_root: &str, request_path: &str) -> Result<PathBuf, PipelineError> {
    debug_assert!(document_root.ends_with('/'));
    debug_assert!(request_path.starts_with('/'));

    let joined = format!("{document_root}{}", &request_path[1..]);
    if joined.len() >= PATH_MAX_BOUND {
        return Err(PipelineError::UriTooLong);
    }

    let root_normalized = normalize(Path::new(document_root));
    let candidate_normalized = normalize(Path::new(&joined));

    if !candidate_normalized.starts_with(&root_normalized) {
        return Err(PipelineError::NotFound);
    }

    Ok(candidate_normalized)
}

/// Lexically collapses `.` and `..` components without touching the
/// filesystem (no symlink resolution). A leading `..` that would climb
/// above the path's own root is dropped rather than producing `../..`,
/// since both operands here are always absolute.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}
