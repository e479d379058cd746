//! Path decomposition for the flat path-keyed table.
//!
//! Paths are absolute `/`-separated strings and are the only identity an
//! entry has. Parent and tail are derived by string decomposition.

use crate::error::{FsError, FsResult};

pub const ROOT: &str = "/";
pub const SEPARATOR: char = '/';

/// Reject anything that is not a canonical absolute path.
pub fn validate(path: &str) -> FsResult<()> {
    if path == ROOT {
        return Ok(());
    }
    let Some(rest) = path.strip_prefix(SEPARATOR) else {
        return Err(FsError::InvalidPath(path.to_string()));
    };
    let bad_segment = rest
        .split(SEPARATOR)
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad_segment {
        return Err(FsError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Parent of `path`. Children of the root have parent `/`; the root is its
/// own parent so the function stays total.
pub fn parent_of(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(0) | None => ROOT,
        Some(idx) => &path[..idx],
    }
}

/// Final segment of `path`; empty for the root.
pub fn tail_of(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Append a single segment to a directory path.
pub fn join(parent: &str, name: &str) -> String {
    if parent == ROOT {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// True when `path` equals `ancestor` or lies beneath it. The match is
/// segment-delimited, so `/data` does not contain `/database`.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    if ancestor == ROOT {
        return path.starts_with(SEPARATOR);
    }
    match path.strip_prefix(ancestor) {
        Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
        None => false,
    }
}

/// Move `path` from under `from` to under `to`. `path` must satisfy
/// `is_within(path, from)`.
pub fn rebase(path: &str, from: &str, to: &str) -> String {
    let rest = &path[from.len()..];
    if rest.is_empty() {
        to.to_string()
    } else if to == ROOT {
        rest.to_string()
    } else {
        format!("{to}{rest}")
    }
}
