//! Vault path helpers. Paths are `/`-separated and relative to the vault root;
//! the last segment of a document path is its leaf name and everything before
//! it is the directory.

pub const SEPARATOR: char = '/';

/// Normalizes separators: `\` becomes `/`, empty and `.` segments are dropped,
/// so there is no leading or trailing separator.
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/")
        .split(SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Directory part of a normalized document path; empty for root-level documents.
pub fn directory_of(path: &str) -> &str {
    match path.rsplit_once(SEPARATOR) {
        Some((dir, _)) => dir,
        None => "",
    }
}

/// Directory segments of a normalized document path, root first.
pub fn directory_segments(path: &str) -> Vec<&str> {
    segments(directory_of(path))
}

pub fn segments(dir: &str) -> Vec<&str> {
    dir.split(SEPARATOR).filter(|s| !s.is_empty()).collect()
}

/// `dir` equals `ancestor` or lies below it. An empty ancestor never matches.
pub fn is_same_or_descendant(dir: &str, ancestor: &str) -> bool {
    !ancestor.is_empty() && (dir == ancestor || is_strict_descendant(dir, ancestor))
}

pub fn is_strict_descendant(dir: &str, ancestor: &str) -> bool {
    !ancestor.is_empty()
        && dir.len() > ancestor.len()
        && dir.starts_with(ancestor)
        && dir[ancestor.len()..].starts_with(SEPARATOR)
}

/// Replaces the `from` prefix of `path` with `to`, keeping the remainder.
/// Returns `None` when `path` is not `from` or below it.
pub fn rebase(path: &str, from: &str, to: &str) -> Option<String> {
    if path == from {
        return Some(to.to_string());
    }
    if !is_strict_descendant(path, from) {
        return None;
    }
    let rest = &path[from.len() + 1..];
    if to.is_empty() {
        Some(rest.to_string())
    } else {
        Some(format!("{to}{SEPARATOR}{rest}"))
    }
}
