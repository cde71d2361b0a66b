//! URL to filesystem path resolution for static mode.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Resolve a request URL to a file under `root`.
///
/// Directories resolve to their `index.html`. Paths that escape the root
/// (via `..` or symlinks) or touch a dot-directory such as `.git` are refused.
pub fn resolve_path(url: &str, root: &Path) -> Option<PathBuf> {
    let relative = url_to_relative(url)?;

    let canonical = root.join(&relative).canonicalize().ok()?;
    let root_canonical = root.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    if canonical.is_dir() {
        let index = canonical.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    }

    None
}

/// Decode the path part of `url` into a root-relative path.
fn url_to_relative(url: &str) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode_str(path).decode_utf8().ok()?;

    let mut relative = PathBuf::new();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(name) if name.to_string_lossy().starts_with('.') => return None,
            Component::Normal(name) => relative.push(name),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(relative)
}
