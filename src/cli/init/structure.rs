//! Project directory layout and scaffold files.

use anyhow::{Context, Result};
use std::{fs, path::Path};

/// Default asset directory layout.
const PROJECT_DIRS: &[&str] = &[
    "assets/sass",
    "assets/css",
    "assets/js/src",
    "assets/images/raw",
];

/// Create the asset directory layout at the given root.
///
/// The root directory is created if it doesn't exist.
pub fn create_structure(root: &Path) -> Result<()> {
    for dir in PROJECT_DIRS {
        let path = root.join(dir);
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create directory '{}'", path.display()))?;
    }
    Ok(())
}

/// Write `content` to `root/rel` unless the file already exists.
///
/// Returns whether the file was written.
pub fn write_if_absent(root: &Path, rel: &str, content: &str) -> Result<bool> {
    let path = root.join(rel);
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory '{}'", parent.display()))?;
    }
    fs::write(&path, content)
        .with_context(|| format!("Failed to write '{}'", path.display()))?;
    Ok(true)
}

/// Make sure `.gitignore` lists `pattern`, creating the file if needed.
///
/// Returns whether the file changed.
pub fn ensure_ignored(root: &Path, pattern: &str) -> Result<bool> {
    let path = root.join(".gitignore");
    let existing = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read '{}'", path.display()));
        }
    };

    if existing.lines().any(|line| line.trim() == pattern) {
        return Ok(false);
    }

    let mut content = existing;
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(pattern);
    content.push('\n');

    fs::write(&path, content).with_context(|| format!("Failed to write '{}'", path.display()))?;
    Ok(true)
}
