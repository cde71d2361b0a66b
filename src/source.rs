//! Source locator: resolves glob patterns to file sets.
//!
//! A pattern such as `./assets/js/src/**/*` is split into a literal *base*
//! directory (`<root>/assets/js/src`) and a glob (`**/*`) matched against
//! paths relative to that base. Matched files keep their base-relative path,
//! which is how the image stage mirrors the raw tree under its destination.
//!
//! Supported syntax is `globset`'s: `*`, `?`, `**`, `[...]` and `{a,b}`.
//! `*` never crosses a `/`. Dot-files are skipped when walking.

use globset::{GlobBuilder, GlobMatcher};
use jwalk::WalkDir;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// A glob pattern failed to compile.
#[derive(Debug, Error)]
#[error("invalid glob `{pattern}`")]
pub struct GlobError {
    pub pattern: String,
    #[source]
    pub source: globset::Error,
}

/// A compiled glob anchored at its literal base directory.
#[derive(Debug, Clone)]
pub struct SourceGlob {
    pattern: String,
    base: PathBuf,
    matcher: GlobMatcher,
}

/// A file matched by a [`SourceGlob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Path relative to the glob base.
    pub relative: PathBuf,
}

impl SourceGlob {
    /// Compile `pattern`, resolving a relative base against `root`.
    pub fn new(root: &Path, pattern: &str) -> Result<Self, GlobError> {
        let (base, rest) = split_base(pattern);
        let matcher = GlobBuilder::new(&rest)
            .literal_separator(true)
            .build()
            .map_err(|source| GlobError {
                pattern: pattern.to_string(),
                source,
            })?
            .compile_matcher();

        Ok(Self {
            pattern: pattern.to_string(),
            base: crate::utils::path::clean(&root.join(base)),
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Literal directory prefix of the pattern.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Whether an absolute path is matched by this glob.
    pub fn is_match(&self, path: &Path) -> bool {
        path.strip_prefix(&self.base)
            .is_ok_and(|relative| self.matcher.is_match(relative))
    }

    /// Walk the base directory and return every matching file, sorted by
    /// relative path. A missing base yields an empty set.
    pub fn resolve(&self) -> Vec<SourceFile> {
        if !self.base.is_dir() {
            return Vec::new();
        }

        let mut files: Vec<_> = WalkDir::new(&self.base)
            .skip_hidden(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let path = entry.path();
                let relative = path.strip_prefix(&self.base).ok()?.to_path_buf();
                self.matcher.is_match(&relative).then_some(SourceFile { path, relative })
            })
            .collect();

        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        files
    }
}

/// Split a pattern into its literal directory prefix and the glob remainder.
///
/// A pattern without metacharacters names a single file: its parent is the
/// base and the file name is the glob.
fn split_base(pattern: &str) -> (PathBuf, String) {
    let components: Vec<&str> = pattern.split('/').collect();
    let first_glob = components.iter().position(|c| is_glob_component(c));

    let split_at = match first_glob {
        Some(index) => index,
        None => components.len().saturating_sub(1),
    };

    let mut base = PathBuf::new();
    for (i, component) in components[..split_at].iter().enumerate() {
        match *component {
            // Leading empty component means an absolute pattern.
            "" if i == 0 => base.push(Component::RootDir.as_os_str()),
            "" | "." => {}
            other => base.push(other),
        }
    }

    let rest = components[split_at..]
        .iter()
        .filter(|c| !c.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");

    (base, rest)
}

fn is_glob_component(component: &str) -> bool {
    component.contains(['*', '?', '[', '{'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel).unwrap();
    }

    #[test]
    fn test_split_base_recursive() {
        let (base, rest) = split_base("./assets/js/src/**/*");
        assert_eq!(base, PathBuf::from("assets/js/src"));
        assert_eq!(rest, "**/*");
    }

    #[test]
    fn test_split_base_braces() {
        let (base, rest) = split_base("./assets/images/raw/**/*.{png,jpg,jpeg,gif,svg}");
        assert_eq!(base, PathBuf::from("assets/images/raw"));
        assert_eq!(rest, "**/*.{png,jpg,jpeg,gif,svg}");
    }

    #[test]
    fn test_split_base_literal_file() {
        let (base, rest) = split_base("./assets/sass/layout.scss");
        assert_eq!(base, PathBuf::from("assets/sass"));
        assert_eq!(rest, "layout.scss");
    }

    #[test]
    fn test_split_base_whole_tree() {
        let (base, rest) = split_base("./**/*.php");
        assert_eq!(base, PathBuf::new());
        assert_eq!(rest, "**/*.php");
    }

    #[test]
    fn test_split_base_absolute() {
        let (base, rest) = split_base("/srv/theme/*.php");
        assert_eq!(base, PathBuf::from("/srv/theme"));
        assert_eq!(rest, "*.php");
    }

    #[test]
    fn test_is_match() {
        let glob = SourceGlob::new(Path::new("/p"), "./assets/sass/**/*.scss").unwrap();
        assert!(glob.is_match(Path::new("/p/assets/sass/layout.scss")));
        assert!(glob.is_match(Path::new("/p/assets/sass/parts/_nav.scss")));
        assert!(!glob.is_match(Path::new("/p/assets/css/layout.css")));
        assert!(!glob.is_match(Path::new("/p/assets/sass/readme.md")));
    }

    #[test]
    fn test_star_does_not_cross_directories() {
        let glob = SourceGlob::new(Path::new("/p"), "./*.php").unwrap();
        assert!(glob.is_match(Path::new("/p/index.php")));
        assert!(!glob.is_match(Path::new("/p/templates/page.php")));
    }

    #[test]
    fn test_invalid_glob() {
        let err = SourceGlob::new(Path::new("/p"), "./assets/{js").unwrap_err();
        assert_eq!(err.pattern, "./assets/{js");
    }

    #[test]
    fn test_resolve_sorted_relative() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "assets/js/src/vendor/flickity.js");
        touch(dir.path(), "assets/js/src/main.js");
        touch(dir.path(), "assets/js/src/a.js");
        touch(dir.path(), "assets/js/src/.hidden.js");

        let glob = SourceGlob::new(dir.path(), "./assets/js/src/**/*").unwrap();
        let files: Vec<_> = glob.resolve().into_iter().map(|f| f.relative).collect();

        assert_eq!(
            files,
            vec![
                PathBuf::from("a.js"),
                PathBuf::from("main.js"),
                PathBuf::from("vendor/flickity.js"),
            ]
        );
    }

    #[test]
    fn test_resolve_extension_filter() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "raw/logo.png");
        touch(dir.path(), "raw/icons/arrow.svg");
        touch(dir.path(), "raw/notes.txt");

        let glob = SourceGlob::new(dir.path(), "./raw/**/*.{png,svg}").unwrap();
        let files: Vec<_> = glob.resolve().into_iter().map(|f| f.relative).collect();

        assert_eq!(files, vec![PathBuf::from("icons/arrow.svg"), PathBuf::from("logo.png")]);
    }

    #[test]
    fn test_resolve_missing_base() {
        let dir = TempDir::new().unwrap();
        let glob = SourceGlob::new(dir.path(), "./nothing/**/*").unwrap();
        assert!(glob.resolve().is_empty());
    }
}
