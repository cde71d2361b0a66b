//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from current directory.
///
/// ```text
/// /home/user/theme/assets/sass/  ← cwd
/// /home/user/theme/brisk.toml    ← found!
/// ```
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_from(&cwd, config_name)
}

/// Walk up from `start` until `config_name` exists.
fn find_config_from(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    start
        .ancestors()
        .map(|dir| dir.join(config_name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_parent() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("assets/sass");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("brisk.toml"), "").unwrap();

        let found = find_config_from(&nested, Path::new("brisk.toml")).unwrap();
        assert_eq!(found, dir.path().join("brisk.toml"));
    }

    #[test]
    fn test_find_config_absolute() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        assert!(find_config_from(dir.path(), &path).is_none());

        fs::write(&path, "").unwrap();
        assert_eq!(find_config_from(Path::new("/"), &path), Some(path));
    }

    #[test]
    fn test_directory_named_like_config_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("brisk-nested.toml")).unwrap();
        assert!(find_config_from(dir.path(), Path::new("brisk-nested.toml")).is_none());
    }
}
