//! `[watch]` section configuration.
//!
//! Each list holds glob patterns (relative to the project root) that trigger
//! a stage when a matching file changes during `brisk dev`.
//!
//! ```toml
//! [watch]
//! styles = ["./assets/sass/**/*.scss"]   # styles stage, then CSS inject
//! scripts = ["./assets/js/src/**/*"]     # scripts stage, then reload
//! reload = ["./**/*.php"]                # reload only
//! images = []                            # images stage, then reload
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::source::SourceGlob;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub styles: Vec<String>,
    pub scripts: Vec<String>,
    pub reload: Vec<String>,
    pub images: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            styles: vec!["./assets/sass/**/*.scss".into()],
            scripts: vec!["./assets/js/src/**/*".into()],
            reload: vec!["./**/*.php".into()],
            images: Vec::new(),
        }
    }
}

impl WatchConfig {
    pub(crate) fn validate(&self, root: &Path, diag: &mut ConfigDiagnostics) {
        let lists = [
            (FieldPath::new("watch.styles"), &self.styles),
            (FieldPath::new("watch.scripts"), &self.scripts),
            (FieldPath::new("watch.reload"), &self.reload),
            (FieldPath::new("watch.images"), &self.images),
        ];

        for (field, patterns) in lists {
            for pattern in patterns {
                if let Err(e) = SourceGlob::new(root, pattern) {
                    diag.error(field, format!("{e}: {}", e.source));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_watch_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.watch.styles, vec!["./assets/sass/**/*.scss"]);
        assert_eq!(config.watch.reload, vec!["./**/*.php"]);
        assert!(config.watch.images.is_empty());
    }

    #[test]
    fn test_watch_override() {
        let config = test_parse_config("[watch]\nreload = [\"./**/*.php\", \"./**/*.twig\"]\nimages = [\"./assets/images/raw/**/*\"]");
        assert_eq!(config.watch.reload.len(), 2);
        assert_eq!(config.watch.images.len(), 1);
        // untouched lists keep their defaults
        assert_eq!(config.watch.scripts, vec!["./assets/js/src/**/*"]);
    }
}
