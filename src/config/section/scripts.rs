//! `[scripts]` section configuration.
//!
//! ```toml
//! [scripts]
//! source = "./assets/js/src/**/*"   # Files to concatenate (sorted by path)
//! destination = "./assets/js/"      # Output directory
//! file = "scripts"                  # Output name, without extension
//! minify = false                    # Also write <file>.min.js
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::source::SourceGlob;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    pub source: String,
    pub destination: PathBuf,
    pub file: String,
    pub minify: bool,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            source: "./assets/js/src/**/*".into(),
            destination: "./assets/js/".into(),
            file: "scripts".into(),
            minify: false,
        }
    }
}

impl ScriptsConfig {
    const FILE: FieldPath = FieldPath::new("scripts.file");
    const SOURCE: FieldPath = FieldPath::new("scripts.source");

    /// Output name without a trailing `.js`.
    fn stem(&self) -> &str {
        self.file.strip_suffix(".js").unwrap_or(&self.file)
    }

    /// Path of the concatenated bundle.
    pub fn output_js(&self) -> PathBuf {
        self.destination.join(format!("{}.js", self.stem()))
    }

    /// Path of the minified bundle.
    pub fn output_min_js(&self) -> PathBuf {
        self.destination.join(format!("{}.min.js", self.stem()))
    }

    pub(crate) fn normalize(&mut self, root: &Path) {
        self.destination = super::resolve(root, &self.destination);
    }

    pub(crate) fn validate(&self, root: &Path, diag: &mut ConfigDiagnostics) {
        if self.stem().trim().is_empty() {
            diag.error_with_hint(Self::FILE, "must not be empty", "use a bare name such as \"scripts\"");
        } else if self.file.contains(['/', '\\']) {
            diag.error(Self::FILE, "must be a file name, not a path");
        }

        if let Err(e) = SourceGlob::new(root, &self.source) {
            diag.error(Self::SOURCE, format!("{e}: {}", e.source));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;
    use std::path::PathBuf;

    #[test]
    fn test_scripts_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.scripts.source, "./assets/js/src/**/*");
        assert_eq!(config.scripts.output_js(), PathBuf::from("./assets/js/scripts.js"));
        assert_eq!(
            config.scripts.output_min_js(),
            PathBuf::from("./assets/js/scripts.min.js")
        );
    }

    #[test]
    fn test_file_with_extension() {
        let config = test_parse_config("[scripts]\nfile = \"bundle.js\"\ndestination = \"js\"");
        assert_eq!(config.scripts.output_js(), PathBuf::from("js/bundle.js"));
    }
}
