//! `[styles]` section configuration.
//!
//! ```toml
//! [styles]
//! entry = "./assets/sass/layout.scss"   # Sass entry stylesheet
//! destination = "./assets/css/"         # Output directory
//! load_paths = []                       # Extra @use/@import roots
//! browsers = ["last 2 version", "> 1%"] # Vendor-prefix targets (browserslist)
//! merge_media_queries = true            # Collapse identical @media blocks
//! source_map = true                     # Write <name>.css.map
//! minify = false                        # Also write <name>.min.css
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use lightningcss::targets::Browsers;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Browserslist queries the theme has always been prefixed for.
pub const DEFAULT_BROWSERS: &[&str] = &[
    "last 2 version",
    "> 1%",
    "ie >= 9",
    "ie_mob >= 10",
    "ff >= 30",
    "chrome >= 34",
    "safari >= 7",
    "opera >= 23",
    "ios >= 7",
    "android >= 4",
    "bb >= 10",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylesConfig {
    pub entry: PathBuf,
    pub destination: PathBuf,
    pub load_paths: Vec<PathBuf>,
    pub browsers: Vec<String>,
    pub merge_media_queries: bool,
    pub source_map: bool,
    pub minify: bool,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            entry: "./assets/sass/layout.scss".into(),
            destination: "./assets/css/".into(),
            load_paths: Vec::new(),
            browsers: DEFAULT_BROWSERS.iter().map(|s| (*s).to_string()).collect(),
            merge_media_queries: true,
            source_map: true,
            minify: false,
        }
    }
}

impl StylesConfig {
    const BROWSERS: FieldPath = FieldPath::new("styles.browsers");
    const ENTRY: FieldPath = FieldPath::new("styles.entry");

    /// Output file stem, taken from the entry (`layout.scss` -> `layout`).
    pub fn output_stem(&self) -> String {
        self.entry
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "style".to_string())
    }

    /// Path of the compiled stylesheet.
    pub fn output_css(&self) -> PathBuf {
        self.destination.join(format!("{}.css", self.output_stem()))
    }

    pub(crate) fn normalize(&mut self, root: &Path) {
        self.entry = super::resolve(root, &self.entry);
        self.destination = super::resolve(root, &self.destination);
        self.load_paths = self
            .load_paths
            .iter()
            .map(|p| super::resolve(root, p))
            .collect();
    }

    pub(crate) fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.entry.file_name().is_none() {
            diag.error(Self::ENTRY, "must name a stylesheet file");
        }

        if let Err(e) = Browsers::from_browserslist(self.browsers.iter().map(String::as_str)) {
            diag.error_with_hint(
                Self::BROWSERS,
                format!("invalid browserslist query: {e}"),
                "see https://browsersl.ist for the query syntax",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;
    use std::path::PathBuf;

    #[test]
    fn test_styles_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.styles.entry, PathBuf::from("./assets/sass/layout.scss"));
        assert_eq!(config.styles.browsers.len(), 11);
        assert!(config.styles.merge_media_queries);
        assert!(config.styles.source_map);
        assert!(!config.styles.minify);
    }

    #[test]
    fn test_styles_override() {
        let config = test_parse_config(
            "[styles]\nentry = \"scss/main.scss\"\nminify = true\nbrowsers = [\"defaults\"]",
        );
        assert_eq!(config.styles.output_stem(), "main");
        assert!(config.styles.minify);
        assert_eq!(config.styles.browsers, vec!["defaults".to_string()]);
    }

    #[test]
    fn test_output_css() {
        let config = test_parse_config("[styles]\ndestination = \"css\"");
        assert_eq!(config.styles.output_css(), PathBuf::from("css/layout.css"));
    }
}
