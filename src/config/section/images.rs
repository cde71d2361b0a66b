//! `[images]` section configuration.
//!
//! ```toml
//! [images]
//! source = "./assets/images/raw/**/*.{png,jpg,jpeg,gif,svg}"
//! destination = "./assets/images/"
//! optimization_level = 3   # oxipng preset, 0..=6
//! jpeg_quality = 85        # 1..=100
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::source::SourceGlob;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub source: String,
    pub destination: PathBuf,
    pub optimization_level: u8,
    pub jpeg_quality: u8,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            source: "./assets/images/raw/**/*.{png,jpg,jpeg,gif,svg}".into(),
            destination: "./assets/images/".into(),
            optimization_level: 3,
            jpeg_quality: 85,
        }
    }
}

impl ImagesConfig {
    const SOURCE: FieldPath = FieldPath::new("images.source");
    const DESTINATION: FieldPath = FieldPath::new("images.destination");
    const LEVEL: FieldPath = FieldPath::new("images.optimization_level");
    const QUALITY: FieldPath = FieldPath::new("images.jpeg_quality");

    /// Settings that change optimizer output, as stored in the image cache.
    pub fn fingerprint(&self) -> String {
        format!("png={};jpeg={}", self.optimization_level, self.jpeg_quality)
    }

    pub(crate) fn normalize(&mut self, root: &Path) {
        self.destination = super::resolve(root, &self.destination);
    }

    pub(crate) fn validate(&self, root: &Path, diag: &mut ConfigDiagnostics) {
        if self.optimization_level > 6 {
            diag.error(Self::LEVEL, "must be between 0 and 6");
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            diag.error(Self::QUALITY, "must be between 1 and 100");
        }

        match SourceGlob::new(root, &self.source) {
            Ok(glob) if self.destination.starts_with(glob.base()) => {
                diag.error_with_hint(
                    Self::DESTINATION,
                    "must be outside the raw image directory",
                    "optimized images would be read back as sources on the next run",
                );
            }
            Ok(_) => {}
            Err(e) => diag.error(Self::SOURCE, format!("{e}: {}", e.source)),
        }
    }
}
