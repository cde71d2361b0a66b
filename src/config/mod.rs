//! Project configuration management for `brisk.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # One file per [section]
//! ├── types/         # ConfigError, ConfigDiagnostics, FieldPath, ConfigHandle
//! ├── util.rs        # Config file discovery
//! └── mod.rs         # ProjectConfig (this file)
//! ```
//!
//! The config is loaded once, validated, then shared as `Arc<ProjectConfig>`.
//! Watch mode holds it in a [`ConfigHandle`] so edits to `brisk.toml` are
//! picked up without a restart.

pub mod section;
pub mod types;
mod util;

pub use section::{
    ImagesConfig, LineEnding, OutputConfig, ScriptsConfig, ServeConfig, StylesConfig, WatchConfig,
};
pub use types::{ConfigDiagnostics, ConfigError, ConfigHandle, FieldPath};

use crate::cli::{Cli, Commands, DevArgs};
use crate::log;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use util::find_config_file;

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing `brisk.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Dev server overrides from the command line, re-applied on reload
    #[serde(skip)]
    overrides: Option<DevArgs>,

    pub styles: StylesConfig,
    pub scripts: ScriptsConfig,
    pub images: ImagesConfig,
    pub output: OutputConfig,
    pub watch: WatchConfig,
    pub serve: ServeConfig,
}

impl ProjectConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file; the project root is its
    /// parent directory. Without a config file the defaults apply, rooted at
    /// the current directory.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match find_config_file(&cli.config) {
            Some(path) => Self::from_path(&path)?,
            None => {
                let cwd = std::env::current_dir()
                    .context("Failed to get current working directory")?;
                log!(
                    "config";
                    "no {} found, using defaults (run `brisk init` to create one)",
                    cli.config.display()
                );
                let mut config = Self::default();
                config.finalize(&cwd.join(&cli.config));
                config.validate()?;
                config
            }
        };

        if let Commands::Dev { args } = cli.command() {
            config.overrides = Some(args);
            config.apply_overrides();
            // `--proxy` bypassed the file validation
            config.validate()?;
        }

        Ok(config)
    }

    /// Load, normalize and validate configuration from a file path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        config.finalize(path);
        config.validate()?;
        Ok(config)
    }

    /// Re-read the config file, keeping the command-line overrides.
    pub fn reloaded(&self) -> Result<Self> {
        let mut next = Self::from_path(&self.config_path)?;
        next.overrides = self.overrides.clone();
        next.apply_overrides();
        Ok(next)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {field}");
        }
    }

    /// Set internal paths and make every configured path absolute.
    fn finalize(&mut self, config_path: &Path) {
        let config_path = crate::utils::path::normalize_path(config_path);
        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        self.styles.normalize(&root);
        self.scripts.normalize(&root);
        self.images.normalize(&root);

        self.config_path = config_path;
        self.root = root;
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply `dev` command-line options over the file values.
    fn apply_overrides(&mut self) {
        let Some(args) = self.overrides.clone() else {
            return;
        };
        Self::update_option(&mut self.serve.interface, args.interface.as_ref());
        Self::update_option(&mut self.serve.port, args.port.as_ref());
        if args.proxy.is_some() {
            self.serve.proxy = args.proxy;
        }
        if args.no_open {
            self.serve.open = false;
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // accessors
    // ========================================================================

    /// Get path relative to the project root
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    /// Files written by the text stages; watch rules never treat them as
    /// sources.
    pub fn derived_outputs(&self) -> Vec<PathBuf> {
        let css = self.styles.output_css();
        let mut outputs = vec![
            css.with_extension("css.map"),
            css.with_extension("min.css"),
            css,
            self.scripts.output_js(),
            self.scripts.output_min_js(),
        ];
        outputs.sort();
        outputs
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration, collecting all errors and returning them at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.styles.validate(&mut diag);
        self.scripts.validate(&self.root, &mut diag);
        self.images.validate(&self.root, &mut diag);
        self.watch.validate(&self.root, &mut diag);
        self.serve.validate(&mut diag);

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config content without normalizing paths.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ProjectConfig {
    let (parsed, ignored) = ProjectConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Write `content` as `brisk.toml` into `root` and load it.
#[cfg(test)]
pub fn test_project_config(root: &Path, content: &str) -> ProjectConfig {
    let path = root.join("brisk.toml");
    fs::write(&path, content).unwrap();
    ProjectConfig::from_path(&path).unwrap()
}

// ============================================================================
// tests
// ============================================================================
