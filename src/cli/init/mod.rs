//! Project initialization.
//!
//! Scaffolds the asset layout, a default `brisk.toml`, an entry stylesheet
//! and the page script. Files that already exist are left untouched, so
//! `brisk init` is safe to run inside an existing theme.

mod structure;

use crate::embed::init::{CONFIG_TOML, LAYOUT_SCSS, PAGE_JS, PageVars};
use crate::freshness::STATE_DIR;
use crate::{debug, log};
use anyhow::Result;
use std::path::Path;

/// Scaffold a project at `root`, writing the config as `config_name`.
pub fn new_project(root: &Path, config_name: &Path) -> Result<()> {
    structure::create_structure(root)?;

    let files = [
        (config_name.to_string_lossy().into_owned(), CONFIG_TOML.render(&())),
        ("assets/sass/layout.scss".to_string(), LAYOUT_SCSS.render(&())),
        ("assets/js/src/main.js".to_string(), PAGE_JS.render(&PageVars::default())),
    ];

    let mut written = 0;
    for (rel, content) in &files {
        if structure::write_if_absent(root, rel, content)? {
            debug!("init"; "created {}", rel);
            written += 1;
        } else {
            log!("init"; "keeping existing {}", rel);
        }
    }

    if structure::ensure_ignored(root, &format!("/{STATE_DIR}/"))? {
        debug!("init"; "updated .gitignore");
    }

    log!(
        "init";
        "project ready at {} ({})",
        root.display(),
        crate::utils::plural_count(written, "file")
    );
    Ok(())
}
