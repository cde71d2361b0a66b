//! Persistent source-hash cache for the image stage.
//!
//! Stored as `.brisk/images.json` under the project root. Maps each raw
//! image's path (relative to the source base, `/`-separated) to the hex
//! blake3 hash of the bytes it was last optimized from. Entries are only
//! valid for the optimizer options they were produced with; loading with
//! different options starts from an empty map. The file is rebuildable: a
//! missing or corrupt cache only costs a full re-optimization.

use super::ContentHash;
use crate::debug;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory (under the project root) holding rebuildable state.
pub const STATE_DIR: &str = ".brisk";

const CACHE_FILE: &str = "images.json";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ImageCache {
    #[serde(skip)]
    path: PathBuf,
    /// Optimizer settings the entries were produced with
    #[serde(default)]
    options: String,
    #[serde(default)]
    entries: BTreeMap<String, String>,
    #[serde(skip)]
    dirty: bool,
}

impl ImageCache {
    /// Load the cache for a project root and the current optimizer options.
    /// Unreadable caches, and caches written under other options, start empty.
    pub fn load(root: &Path, options: &str) -> Self {
        let path = root.join(STATE_DIR).join(CACHE_FILE);
        let mut cache = fs::read_to_string(&path)
            .ok()
            .and_then(|content| match serde_json::from_str::<Self>(&content) {
                Ok(cache) => Some(cache),
                Err(e) => {
                    debug!("images"; "ignoring corrupt cache {}: {}", path.display(), e);
                    None
                }
            })
            .unwrap_or_default();
        cache.path = path;

        if cache.options != options {
            if !cache.entries.is_empty() {
                debug!("images"; "optimizer options changed, discarding cache");
                cache.entries.clear();
                cache.dirty = true;
            }
            cache.options = options.to_string();
        }
        cache
    }

    /// Whether `key` was last optimized from content with this hash.
    pub fn is_fresh(&self, key: &str, hash: ContentHash) -> bool {
        self.entries
            .get(key)
            .and_then(|hex| ContentHash::from_hex(hex))
            .is_some_and(|cached| cached == hash)
    }

    pub fn record(&mut self, key: &str, hash: ContentHash) {
        let hex = hash.to_hex();
        if self.entries.get(key) != Some(&hex) {
            self.entries.insert(key.to_string(), hex);
            self.dirty = true;
        }
    }

    /// Drop entries whose sources no longer exist.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        let before = self.entries.len();
        self.entries.retain(|key, _| keep(key));
        self.dirty |= self.entries.len() != before;
    }

    /// Persist the cache if anything changed.
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        self.dirty = false;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
