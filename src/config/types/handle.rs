//! Shared config handle with atomic reload support.
//!
//! Uses `arc-swap` for lock-free reads and atomic config replacement, so the
//! watcher, the build actor and the dev server all see the same `brisk.toml`
//! after it is edited during watch mode.

use crate::config::ProjectConfig;
use crate::freshness::ContentHash;
use anyhow::Result;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::fs;
use std::sync::Arc;

/// Cloneable handle to the current configuration.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    current: Arc<ArcSwap<ProjectConfig>>,
    /// Hash of the config file content the current config was parsed from.
    hash: Arc<Mutex<Option<ContentHash>>>,
}

impl ConfigHandle {
    pub fn new(config: ProjectConfig) -> Self {
        let hash = fs::read(&config.config_path)
            .ok()
            .map(|bytes| ContentHash::of(&bytes));
        Self {
            current: Arc::new(ArcSwap::from_pointee(config)),
            hash: Arc::new(Mutex::new(hash)),
        }
    }

    /// Snapshot of the current configuration.
    #[inline]
    pub fn load(&self) -> Arc<ProjectConfig> {
        self.current.load_full()
    }

    /// Reload config from disk if its content changed.
    ///
    /// Returns `Ok(true)` if the config was replaced, `Ok(false)` if unchanged.
    /// On error the previous config stays active.
    pub fn reload(&self) -> Result<bool> {
        let current = self.load();
        let bytes = fs::read(&current.config_path)?;
        let new_hash = ContentHash::of(&bytes);

        let mut hash = self.hash.lock();
        if hash.as_ref() == Some(&new_hash) {
            return Ok(false);
        }

        let next = current.reloaded()?;
        self.current.store(Arc::new(next));
        *hash = Some(new_hash);
        Ok(true)
    }
}
