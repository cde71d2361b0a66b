use std::path::PathBuf;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

/// Watch-root consistency manager.
///
/// - Attach existing roots at startup
/// - Attach roots that appear later (e.g. `assets/images/raw` created after start)
/// - Re-attach roots that were removed and recreated
/// - Follow root changes after a config reload
pub(super) struct WatchRoots {
    desired: Vec<PathBuf>,
    attached: FxHashSet<PathBuf>,
}

impl WatchRoots {
    pub(super) fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            desired: paths,
            attached: FxHashSet::default(),
        }
    }

    pub(super) fn attach_existing(
        &mut self,
        watcher: &mut RecommendedWatcher,
    ) -> notify::Result<()> {
        for path in &self.desired {
            if !path.exists() {
                crate::debug!("watch"; "not watching missing {}", path.display());
                continue;
            }
            watcher.watch(path, RecursiveMode::Recursive)?;
            self.attached.insert(path.clone());
        }

        Ok(())
    }

    /// Replace the desired roots, unwatching the ones no longer needed.
    pub(super) fn set_desired(&mut self, paths: Vec<PathBuf>, watcher: &mut RecommendedWatcher) {
        if paths == self.desired {
            return;
        }
        let stale: Vec<_> = self
            .attached
            .iter()
            .filter(|p| !paths.contains(p))
            .cloned()
            .collect();
        for path in stale {
            let _ = watcher.unwatch(&path);
            self.attached.remove(&path);
            crate::debug!("watch"; "unwatched {}", path.display());
        }
        self.desired = paths;
    }

    pub(super) fn maintain(&mut self, watcher: &mut RecommendedWatcher) {
        // Drop stale handles for roots that no longer exist.
        self.attached.retain(|path| path.exists());

        for path in &self.desired {
            if self.attached.contains(path) || !path.exists() {
                continue;
            }

            if watcher.watch(path, RecursiveMode::Recursive).is_ok() {
                self.attached.insert(path.clone());
                crate::debug!("watch"; "attached watch: {}", path.display());
            }
        }
    }
}
