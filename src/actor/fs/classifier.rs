use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use super::types::{ChangeKind, ChangeSet};
use crate::config::ProjectConfig;
use crate::pipeline::Stage;
use crate::source::SourceGlob;

/// Sass partial extensions picked up from `styles.load_paths`.
const STYLE_EXTENSIONS: &[&str] = &["scss", "sass", "css"];

/// Watch rules compiled from the `[watch]` section.
pub(super) struct WatchRules {
    styles: Vec<SourceGlob>,
    scripts: Vec<SourceGlob>,
    images: Vec<SourceGlob>,
    reload: Vec<SourceGlob>,
    /// Import roots outside the watched style globs
    load_paths: Vec<PathBuf>,
    config_path: PathBuf,
    /// Files the stages write; never sources
    derived: Vec<PathBuf>,
}

impl WatchRules {
    pub(super) fn new(config: &ProjectConfig) -> Self {
        let compile = |patterns: &[String]| -> Vec<SourceGlob> {
            patterns
                .iter()
                .filter_map(|pattern| match SourceGlob::new(&config.root, pattern) {
                    Ok(glob) => Some(glob),
                    Err(e) => {
                        crate::debug!("watch"; "skipping rule: {}", e);
                        None
                    }
                })
                .collect()
        };

        Self {
            styles: compile(&config.watch.styles),
            scripts: compile(&config.watch.scripts),
            images: compile(&config.watch.images),
            reload: compile(&config.watch.reload),
            load_paths: config.styles.load_paths.clone(),
            config_path: config.config_path.clone(),
            derived: config.derived_outputs(),
        }
    }

    /// Directories that must be watched for the rules to see every match.
    pub(super) fn roots(&self) -> Vec<PathBuf> {
        let globs = self
            .styles
            .iter()
            .chain(&self.scripts)
            .chain(&self.images)
            .chain(&self.reload);

        let mut roots: Vec<PathBuf> = globs.map(|g| g.base().to_path_buf()).collect();
        roots.extend(self.load_paths.iter().cloned());
        roots.push(self.config_path.clone());
        dedupe_nested(&mut roots);
        roots
    }

    /// Add what a single changed path asks for to `changes`.
    fn apply(&self, path: &Path, changes: &mut ChangeSet) {
        if path == self.config_path {
            changes.config_changed = true;
            return;
        }
        if self.derived.binary_search_by(|p| p.as_path().cmp(path)).is_ok() {
            return;
        }

        let matches = |globs: &[SourceGlob]| globs.iter().any(|g| g.is_match(path));

        if matches(&self.styles) || self.is_load_path_partial(path) {
            changes.stages.insert(Stage::Styles);
        }
        if matches(&self.scripts) {
            changes.stages.insert(Stage::Scripts);
        }
        if matches(&self.images) {
            changes.stages.insert(Stage::Images);
        }
        if matches(&self.reload) {
            changes.reload.push(path.to_path_buf());
        }
    }

    fn is_load_path_partial(&self, path: &Path) -> bool {
        let is_style = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| STYLE_EXTENSIONS.contains(&ext));
        is_style && self.load_paths.iter().any(|dir| path.starts_with(dir))
    }
}

/// Keep only the outermost of nested roots; watches are recursive.
pub(super) fn dedupe_nested(paths: &mut Vec<PathBuf>) {
    paths.sort();
    paths.dedup();
    let mut kept: Vec<PathBuf> = Vec::with_capacity(paths.len());
    for path in paths.drain(..) {
        if !kept.iter().any(|root| path.starts_with(root)) {
            kept.push(path);
        }
    }
    *paths = kept;
}

/// Classifies raw debounced events into the work they request.
///
/// Pipeline: correct_by_existence → filter_actionable → match rules
pub(super) struct EventClassifier;

impl EventClassifier {
    pub(super) fn classify(
        raw: FxHashMap<PathBuf, ChangeKind>,
        rules: &WatchRules,
    ) -> Option<ChangeSet> {
        let mut changes = raw;

        Self::correct_by_existence(&mut changes);
        Self::filter_actionable(&mut changes);

        let mut paths: Vec<_> = changes.into_iter().collect();
        paths.sort();

        let mut set = ChangeSet::default();
        for (path, kind) in &paths {
            crate::debug!("watch"; "{}: {}", kind.label(), path.display());
            rules.apply(path, &mut set);
        }

        (!set.is_empty()).then_some(set)
    }

    /// Reconcile event kinds with actual filesystem state.
    ///
    /// The watcher may report stale events (e.g., Created for a file that's already
    /// been deleted, or Removed for a file that still exists after an atomic save).
    pub(super) fn correct_by_existence(changes: &mut FxHashMap<PathBuf, ChangeKind>) {
        changes.retain(|path, kind| {
            let exists = path.exists();
            match *kind {
                ChangeKind::Created if !exists => {
                    crate::debug!("watch"; "discard created (gone): {}", path.display());
                    return false;
                }
                ChangeKind::Modified if !exists => *kind = ChangeKind::Removed,
                ChangeKind::Removed if exists => *kind = ChangeKind::Modified,
                _ => {}
            }
            true
        });
    }

    /// Created/Modified must be a file; directory events carry no content.
    /// Removed paths are kept: a deleted script still changes the bundle.
    pub(super) fn filter_actionable(changes: &mut FxHashMap<PathBuf, ChangeKind>) {
        changes.retain(|path, kind| match kind {
            ChangeKind::Created | ChangeKind::Modified => path.is_file(),
            ChangeKind::Removed => true,
        });
    }
}
