use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use super::types::ChangeKind;
use crate::utils::path::normalize_path;

pub(super) const DEBOUNCE_MS: u64 = 300;
pub(super) const REBUILD_COOLDOWN_MS: u64 = 800;

/// Pure debouncer: only handles timing and event deduplication.
pub(super) struct Debouncer {
    /// Path → ChangeKind (dedup is free via HashMap key uniqueness)
    pub(super) changes: FxHashMap<PathBuf, ChangeKind>,
    pub(super) last_event: Option<Instant>,
    pub(super) last_batch: Option<Instant>,
}

/// Result of folding a new event into a pending one.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum Merge {
    /// Keep the pending kind
    Keep,
    /// Replace it
    Replace(ChangeKind),
    /// The two cancel out
    Discard,
}

/// Dedup rules for two events on the same path within one window:
/// - Removed then Created/Modified: the file was restored, take the new kind
/// - Modified then Removed: the file is gone
/// - Created then Removed: it never existed as far as a build is concerned
/// - anything else: first event wins
pub(super) fn merge_kinds(pending: ChangeKind, incoming: ChangeKind) -> Merge {
    use ChangeKind::*;
    match (pending, incoming) {
        (Removed, Created | Modified) => Merge::Replace(incoming),
        (Modified, Removed) => Merge::Replace(Removed),
        (Created, Removed) => Merge::Discard,
        _ => Merge::Keep,
    }
}

impl Debouncer {
    pub(super) fn new() -> Self {
        Self {
            changes: FxHashMap::default(),
            last_event: None,
            last_batch: None,
        }
    }

    /// Add a notify event.
    pub(super) fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            // mtime/chmod noise can loop: a stage touching its own output
            EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => return,
            EventKind::Modify(_) => ChangeKind::Modified,
            _ => return,
        };

        crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            self.add_change(normalize_path(path), kind);
        }
    }

    fn add_change(&mut self, path: PathBuf, kind: ChangeKind) {
        match self.changes.get(&path) {
            None => {
                crate::debug!("watch"; "event {}: {}", kind.label(), path.display());
                self.changes.insert(path, kind);
            }
            Some(&pending) => match merge_kinds(pending, kind) {
                Merge::Keep => return,
                Merge::Replace(next) => {
                    crate::debug!("watch"; "{}->{}: {}", pending.label(), next.label(), path.display());
                    self.changes.insert(path, next);
                }
                Merge::Discard => {
                    crate::debug!("watch"; "discard {}+{}: {}", pending.label(), kind.label(), path.display());
                    self.changes.remove(&path);
                }
            },
        }
        self.last_event = Some(Instant::now());
    }

    /// Take the pending changes once debounce and cooldown have elapsed.
    pub(super) fn take_if_ready(&mut self) -> Option<FxHashMap<PathBuf, ChangeKind>> {
        // Everything cancelled out; stop polling until the next event
        if self.changes.is_empty() {
            self.last_event = None;
            return None;
        }
        if !self.is_ready() {
            return None;
        }

        let changes = std::mem::take(&mut self.changes);
        self.last_event = None;
        self.last_batch = Some(Instant::now());
        Some(changes)
    }

    pub(super) fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };

        if last_event.elapsed() < Duration::from_millis(DEBOUNCE_MS) {
            return false;
        }

        if let Some(last_batch) = self.last_batch
            && last_batch.elapsed() < Duration::from_millis(REBUILD_COOLDOWN_MS)
        {
            return false;
        }

        !self.changes.is_empty()
    }

    /// Sleep duration until the next possible ready time.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        let debounce_remaining =
            Duration::from_millis(DEBOUNCE_MS).saturating_sub(last_event.elapsed());

        let cooldown_remaining = self
            .last_batch
            .map(|t| Duration::from_millis(REBUILD_COOLDOWN_MS).saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);

        debounce_remaining
            .max(cooldown_remaining)
            .max(Duration::from_millis(1))
    }
}

/// Editor swap files, backups and dot-files.
pub(super) fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "swx" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
        || name.starts_with('#')
        || name == "4913"
}
