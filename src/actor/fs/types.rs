use std::path::PathBuf;

use crate::pipeline::StageSet;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Work requested by one debounced batch of changes.
#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct ChangeSet {
    /// Stages whose sources changed.
    pub(super) stages: StageSet,
    /// Changed files that only need a browser reload.
    pub(super) reload: Vec<PathBuf>,
    /// `brisk.toml` itself changed.
    pub(super) config_changed: bool,
}

impl ChangeSet {
    pub(super) fn is_empty(&self) -> bool {
        self.stages.is_empty() && self.reload.is_empty() && !self.config_changed
    }
}
