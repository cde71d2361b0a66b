//! Asset transform stages.
//!
//! Each stage is a synchronous function from a [`ProjectConfig`] to the set
//! of files it wrote:
//!
//! ```text
//! styles   entry.scss ─grass─> css ─lightningcss─> prefixed/merged css + map
//! scripts  src/**/*   ─oxc check─> concatenated bundle (+ minified)
//! images   raw/**/*   ─oxipng/jpeg/usvg─> smaller of original and optimized
//! ```
//!
//! Stages never touch each other's outputs, so watch mode can re-run any
//! subset in any order.

pub mod image;
pub mod output;
pub mod script;
pub mod style;

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::ProjectConfig;
use crate::source::GlobError;
use output::OutputWriter;

// =============================================================================
// Stage identity
// =============================================================================

/// One asset class pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Styles,
    Scripts,
    Images,
}

impl Stage {
    pub const ALL: [Self; 3] = [Self::Styles, Self::Scripts, Self::Images];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Styles => "styles",
            Self::Scripts => "scripts",
            Self::Images => "images",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Styles => 1,
            Self::Scripts => 1 << 1,
            Self::Images => 1 << 2,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of stages; union is how watch mode coalesces pending work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSet(u8);

impl StageSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(0b111)
    }

    pub const fn only(stage: Stage) -> Self {
        Self(stage.bit())
    }

    pub fn insert(&mut self, stage: Stage) {
        self.0 |= stage.bit();
    }

    pub fn remove(&mut self, stage: Stage) {
        self.0 &= !stage.bit();
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, stage: Stage) -> bool {
        self.0 & stage.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Stages in execution order.
    pub fn iter(self) -> impl Iterator<Item = Stage> {
        Stage::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

impl FromIterator<Stage> for StageSet {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        let mut set = Self::empty();
        for stage in iter {
            set.insert(stage);
        }
        set
    }
}

impl fmt::Display for StageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.iter().map(Stage::name).collect();
        f.write_str(&names.join(", "))
    }
}

// =============================================================================
// Results
// =============================================================================

/// What a successful stage run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput {
    pub stage: Stage,
    /// Files whose bytes changed on disk.
    pub written: Vec<PathBuf>,
    /// Outputs that already had identical content.
    pub unchanged: usize,
    /// Source files the stage read.
    pub inputs: Vec<PathBuf>,
    pub elapsed: Duration,
}

impl StageOutput {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            written: Vec::new(),
            unchanged: 0,
            inputs: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    fn record(&mut self, path: PathBuf, outcome: output::WriteOutcome) {
        match outcome {
            output::WriteOutcome::Written => self.written.push(path),
            output::WriteOutcome::Unchanged => self.unchanged += 1,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        self.written.is_empty()
    }
}

/// Why a stage failed.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Glob(#[from] GlobError),

    #[error("entry stylesheet `{0}` not found")]
    MissingEntry(PathBuf),

    #[error("{0}")]
    Sass(String),

    #[error("{0}")]
    Css(String),

    #[error("{}", .0.join("\n"))]
    Syntax(Vec<String>),

    #[error("failed to read `{path}`")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write `{path}`")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StageError {
    /// Message including the underlying cause, for status lines and overlays.
    pub fn detail(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Run one stage against the given configuration.
pub fn run_stage(stage: Stage, config: &ProjectConfig) -> Result<StageOutput, StageError> {
    let started = Instant::now();
    let writer = OutputWriter::new(config.output.line_ending);

    let mut output = match stage {
        Stage::Styles => style::compile(config, &writer),
        Stage::Scripts => script::concatenate(config, &writer),
        Stage::Images => image::optimize(config, &writer),
    }?;

    output.elapsed = started.elapsed();
    Ok(output)
}

/// Run every stage in `stages`, in order. A failure does not stop the rest.
pub fn run_stages(
    stages: StageSet,
    config: &ProjectConfig,
) -> Vec<(Stage, Result<StageOutput, StageError>)> {
    stages
        .iter()
        .map(|stage| (stage, run_stage(stage, config)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_set_union() {
        let a = StageSet::only(Stage::Styles);
        let b = StageSet::only(Stage::Images);
        let merged = a.union(b);

        assert!(merged.contains(Stage::Styles));
        assert!(merged.contains(Stage::Images));
        assert!(!merged.contains(Stage::Scripts));
        assert_eq!(merged.union(a), merged);
    }

    #[test]
    fn test_stage_set_remove() {
        let mut set = StageSet::all();
        set.remove(Stage::Scripts);
        assert!(!set.contains(Stage::Scripts));
        set.remove(Stage::Scripts);
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn test_stage_set_order() {
        let set: StageSet = [Stage::Images, Stage::Styles].into_iter().collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Stage::Styles, Stage::Images]);
        assert_eq!(set.to_string(), "styles, images");
    }

    #[test]
    fn test_stage_set_all() {
        assert_eq!(StageSet::all().iter().count(), 3);
        assert!(StageSet::empty().is_empty());
        assert_eq!(Stage::ALL.into_iter().collect::<StageSet>(), StageSet::all());
    }

    #[test]
    fn test_error_detail_includes_source() {
        let err = StageError::Write {
            path: PathBuf::from("assets/css/layout.css"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        let detail = err.detail();
        assert!(detail.starts_with("failed to write `assets/css/layout.css`"));
        assert!(detail.ends_with("permission denied"));
    }
}
