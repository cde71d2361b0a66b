//! Notification sink: tells the operator how each stage run went.
//!
//! One-shot commands and watch mode report through the same [`Notifier`];
//! the console implementation renders into the overwriting watch status
//! block so a fixed error disappears on the next successful run.

use crate::logger::{status_error, status_success, status_unchanged};
use crate::pipeline::{Stage, StageError, StageOutput, StageSet};
use crate::utils::plural_count;

/// Receives stage outcomes.
pub trait Notifier: Send + Sync {
    fn completed(&self, output: &StageOutput);
    fn failed(&self, stage: Stage, error: &StageError);
}

/// Status line for a finished stage, e.g. `TASK: "styles" completed (2 files, 41ms)`.
pub fn completed_message(output: &StageOutput) -> String {
    let stage = output.stage.name();
    let millis = output.elapsed.as_millis();
    if output.is_unchanged() {
        format!("TASK: \"{stage}\" completed, nothing changed ({millis}ms)")
    } else {
        let written = plural_count(output.written.len(), "file");
        format!("TASK: \"{stage}\" completed ({written} written, {millis}ms)")
    }
}

/// Status line for a failed stage.
pub fn failed_message(stage: Stage) -> String {
    format!("TASK: \"{}\" failed", stage.name())
}

/// Report every result; returns the stages that failed.
pub fn report_all(
    notifier: &dyn Notifier,
    results: &[(Stage, Result<StageOutput, StageError>)],
) -> StageSet {
    let mut failed = StageSet::empty();
    for (stage, result) in results {
        match result {
            Ok(output) => notifier.completed(output),
            Err(error) => {
                notifier.failed(*stage, error);
                failed.insert(*stage);
            }
        }
    }
    failed
}

/// Prints to the terminal status block.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn completed(&self, output: &StageOutput) {
        let message = completed_message(output);
        if output.is_unchanged() {
            status_unchanged(&message);
        } else {
            status_success(&message);
        }
    }

    fn failed(&self, stage: Stage, error: &StageError) {
        status_error(&failed_message(stage), &error.detail());
    }
}
