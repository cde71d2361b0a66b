//! One-shot stage runs: `brisk build`, `brisk styles`, `brisk scripts`, `brisk images`.

use anyhow::{Result, bail};

use crate::config::ProjectConfig;
use crate::debug;
use crate::logger::status_detach;
use crate::pipeline::{StageSet, run_stages};
use crate::report::{ConsoleNotifier, Notifier, report_all};

/// Run `stages` once and report each result.
///
/// Every stage runs even if an earlier one failed; the command fails if any did.
pub fn run_once(stages: StageSet, config: &ProjectConfig) -> Result<()> {
    run_with(stages, config, &ConsoleNotifier)
}

fn run_with(stages: StageSet, config: &ProjectConfig, notifier: &dyn Notifier) -> Result<()> {
    debug!("build"; "running {} in {}", stages, config.root.display());

    let results = run_stages(stages, config);
    let failed = report_all(notifier, &results);
    // keep the status lines on screen
    status_detach();

    if !failed.is_empty() {
        bail!("failed: {}", failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_project_config;
    use crate::pipeline::Stage;
    use crate::report::testing::RecordingNotifier;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> (TempDir, ProjectConfig) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("assets/sass")).unwrap();
        fs::create_dir_all(dir.path().join("assets/js/src")).unwrap();
        fs::write(dir.path().join("assets/sass/layout.scss"), "a { color: red; }\n").unwrap();
        fs::write(dir.path().join("assets/js/src/menu.js"), "var open = false;\n").unwrap();
        let config = test_project_config(dir.path(), "");
        (dir, config)
    }

    #[test]
    fn test_build_all_stages() {
        let (dir, config) = project();
        let notifier = RecordingNotifier::default();

        run_with(StageSet::all(), &config, &notifier).unwrap();

        assert!(dir.path().join("assets/css/layout.css").is_file());
        assert!(dir.path().join("assets/js/scripts.js").is_file());
        assert_eq!(notifier.take().len(), 3);
    }

    #[test]
    fn test_failure_still_runs_other_stages() {
        let (dir, config) = project();
        fs::write(dir.path().join("assets/sass/layout.scss"), "a { color: red;\n").unwrap();
        let notifier = RecordingNotifier::default();

        let err = run_with(StageSet::all(), &config, &notifier).unwrap_err();
        assert_eq!(err.to_string(), "failed: styles");
        assert!(dir.path().join("assets/js/scripts.js").is_file());

        let events = notifier.take();
        assert!(events[0].starts_with("TASK: \"styles\" failed"));
        assert!(events[1].starts_with("TASK: \"scripts\" completed"));
    }

    #[test]
    fn test_single_stage() {
        let (dir, config) = project();
        let notifier = RecordingNotifier::default();

        run_with(StageSet::only(Stage::Scripts), &config, &notifier).unwrap();

        assert!(dir.path().join("assets/js/scripts.js").is_file());
        assert!(!dir.path().join("assets/css/layout.css").exists());
    }
}
