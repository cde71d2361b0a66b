//! Build Actor - runs stages and decides what browsers are told.
//!
//! Two states:
//!
//! ```text
//!          Run/Reload/ConfigChanged
//!   Idle ───────────────────────────> Rebuilding
//!    ^                                    │ messages arriving now are
//!    └──── nothing pending ───────────────┘ coalesced into one PendingWork
//! ```
//!
//! Only one rebuild runs at a time. Stage functions are synchronous and run
//! on the blocking pool.


use std::sync::Arc;

use tokio::sync::mpsc;

use super::messages::{BuildMsg, WsMsg};
use crate::config::{ConfigHandle, ProjectConfig};
use crate::logger::status_error;
use crate::pipeline::{Stage, StageError, StageOutput, StageSet, run_stages};
use crate::report::{Notifier, report_all};
use crate::utils::path::to_slash;

/// Stage name used for config reload failures in the overlay.
const CONFIG_STAGE: &str = "config";

/// Work accumulated while idle or during a rebuild.
#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct PendingWork {
    pub(super) stages: StageSet,
    pub(super) reload: Option<String>,
    pub(super) config_changed: bool,
    pub(super) shutdown: bool,
}

impl PendingWork {
    /// Fold a message in; stage sets are unioned.
    pub(super) fn add(&mut self, msg: BuildMsg) {
        match msg {
            BuildMsg::Run { stages } => self.stages = self.stages.union(stages),
            BuildMsg::Reload { reason } => {
                // Keep the first reason; later ones are usually the same save
                self.reload.get_or_insert(reason);
            }
            BuildMsg::ConfigChanged => self.config_changed = true,
            BuildMsg::Shutdown => self.shutdown = true,
        }
    }

    pub(super) fn is_empty(&self) -> bool {
        self.stages.is_empty() && self.reload.is_none() && !self.config_changed
    }
}

/// Build Actor
pub struct BuildActor {
    rx: mpsc::Receiver<BuildMsg>,
    ws_tx: mpsc::Sender<WsMsg>,
    config: ConfigHandle,
    notifier: Arc<dyn Notifier>,
    /// Stages whose last run failed
    failing: StageSet,
    /// Last config reload failed
    config_broken: bool,
}

impl BuildActor {
    pub fn new(
        rx: mpsc::Receiver<BuildMsg>,
        ws_tx: mpsc::Sender<WsMsg>,
        config: ConfigHandle,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            rx,
            ws_tx,
            config,
            notifier,
            failing: StageSet::empty(),
            config_broken: false,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            let mut work = PendingWork::default();
            work.add(msg);

            // Rebuilding: drain what queued up during the last run, then go again
            loop {
                while let Ok(msg) = self.rx.try_recv() {
                    work.add(msg);
                }
                if work.shutdown {
                    crate::debug!("build"; "shutting down");
                    return;
                }
                if work.is_empty() {
                    break;
                }
                let current = std::mem::take(&mut work);
                if self.rebuild(current).await.is_err() {
                    return;
                }
            }
        }
    }

    /// Run one coalesced batch and notify browsers.
    ///
    /// Returns `Err(())` if the WsActor is gone.
    async fn rebuild(&mut self, work: PendingWork) -> Result<(), ()> {
        let mut stages = work.stages;
        let mut messages = Vec::new();

        if work.config_changed {
            match self.config.reload() {
                Ok(changed) => {
                    if changed {
                        crate::log!("config"; "reloaded, running all stages");
                        stages = StageSet::all();
                    }
                    self.config_broken = false;
                }
                Err(e) => {
                    let detail = format!("{e:#}");
                    status_error("config reload failed, keeping previous config", &detail);
                    self.config_broken = true;
                    messages.push(WsMsg::Error {
                        stage: CONFIG_STAGE.to_string(),
                        error: detail,
                    });
                }
            }
        }

        let config = self.config.load();
        let results = if stages.is_empty() {
            Vec::new()
        } else {
            crate::debug!("build"; "running {}", stages);
            let snapshot = Arc::clone(&config);
            run_contained(move || run_stages(stages, &snapshot)).await
        };

        let failed = report_all(self.notifier.as_ref(), &results);
        for (stage, _) in &results {
            if failed.contains(*stage) {
                self.failing.insert(*stage);
            } else {
                self.failing.remove(*stage);
            }
        }

        // WsActor ignores a clear when no overlay is showing
        if self.failing.is_empty() && !self.config_broken {
            messages.push(WsMsg::ClearError);
        }
        messages.extend(browser_messages(&results, work.reload, &config));

        for msg in messages {
            self.ws_tx.send(msg).await.map_err(|_| ())?;
        }
        Ok(())
    }
}

type StageResults = Vec<(Stage, Result<StageOutput, StageError>)>;

/// Run stage work on the blocking pool. A panic inside a stage is logged and
/// yields no results; the actor keeps serving later changes.
pub(super) async fn run_contained<F>(work: F) -> StageResults
where
    F: FnOnce() -> StageResults + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(results) => results,
        Err(e) => {
            crate::log!("error"; "stage task panicked: {}", e);
            Vec::new()
        }
    }
}

/// Decide what browsers should do after a batch.
///
/// - every failure becomes an error overlay
/// - a changed stylesheet is injected in place unless `serve.inject_css` is off
/// - changed scripts or images, or an explicit reload request, reload the page;
///   a reload supersedes an injection
pub(super) fn browser_messages(
    results: &[(Stage, Result<StageOutput, StageError>)],
    reload: Option<String>,
    config: &ProjectConfig,
) -> Vec<WsMsg> {
    let mut messages = Vec::new();
    let mut reload = reload;
    let mut inject = None;

    for (stage, result) in results {
        match result {
            Err(error) => messages.push(WsMsg::Error {
                stage: stage.name().to_string(),
                error: error.detail(),
            }),
            Ok(output) if output.is_unchanged() => {}
            Ok(_) if *stage == Stage::Styles && config.serve.inject_css => {
                let href = config.root_relative(config.styles.output_css());
                inject = Some(to_slash(&href));
            }
            Ok(_) => {
                reload.get_or_insert_with(|| format!("{stage} changed"));
            }
        }
    }

    match (reload, inject) {
        (Some(reason), _) => messages.push(WsMsg::Reload { reason }),
        (None, Some(href)) => messages.push(WsMsg::InjectCss { href }),
        (None, None) => {}
    }
    messages
}
