//! Actor Coordinator - Wires up the Watch Actor System
//!
//! The Coordinator is a thin orchestrator that:
//! - Creates communication channels
//! - Hands the bound reload listener its channel
//! - Queues the initial full build
//! - Runs the actors concurrently

mod runtime;

use std::sync::Arc;

use anyhow::{Result, anyhow};
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use super::build::BuildActor;
use super::fs::FsActor;
use super::messages::{BuildMsg, WsMsg};
use super::ws::WsActor;
use crate::config::ConfigHandle;
use crate::pipeline::StageSet;
use crate::reload::server::ReloadListener;
use crate::report::{ConsoleNotifier, Notifier};

const CHANNEL_BUFFER: usize = 32;

/// Coordinator - wires up and runs the actor system.
pub struct Coordinator {
    config: ConfigHandle,
    ws_listener: Option<ReloadListener>,
    shutdown_rx: Option<Receiver<()>>,
    notifier: Arc<dyn Notifier>,
}

impl Coordinator {
    pub fn with_config(config: ConfigHandle) -> Self {
        Self {
            config,
            ws_listener: None,
            shutdown_rx: None,
            notifier: Arc::new(ConsoleNotifier),
        }
    }

    /// Accept live-reload clients from this listener.
    pub fn with_ws_listener(mut self, listener: ReloadListener) -> Self {
        self.ws_listener = Some(listener);
        self
    }

    /// Set shutdown signal receiver.
    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Run the actor system.
    pub async fn run(self) -> Result<()> {
        let (build_tx, build_rx) = mpsc::channel::<BuildMsg>(CHANNEL_BUFFER);
        let (ws_tx, ws_rx) = mpsc::channel::<WsMsg>(CHANNEL_BUFFER);

        if let Some(listener) = self.ws_listener {
            listener.spawn_acceptor(ws_tx.clone())?;
        }

        // Watcher first: changes made during the initial build are queued
        let fs_actor = FsActor::new(build_tx.clone(), self.config.clone())
            .map_err(|e| anyhow!("watcher failed: {}", e))?;
        let build_actor = BuildActor::new(
            build_rx,
            ws_tx.clone(),
            self.config.clone(),
            self.notifier,
        );
        let ws_actor = WsActor::new(ws_rx);

        build_tx
            .send(BuildMsg::Run {
                stages: StageSet::all(),
            })
            .await
            .map_err(|_| anyhow!("build actor unavailable"))?;

        crate::debug!("actor"; "start");
        runtime::run_actors(
            fs_actor,
            build_actor,
            ws_actor,
            build_tx,
            ws_tx,
            self.shutdown_rx,
        )
        .await;
        crate::debug!("actor"; "stopped");
        Ok(())
    }
}
