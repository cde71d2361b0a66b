use std::time::Duration;

use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use crate::actor::build::BuildActor;
use crate::actor::fs::FsActor;
use crate::actor::messages::{BuildMsg, WsMsg};
use crate::actor::ws::WsActor;

/// Run all actors until shutdown is signalled or one of them stops.
pub(super) async fn run_actors(
    fs: FsActor,
    build: BuildActor,
    ws: WsActor,
    build_tx: mpsc::Sender<BuildMsg>,
    ws_tx: mpsc::Sender<WsMsg>,
    shutdown_rx: Option<Receiver<()>>,
) {
    let mut fs_handle = tokio::spawn(fs.run());
    let mut build_handle = tokio::spawn(build.run());
    let mut ws_handle = tokio::spawn(ws.run());

    let signalled = async {
        match shutdown_rx {
            Some(rx) => loop {
                if rx.try_recv().is_ok() {
                    crate::debug!("actor"; "shutdown signal received");
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            },
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = signalled => {}
        _ = &mut fs_handle => crate::debug!("actor"; "fs actor stopped"),
        _ = &mut build_handle => crate::debug!("actor"; "build actor stopped"),
        _ = &mut ws_handle => crate::debug!("actor"; "ws actor stopped"),
    }

    fs_handle.abort();
    let _ = build_tx.send(BuildMsg::Shutdown).await;
    let _ = ws_tx.send(WsMsg::Shutdown).await;

    // A handle already consumed by the select must not be polled again
    let grace = Duration::from_millis(500);
    for handle in [build_handle, ws_handle] {
        if !handle.is_finished() {
            let _ = tokio::time::timeout(grace, handle).await;
        }
    }
}
