//! FileSystem Actor
//!
//! Watches source directories and sends debounced, classified work to the
//! BuildActor. The watcher starts before the initial build so no change is
//! lost while the first run is in progress.
//!
//! ```text
//! Watcher → Debouncer (pure timing) → Classifier (watch rules) → BuildMsg
//! ```

use std::path::PathBuf;

use notify::RecommendedWatcher;
use tokio::sync::mpsc;

use super::messages::BuildMsg;
use crate::config::ConfigHandle;

// Watch rules and event classification.
mod classifier;
// Pure timing and deduplication.
mod debouncer;
// Classified changes -> BuildMsg.
mod router;
// Shared fs event types.
mod types;
// Watch root attach/re-attach lifecycle.
mod watch_roots;

#[cfg(test)]
mod tests;

use classifier::{EventClassifier, WatchRules};
use debouncer::Debouncer;
use router::changes_to_messages;
use watch_roots::WatchRoots;

/// Directories and files watch mode needs to observe for `config`.
pub fn watch_paths(config: &crate::config::ProjectConfig) -> Vec<PathBuf> {
    WatchRules::new(config).roots()
}

/// FileSystem Actor - watches for file changes
pub struct FsActor {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    watch_roots: WatchRoots,
    build_tx: mpsc::Sender<BuildMsg>,
    debouncer: Debouncer,
    config: ConfigHandle,
}

impl FsActor {
    /// Create the watcher and attach every existing root immediately.
    pub fn new(build_tx: mpsc::Sender<BuildMsg>, config: ConfigHandle) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let mut watch_roots = WatchRoots::new(watch_paths(&config.load()));
        watch_roots.attach_existing(&mut watcher)?;

        Ok(Self {
            notify_rx,
            watcher,
            watch_roots,
            build_tx,
            debouncer: Debouncer::new(),
            config,
        })
    }

    /// Run the actor event loop
    pub async fn run(self) {
        let Self {
            notify_rx,
            mut watcher,
            mut watch_roots,
            build_tx,
            mut debouncer,
            config,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // notify delivers on a sync channel; bridge it onto the runtime
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                event = async_rx.recv() => match event {
                    Some(event) => debouncer.add_event(&event),
                    None => break,
                },
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    let Some(raw) = debouncer.take_if_ready() else {
                        continue;
                    };

                    // Roots follow the config; it may have been reloaded
                    let current = config.load();
                    let rules = WatchRules::new(&current);
                    watch_roots.set_desired(rules.roots(), &mut watcher);
                    watch_roots.maintain(&mut watcher);

                    let Some(changes) = EventClassifier::classify(raw, &rules) else {
                        continue;
                    };

                    let mut closed = false;
                    for msg in changes_to_messages(changes, &current) {
                        if build_tx.send(msg).await.is_err() {
                            closed = true;
                            break;
                        }
                    }
                    if closed {
                        break;
                    }
                }
            }
        }

        crate::debug!("watch"; "stopped");
    }
}
