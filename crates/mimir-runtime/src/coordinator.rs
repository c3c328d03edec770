use mimir_index::Store;
use mimir_types::ProjectFile;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

use crate::Result;
use crate::bus::{BOARD_UPDATED, EventBus};
use crate::config::Config;
use crate::ingest::{IngestOutcome, ingest, ingest_all};
use crate::watcher::{FileChange, ProjectWatcher};

/// Find the project root owning `file`: the nearest directory, starting at
/// the file's own directory and climbing at most `max_hops` parents, that
/// holds a project marker.
pub fn resolve_project_root(file: &Path, max_hops: usize) -> Option<PathBuf> {
    file.parent()?
        .ancestors()
        .take(max_hops + 1)
        .find(|dir| ProjectFile::Manifest.path_in(dir).is_file())
        .map(Path::to_path_buf)
}

/// Runs re-ingestion off the dispatch loop, at most one at a time per root.
///
/// A request for a root that is already being ingested only marks it dirty;
/// the running worker ingests once more when it finishes, however many
/// requests arrived meanwhile.
struct IngestScheduler {
    store: Store,
    bus: Arc<EventBus>,
    tracker: TaskTracker,
    // root -> rerun requested while in flight
    in_flight: Mutex<HashMap<PathBuf, bool>>,
}

impl IngestScheduler {
    fn new(store: Store, bus: Arc<EventBus>, tracker: TaskTracker) -> Arc<Self> {
        Arc::new(Self {
            store,
            bus,
            tracker,
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<PathBuf, bool>> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn request(self: &Arc<Self>, root: PathBuf) {
        {
            let mut in_flight = self.in_flight();
            if let Some(rerun) = in_flight.get_mut(&root) {
                trace!(root = %root.display(), "Ingest already running, merging request");
                *rerun = true;
                return;
            }
            in_flight.insert(root.clone(), false);
        }

        let this = Arc::clone(self);
        self.tracker.spawn(async move { this.drain(root).await });
    }

    async fn drain(self: Arc<Self>, root: PathBuf) {
        loop {
            let store = self.store.clone();
            let target = root.clone();
            let result = tokio::task::spawn_blocking(move || ingest(&store, &target)).await;

            match result {
                Ok(Ok(Some(outcome))) => self.announce(&root, &outcome),
                Ok(Ok(None)) => debug!(root = %root.display(), "Project marker gone, nothing ingested"),
                Ok(Err(err)) => error!(root = %root.display(), error = %err, "Re-ingestion failed"),
                Err(err) => error!(root = %root.display(), error = %err, "Re-ingestion task panicked"),
            }

            let rerun = {
                let mut in_flight = self.in_flight();
                match in_flight.get_mut(&root) {
                    Some(rerun) if *rerun => {
                        *rerun = false;
                        true
                    }
                    _ => {
                        in_flight.remove(&root);
                        false
                    }
                }
            };
            if !rerun {
                break;
            }
        }
    }

    fn announce(&self, root: &Path, outcome: &IngestOutcome) {
        let delivered = self.bus.publish(
            BOARD_UPDATED,
            json!({ "project_path": root.display().to_string() }),
        );
        info!(
            project = %outcome.slug,
            root = %root.display(),
            activity_added = outcome.activity_added,
            subscribers = delivered,
            "Project re-ingested"
        );
    }
}

async fn dispatch_changes(
    mut changes: mpsc::UnboundedReceiver<FileChange>,
    scheduler: Arc<IngestScheduler>,
    max_hops: usize,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            change = changes.recv() => {
                let Some(change) = change else { break };
                match resolve_project_root(&change.path, max_hops) {
                    Some(root) => {
                        debug!(path = %change.path.display(), file = %change.file, "Scheduling re-ingestion");
                        scheduler.request(root);
                    }
                    None => trace!(path = %change.path.display(), "Change outside any project"),
                }
            }
        }
    }
}

/// Owns the running pipeline: startup ingest, watcher, and re-ingestion.
pub struct Coordinator {
    store: Store,
    bus: Arc<EventBus>,
    watcher: ProjectWatcher,
    dispatch: JoinHandle<()>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    stop_timeout: Duration,
    discovered: usize,
}

impl Coordinator {
    /// Ingest every project under the configured watch paths, then start
    /// watching them.
    pub async fn start(config: &Config, store: Store, bus: Arc<EventBus>) -> Result<Self> {
        let roots = config.watch_paths.clone();
        let max_depth = config.max_depth;

        let startup_store = store.clone();
        let discovered =
            tokio::task::spawn_blocking(move || ingest_all(&startup_store, &roots, max_depth))
                .await??;

        let (watcher, changes) = ProjectWatcher::start(&config.watch_paths, config.watcher_config())?;

        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();
        let scheduler = IngestScheduler::new(store.clone(), Arc::clone(&bus), tracker.clone());
        let dispatch = tokio::spawn(dispatch_changes(
            changes,
            scheduler,
            max_depth,
            cancel.clone(),
        ));

        info!(projects = discovered, roots = watcher.roots().len(), "Coordinator started");

        Ok(Self {
            store,
            bus,
            watcher,
            dispatch,
            tracker,
            cancel,
            stop_timeout: config.stop_timeout(),
            discovered,
        })
    }

    /// Projects found by the startup pass.
    pub fn projects_discovered(&self) -> usize {
        self.discovered
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Stop the watcher, let in-flight ingestions finish (bounded by the
    /// stop timeout), then release the store.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.dispatch.await {
            warn!(error = %err, "Dispatch loop ended abnormally");
        }

        if let Err(err) = self.watcher.stop().await {
            warn!(error = %err, "Watcher did not stop cleanly");
        }

        self.tracker.close();
        if tokio::time::timeout(self.stop_timeout, self.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                pending = self.tracker.len(),
                "Re-ingestion still running at shutdown"
            );
        }

        self.store.close();
        info!("Coordinator stopped");
    }
}
