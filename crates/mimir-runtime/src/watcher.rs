//! Filesystem change detection for project files.
//!
//! The notify backend runs its own thread. Its callback only classifies
//! events and forwards them over an unbounded channel, so delivery never
//! waits on the consumer. A tokio task then debounces per path and emits
//! one [`FileChange`] per burst.

use mimir_types::ProjectFile;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Events for the same path closer together than this collapse into one.
    pub debounce: Duration,
    /// How long [`ProjectWatcher::stop`] may take before giving up.
    pub stop_timeout: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

/// A settled change to one of the recognized project files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub file: ProjectFile,
}

/// Create and modify events on recognized file names; everything else is dropped.
pub fn relevant_changes(event: &Event) -> Vec<FileChange> {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return Vec::new();
    }

    event
        .paths
        .iter()
        .filter_map(|path| {
            let file = ProjectFile::from_path(path)?;
            if path.is_dir() {
                return None;
            }
            Some(FileChange {
                path: path.clone(),
                file,
            })
        })
        .collect()
}

struct PendingChange {
    change: FileChange,
    deadline: Instant,
}

/// Debounce loop. Each new event for a path pushes that path's deadline out
/// by `window` and replaces the pending change; a path is emitted once its
/// deadline passes. Cancellation discards whatever is still pending.
pub async fn run_debounce(
    mut raw_rx: mpsc::UnboundedReceiver<FileChange>,
    out_tx: mpsc::UnboundedSender<FileChange>,
    window: Duration,
    cancel: CancellationToken,
) {
    let mut pending: HashMap<PathBuf, PendingChange> = HashMap::new();

    loop {
        let next_deadline = pending.values().map(|p| p.deadline).min();

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                if !pending.is_empty() {
                    debug!(pending = pending.len(), "Discarding pending changes on stop");
                }
                break;
            }

            received = raw_rx.recv() => {
                let Some(change) = received else {
                    debug!("Notification source closed");
                    break;
                };
                trace!(path = %change.path.display(), "Change observed");
                let deadline = Instant::now() + window;
                pending.insert(change.path.clone(), PendingChange { change, deadline });
            }

            _ = sleep_until_some(next_deadline) => {
                let now = Instant::now();
                let settled: Vec<PathBuf> = pending
                    .iter()
                    .filter(|(_, p)| p.deadline <= now)
                    .map(|(path, _)| path.clone())
                    .collect();

                for path in settled {
                    if let Some(done) = pending.remove(&path)
                        && out_tx.send(done.change).is_err()
                    {
                        debug!("Change consumer gone, stopping debounce");
                        return;
                    }
                }
            }
        }
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Recursive watch over the configured roots.
pub struct ProjectWatcher {
    watcher: Option<RecommendedWatcher>,
    roots: Vec<PathBuf>,
    cancel: CancellationToken,
    debounce_task: JoinHandle<()>,
    stop_timeout: Duration,
}

impl ProjectWatcher {
    /// Start watching. Must be called from within a tokio runtime.
    ///
    /// Roots that do not exist are skipped and are not picked up if they
    /// appear later.
    pub fn start(
        roots: &[PathBuf],
        config: WatcherConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<FileChange>)> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<FileChange>();
        let (out_tx, out_rx) = mpsc::unbounded_channel::<FileChange>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for change in relevant_changes(&event) {
                        // Receiver gone means we are stopping.
                        let _ = raw_tx.send(change);
                    }
                }
                Err(err) => warn!(error = %err, "Filesystem watcher error"),
            },
            notify::Config::default(),
        )?;

        let mut watched = Vec::new();
        for root in roots {
            let root = match std::fs::canonicalize(root) {
                Ok(root) => root,
                Err(_) => {
                    info!(root = %root.display(), "Watch path does not exist, skipping");
                    continue;
                }
            };
            watcher.watch(&root, RecursiveMode::Recursive)?;
            info!(root = %root.display(), "Watching for project changes");
            watched.push(root);
        }

        let cancel = CancellationToken::new();
        let debounce_task = tokio::spawn(run_debounce(
            raw_rx,
            out_tx,
            config.debounce,
            cancel.clone(),
        ));

        Ok((
            Self {
                watcher: Some(watcher),
                roots: watched,
                cancel,
                debounce_task,
                stop_timeout: config.stop_timeout,
            },
            out_rx,
        ))
    }

    /// Canonical roots actually being watched.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Halt the notification backend and the debounce task.
    ///
    /// Pending debounced changes are discarded. Exceeding the stop timeout
    /// returns [`Error::StopTimeout`]; the watcher is abandoned either way.
    pub async fn stop(mut self) -> Result<()> {
        self.cancel.cancel();

        let watcher = self.watcher.take();
        let release = tokio::task::spawn_blocking(move || drop(watcher));
        let debounce_task = self.debounce_task;

        let stopped = tokio::time::timeout(self.stop_timeout, async move {
            let _ = release.await;
            let _ = debounce_task.await;
        })
        .await;

        match stopped {
            Ok(()) => {
                debug!("Watcher stopped");
                Ok(())
            }
            Err(_) => Err(Error::StopTimeout(self.stop_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimir_testing::TestWorld;
    use notify::event::{AccessKind, CreateKind, DataChange, ModifyKind, RemoveKind};

    const WINDOW: Duration = Duration::from_millis(300);

    fn change(path: &str) -> FileChange {
        let path = PathBuf::from(path);
        let file = ProjectFile::from_path(&path).unwrap();
        FileChange { path, file }
    }

    fn spawn_debounce() -> (
        mpsc::UnboundedSender<FileChange>,
        mpsc::UnboundedReceiver<FileChange>,
        CancellationToken,
        JoinHandle<()>,
    ) {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_debounce(raw_rx, out_tx, WINDOW, cancel.clone()));
        (raw_tx, out_rx, cancel, task)
    }

    #[test]
    fn test_relevant_changes_filters_kinds_and_names() {
        let board = PathBuf::from("/work/demo/taskboard.json");
        let readme = PathBuf::from("/work/demo/README.md");

        let modify = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(board.clone())
            .add_path(readme.clone());
        assert_eq!(
            relevant_changes(&modify),
            vec![FileChange {
                path: board.clone(),
                file: ProjectFile::TaskBoard
            }]
        );

        let create = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/work/demo/progress.jsonl"));
        assert_eq!(relevant_changes(&create).len(), 1);

        let remove = Event::new(EventKind::Remove(RemoveKind::File)).add_path(board.clone());
        assert!(relevant_changes(&remove).is_empty());

        let access = Event::new(EventKind::Access(AccessKind::Any)).add_path(board);
        assert!(relevant_changes(&access).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_one_change() {
        let (raw_tx, mut out_rx, cancel, _task) = spawn_debounce();

        for _ in 0..10 {
            raw_tx.send(change("/work/demo/prd.json")).unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let settled = out_rx.recv().await.unwrap();
        assert_eq!(settled, change("/work/demo/prd.json"));

        let extra = tokio::time::timeout(WINDOW * 4, out_rx.recv()).await;
        assert!(extra.is_err(), "burst must produce exactly one change");
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_gap_produces_separate_changes() {
        let (raw_tx, mut out_rx, cancel, _task) = spawn_debounce();

        raw_tx.send(change("/work/demo/prd.json")).unwrap();
        assert!(out_rx.recv().await.is_some());

        tokio::time::sleep(WINDOW * 2).await;
        raw_tx.send(change("/work/demo/prd.json")).unwrap();
        assert!(out_rx.recv().await.is_some());
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_paths_debounce_independently() {
        let (raw_tx, mut out_rx, cancel, _task) = spawn_debounce();

        raw_tx.send(change("/work/a/taskboard.json")).unwrap();
        raw_tx.send(change("/work/b/taskboard.json")).unwrap();
        raw_tx.send(change("/work/a/taskboard.json")).unwrap();

        let mut paths = vec![
            out_rx.recv().await.unwrap().path,
            out_rx.recv().await.unwrap().path,
        ];
        paths.sort();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/work/a/taskboard.json"),
                PathBuf::from("/work/b/taskboard.json")
            ]
        );
        assert!(tokio::time::timeout(WINDOW * 4, out_rx.recv()).await.is_err());
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending() {
        let (raw_tx, mut out_rx, cancel, task) = spawn_debounce();

        raw_tx.send(change("/work/demo/ullr.yaml")).unwrap();
        tokio::time::sleep(WINDOW / 3).await;
        cancel.cancel();
        task.await.unwrap();

        assert!(out_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_root_is_skipped() {
        let world = TestWorld::new().with_dir("present");
        let roots = vec![world.path("absent"), world.path("present")];

        let (watcher, _changes) = ProjectWatcher::start(&roots, WatcherConfig::default()).unwrap();
        assert_eq!(watcher.roots(), &[world.path("present")]);
        watcher.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_real_file_write_is_reported() {
        let world = TestWorld::new().with_project("demo", "Demo");
        let config = WatcherConfig {
            debounce: Duration::from_millis(100),
            ..WatcherConfig::default()
        };
        let (watcher, mut changes) =
            ProjectWatcher::start(&[world.root().to_path_buf()], config).unwrap();

        // Give the backend a moment to register the watch.
        tokio::time::sleep(Duration::from_millis(200)).await;
        world.write_file("demo/notes.txt", "ignored");
        world.write_requirements("demo", &mimir_testing::fixtures::requirements(2, 1));

        let change = tokio::time::timeout(Duration::from_secs(10), changes.recv())
            .await
            .expect("no change reported")
            .unwrap();
        assert_eq!(change.file, ProjectFile::Requirements);
        assert_eq!(change.path, world.path("demo/prd.json"));

        watcher.stop().await.unwrap();
        assert!(changes.recv().await.is_none());
    }
}
