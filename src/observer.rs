use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::error::{AttentionError, Result};
use crate::snapshot::{canonicalize_lossy, diff, ChangeKind, Snapshot};

/// One deduplicated change detected by the observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub absolute_path: PathBuf,
    pub kind: ChangeKind,
    pub detected_at: DateTime<Utc>,
}

struct Inner {
    // Keyed by absolute path so that multiple reports for the same path
    // accumulated since the last `drain` collapse to the most recent one
    // (last-write-wins), matching the dedup rule in the design notes.
    buffered: HashMap<PathBuf, ChangeRecord>,
    previous_snapshot: Snapshot,
    // Kept alive only to hold the kernel-level watch open; dropping it on
    // `stop` unregisters the notification.
    _kernel_watcher: Option<RecommendedWatcher>,
    poll_task: Option<JoinHandle<()>>,
    dispatch_task: Option<JoinHandle<()>>,
}

/// A recursive, deduplicated change stream over a root directory.
///
/// Combines a kernel-level push source (fires on structural changes but is
/// unreliable for writes deep in a subtree on some platforms) with a
/// periodic pull source (a full snapshot diff) so that neither blind spot
/// is left uncovered. See the crate's design notes: do not remove one
/// without the other.
pub struct DirectoryObserver {
    inner: Arc<Mutex<Inner>>,
    poll_interval: Duration,
}

impl DirectoryObserver {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                buffered: HashMap::new(),
                previous_snapshot: Snapshot::default(),
                _kernel_watcher: None,
                poll_task: None,
                dispatch_task: None,
            })),
            poll_interval,
        }
    }

    /// Begins observing `root`. `on_change` is invoked with every
    /// non-empty batch of deduplicated deltas from a single diff pass; it
    /// may be called from either the push or pull source's schedule.
    pub async fn start<F>(&self, root: &Path, on_change: F) -> Result<()>
    where
        F: Fn(Vec<ChangeRecord>) + Send + Sync + 'static,
    {
        if !root.is_dir() {
            return Err(AttentionError::RootNotADirectory(root.to_path_buf()));
        }
        let canonical_root = canonicalize_lossy(root);
        let initial_snapshot = Snapshot::capture(&canonical_root)?;

        let (trigger_tx, mut trigger_rx) = mpsc::unbounded_channel::<()>();

        let tx_for_kernel = trigger_tx.clone();
        let kernel_watcher = notify::recommended_watcher(move |_event: notify::Result<notify::Event>| {
            let _ = tx_for_kernel.send(());
        })
        .map_err(AttentionError::CannotOpenRoot)?;

        let mut kernel_watcher = kernel_watcher;
        kernel_watcher
            .watch(&canonical_root, RecursiveMode::Recursive)
            .map_err(AttentionError::CannotOpenRoot)?;

        let poll_interval = self.poll_interval;
        let tx_for_poll = trigger_tx.clone();
        let poll_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.tick().await; // first tick fires immediately; skip it, the initial snapshot already covers t0
            loop {
                ticker.tick().await;
                if tx_for_poll.send(()).is_err() {
                    break;
                }
            }
        });

        let inner = self.inner.clone();
        let root_for_dispatch = canonical_root.clone();
        let on_change = Arc::new(on_change);
        let dispatch_task = tokio::spawn(async move {
            while trigger_rx.recv().await.is_some() {
                // Drain any further signals that queued up while we were busy;
                // a burst of kernel events collapses into one diff pass.
                while trigger_rx.try_recv().is_ok() {}

                let snapshot = match Snapshot::capture(&root_for_dispatch) {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        tracing::warn!(error = %err, "snapshot enumeration failed, will retry next tick");
                        continue;
                    }
                };

                let mut guard = inner.lock().await;
                let deltas = diff(&guard.previous_snapshot, &snapshot);
                guard.previous_snapshot = snapshot;

                if deltas.is_empty() {
                    continue;
                }

                let detected_at = Utc::now();
                let records: Vec<ChangeRecord> = deltas
                    .into_iter()
                    .map(|delta| ChangeRecord {
                        absolute_path: root_for_dispatch.join(&delta.relative_path),
                        kind: delta.kind,
                        detected_at,
                    })
                    .collect();

                for record in &records {
                    guard.buffered.insert(record.absolute_path.clone(), record.clone());
                }
                drop(guard);

                on_change(records);
            }
        });

        let mut guard = self.inner.lock().await;
        guard.previous_snapshot = initial_snapshot;
        guard._kernel_watcher = Some(kernel_watcher);
        guard.poll_task = Some(poll_task);
        guard.dispatch_task = Some(dispatch_task);

        Ok(())
    }

    /// Idempotent. Cancels the poll loop, the dispatch task, and drops the
    /// kernel watcher so its file descriptor is released.
    pub async fn stop(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(handle) = guard.poll_task.take() {
            handle.abort();
        }
        if let Some(handle) = guard.dispatch_task.take() {
            handle.abort();
        }
        guard._kernel_watcher = None;
    }

    /// Returns any buffered changes since the last `drain` call and resets
    /// the buffer. Multiple reports for the same path collapse to the most
    /// recent one.
    pub async fn drain(&self) -> Vec<ChangeRecord> {
        let mut guard = self.inner.lock().await;
        std::mem::take(&mut guard.buffered).into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn start_fails_on_non_directory_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, b"x").unwrap();

        let observer = DirectoryObserver::new(StdDuration::from_millis(50));
        let result = observer.start(&file, |_| {}).await;
        assert!(matches!(result, Err(AttentionError::RootNotADirectory(_))));
    }

    #[tokio::test]
    async fn detects_a_new_file_within_a_few_poll_ticks() {
        let dir = tempfile::tempdir().unwrap();
        let observer = DirectoryObserver::new(StdDuration::from_millis(30));
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();

        observer
            .start(dir.path(), move |changes| {
                if !changes.is_empty() {
                    seen_clone.fetch_add(changes.len(), Ordering::SeqCst);
                }
            })
            .await
            .unwrap();

        std::fs::write(dir.path().join("new.txt"), b"hello").unwrap();

        tokio::time::sleep(StdDuration::from_millis(300)).await;
        assert!(seen.load(Ordering::SeqCst) >= 1);

        observer.stop().await;
    }

    #[tokio::test]
    async fn drain_returns_and_resets_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let observer = DirectoryObserver::new(StdDuration::from_millis(30));
        observer.start(dir.path(), |_| {}).await.unwrap();

        std::fs::write(dir.path().join("new.txt"), b"hello").unwrap();
        tokio::time::sleep(StdDuration::from_millis(300)).await;

        let first_drain = observer.drain().await;
        assert!(!first_drain.is_empty());

        let second_drain = observer.drain().await;
        assert!(second_drain.is_empty());

        observer.stop().await;
    }

    #[tokio::test]
    async fn repeated_writes_to_the_same_path_collapse_to_one_buffered_record() {
        let dir = tempfile::tempdir().unwrap();
        let observer = DirectoryObserver::new(StdDuration::from_millis(20));
        let file = dir.path().join("same.txt");

        observer.start(dir.path(), |_| {}).await.unwrap();

        for i in 0..5 {
            std::fs::write(&file, format!("body {i}")).unwrap();
            tokio::time::sleep(StdDuration::from_millis(25)).await;
        }
        tokio::time::sleep(StdDuration::from_millis(100)).await;

        let drained = observer.drain().await;
        let matching: Vec<_> = drained
            .iter()
            .filter(|record| record.absolute_path == canonicalize_lossy(&file))
            .collect();
        assert_eq!(matching.len(), 1);

        observer.stop().await;
    }
}
