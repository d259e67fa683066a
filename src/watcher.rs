use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::analyzer::StatusAnalyzer;
use crate::config::WatcherConfig;
use crate::conversation::{Conversation, StorageKind};
use crate::error::Result;
use crate::log_parser::LogParser;
use crate::observer::DirectoryObserver;
use crate::workspace_meta::WorkspaceMetaParser;

pub type Subscriber = Arc<dyn Fn(Vec<Conversation>) + Send + Sync>;

struct Inner {
    root: Option<PathBuf>,
    started_at: Option<SystemTime>,
    subscriber: Option<Subscriber>,
    latest_attention_list: Vec<Conversation>,
    debounce_task: Option<JoinHandle<()>>,
}

/// The public orchestrator: wires [`DirectoryObserver`] to a scan-and-dispatch
/// pipeline, debounces bursts of changes, and filters by the start-time
/// watermark before a subscriber ever sees a conversation.
pub struct AttentionWatcher {
    inner: Arc<Mutex<Inner>>,
    observer: Arc<DirectoryObserver>,
    config: WatcherConfig,
    active: Arc<AtomicBool>,
}

impl AttentionWatcher {
    pub fn new(config: WatcherConfig) -> Self {
        let observer = Arc::new(DirectoryObserver::new(config.poll_interval.into()));
        Self {
            inner: Arc::new(Mutex::new(Inner {
                root: None,
                started_at: None,
                subscriber: None,
                latest_attention_list: Vec::new(),
                debounce_task: None,
            })),
            observer,
            config,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Begins observing `root`. The provided `subscriber` is invoked with the
    /// current attention list after each debounced, watermark-filtered scan.
    pub async fn start<F>(&self, root: &Path, subscriber: F) -> Result<()>
    where
        F: Fn(Vec<Conversation>) + Send + Sync + 'static,
    {
        let started_at = SystemTime::now();
        {
            let mut guard = self.inner.lock().await;
            guard.root = Some(root.to_path_buf());
            guard.started_at = Some(started_at);
            guard.subscriber = Some(Arc::new(subscriber));
            guard.latest_attention_list.clear();
        }

        let inner = self.inner.clone();
        let config = self.config.clone();
        let active = self.active.clone();

        self.observer
            .start(root, move |_changes| {
                let inner = inner.clone();
                let config = config.clone();
                let active = active.clone();
                // Fire-and-forget: the debounce task itself is what actually
                // reschedules, below, via a blocking call into `inner`.
                tokio::spawn(async move {
                    schedule_debounced_scan(inner, config, active).await;
                });
            })
            .await?;

        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Cancels the observer, any pending debounced scan, and clears the
    /// watermark. Idempotent and safe to call unconditionally.
    pub async fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.observer.stop().await;

        let mut guard = self.inner.lock().await;
        if let Some(handle) = guard.debounce_task.take() {
            handle.abort();
        }
        guard.root = None;
        guard.started_at = None;
        guard.subscriber = None;
    }

    /// A synchronous-feeling snapshot of the last dispatched attention list.
    /// Does not trigger a new scan.
    pub async fn current_attention_list(&self) -> Vec<Conversation> {
        self.inner.lock().await.latest_attention_list.clone()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Cancels any in-flight debounce timer and starts a fresh one. Only the
/// *last* call within `debounce_interval` actually runs the scan.
async fn schedule_debounced_scan(inner: Arc<Mutex<Inner>>, config: WatcherConfig, active: Arc<AtomicBool>) {
    let mut guard = inner.lock().await;
    if let Some(handle) = guard.debounce_task.take() {
        handle.abort();
    }

    let inner_for_task = inner.clone();
    let debounce_interval = config.debounce_interval.into();
    let max_message_chars = config.max_message_chars;
    let handle = tokio::spawn(async move {
        tokio::time::sleep(debounce_interval).await;
        if !active.load(Ordering::SeqCst) {
            return;
        }
        run_scan_and_dispatch(inner_for_task, max_message_chars).await;
    });
    guard.debounce_task = Some(handle);
}

async fn run_scan_and_dispatch(inner: Arc<Mutex<Inner>>, max_message_chars: usize) {
    let (root, started_at, subscriber) = {
        let guard = inner.lock().await;
        let Some(root) = guard.root.clone() else { return };
        let Some(started_at) = guard.started_at else { return };
        let Some(subscriber) = guard.subscriber.clone() else { return };
        (root, started_at, subscriber)
    };

    let conversations = scan_root(&root, max_message_chars).await;
    let attention_list: Vec<Conversation> = conversations
        .into_iter()
        .filter(|c| c.requires_attention() && c.last_modified >= started_at)
        .collect();

    let mut attention_list = attention_list;
    attention_list.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

    {
        let mut guard = inner.lock().await;
        guard.latest_attention_list = attention_list.clone();
    }

    subscriber(attention_list);
}

/// Enumerates `root`'s immediate children and builds a [`Conversation`] for
/// each recognized entry. Individual parse failures are skipped, not fatal.
async fn scan_root(root: &Path, max_message_chars: usize) -> Vec<Conversation> {
    let analyzer = StatusAnalyzer::new(max_message_chars);
    let mut conversations = Vec::new();

    let mut read_dir = match tokio::fs::read_dir(root).await {
        Ok(read_dir) => read_dir,
        Err(err) => {
            tracing::debug!(error = %err, path = %root.display(), "failed to enumerate root during scan");
            return conversations;
        }
    };

    loop {
        let entry = match read_dir.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(error = %err, "failed to read next directory entry during scan");
                break;
            }
        };

        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }

        let path = entry.path();
        let Ok(file_type) = entry.file_type().await else {
            continue;
        };

        let conversation = if file_type.is_dir() {
            build_folder_conversation(&path, name, &analyzer).await
        } else if name.ends_with(".jsonl") {
            build_flat_conversation(&path, name, &analyzer).await
        } else {
            None
        };

        if let Some(conversation) = conversation {
            conversations.push(conversation);
        }
    }

    conversations
}

async fn build_folder_conversation(
    dir: &Path,
    dir_name: &str,
    analyzer: &StatusAnalyzer,
) -> Option<Conversation> {
    let events_path = dir.join("events.jsonl");
    let metadata = tokio::fs::metadata(&events_path).await.ok()?;
    if !metadata.is_file() {
        return None;
    }

    let events = match LogParser::parse_path(&events_path).await {
        Ok(events) => events,
        Err(err) => {
            tracing::debug!(error = %err, path = %events_path.display(), "skipping conversation, events.jsonl unreadable");
            return None;
        }
    };
    let last_modified = metadata.modified().ok()?;
    let status = analyzer.analyze(&events);

    let workspace_path = dir.join("workspace.yaml");
    let metadata = WorkspaceMetaParser::parse_path(&workspace_path).await;

    Some(Conversation {
        id: dir_name.to_string(),
        storage_kind: StorageKind::Folder,
        event_count: events.len(),
        last_modified,
        metadata,
        status,
    })
}

async fn build_flat_conversation(
    path: &Path,
    file_name: &str,
    analyzer: &StatusAnalyzer,
) -> Option<Conversation> {
    let events = match LogParser::parse_path(path).await {
        Ok(events) => events,
        Err(err) => {
            tracing::debug!(error = %err, path = %path.display(), "skipping conversation, log file unreadable");
            return None;
        }
    };
    let metadata = tokio::fs::metadata(path).await.ok()?;
    let last_modified = metadata.modified().ok()?;
    let status = analyzer.analyze(&events);
    let id = file_name.strip_suffix(".jsonl").unwrap_or(file_name).to_string();

    Some(Conversation {
        id,
        storage_kind: StorageKind::Flat,
        event_count: events.len(),
        last_modified,
        metadata: None,
        status,
    })
}
