//! Derives a per-conversation "does this need the user's attention right
//! now?" verdict from a coding agent's append-only session logs.
//!
//! The root directory holds one subtree or flat file per conversation; each
//! is an append-only JSONL event log. [`watcher::AttentionWatcher`] is the
//! entry point most callers want: it watches the root, re-scans on change,
//! and delivers the current attention list to a subscriber.

pub mod analyzer;
pub mod config;
pub mod conversation;
pub mod error;
pub mod event;
pub mod log_parser;
pub mod observer;
pub mod snapshot;
pub mod status;
pub mod watcher;
pub mod workspace_meta;

pub use analyzer::StatusAnalyzer;
pub use config::WatcherConfig;
pub use conversation::{Conversation, StorageKind};
pub use error::{AttentionError, Result};
pub use event::{Event, EventKind, EventPayload, ToolRequest};
pub use log_parser::LogParser;
pub use observer::{ChangeRecord, DirectoryObserver};
pub use snapshot::{ChangeKind, Delta, Snapshot};
pub use status::{ConversationStatus, StatusCode};
pub use watcher::AttentionWatcher;
pub use workspace_meta::{WorkspaceMeta, WorkspaceMetaParser};
