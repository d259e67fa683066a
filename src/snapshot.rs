use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{AttentionError, Result};

/// One entry of a [`Snapshot`]: everything the diff routine needs to decide
/// whether a path changed, without ever hashing file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub modified: Option<SystemTime>,
    pub size: Option<u64>,
    pub is_directory: bool,
}

/// A full recursive enumeration of a root directory, keyed by path relative
/// to the (symlink-resolved) root. The root itself (an empty relative path)
/// is never a key.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: HashMap<PathBuf, EntryMeta>,
}

impl Snapshot {
    /// Walks `root` recursively. Enumerator errors for individual entries
    /// (e.g. permission denied partway through a subtree) are swallowed —
    /// the resulting snapshot simply omits what couldn't be read, and the
    /// next tick's snapshot will retry.
    pub fn capture(root: &Path) -> Result<Self> {
        let canonical_root = canonicalize_lossy(root);
        let mut entries = HashMap::new();

        for entry in walkdir::WalkDir::new(&canonical_root)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            let path = entry.path();
            let Ok(relative) = path.strip_prefix(&canonical_root) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue; // the root itself
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            entries.insert(
                relative.to_path_buf(),
                EntryMeta {
                    modified: metadata.modified().ok(),
                    size: (!metadata.is_dir()).then_some(metadata.len()),
                    is_directory: metadata.is_dir(),
                },
            );
        }

        if !canonical_root.is_dir() {
            return Err(AttentionError::CannotEnumerate {
                path: canonical_root,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "root vanished"),
            });
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn canonicalize_lossy(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// The kind of change the diff routine detected for one relative path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    /// Reserved for a future identity-preserving diff; the current diff
    /// never emits this — kernel-reported renames surface as a
    /// `(Deleted, Created)` pair instead, and callers must tolerate that.
    Renamed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub relative_path: PathBuf,
    pub kind: ChangeKind,
}

/// Compares two snapshots and returns the set of paths that changed.
///
/// A path present in both snapshots is `Modified` iff its `mtime` OR `size`
/// differ; content is never hashed, so a write that preserves both is
/// invisible (an accepted approximation — see the design notes).
pub fn diff(previous: &Snapshot, current: &Snapshot) -> Vec<Delta> {
    let mut deltas = Vec::new();

    for (path, current_meta) in &current.entries {
        match previous.entries.get(path) {
            None => deltas.push(Delta {
                relative_path: path.clone(),
                kind: ChangeKind::Created,
            }),
            Some(previous_meta) => {
                if previous_meta.modified != current_meta.modified
                    || previous_meta.size != current_meta.size
                {
                    deltas.push(Delta {
                        relative_path: path.clone(),
                        kind: ChangeKind::Modified,
                    });
                }
            }
        }
    }

    for path in previous.entries.keys() {
        if !current.entries.contains_key(path) {
            deltas.push(Delta {
                relative_path: path.clone(),
                kind: ChangeKind::Deleted,
            });
        }
    }

    deltas
}
