use std::path::PathBuf;

use thiserror::Error;

/// Unified error taxonomy for the crate.
///
/// Only the `start`-time variants ([`AttentionError::RootNotADirectory`] and
/// [`AttentionError::CannotOpenRoot`]) ever reach a caller. The remaining
/// variants are constructed internally purely so that call sites have a
/// typed value to log (`tracing::warn!`/`tracing::debug!`) — they never
/// escape the component that produced them.
#[derive(Debug, Error)]
pub enum AttentionError {
    #[error("root path is not a directory: {0}")]
    RootNotADirectory(PathBuf),

    #[error("cannot open root for notification: {0}")]
    CannotOpenRoot(#[source] notify::Error),

    #[error("cannot enumerate directory tree at {path}: {source}")]
    CannotEnumerate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read log file {path}: {source}")]
    IoReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Constructed only to give a skipped JSONL line something typed to
    /// trace-log; never returned from any function. A malformed or
    /// truncated line must never poison the rest of the stream.
    #[error("failed to decode event line: {source}")]
    ParseDecodeError {
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, AttentionError>;
