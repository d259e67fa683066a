use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunable knobs for the watcher, the observer, and the analyzer.
///
/// Loading this from a file or from environment variables is a host concern
/// (see the crate's top-level docs) — the core only defines the shape and
/// the literal default values this crate ships with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WatcherConfig {
    /// Interval of the pull-source poll loop inside the [`crate::observer::DirectoryObserver`].
    pub poll_interval: DurationMillis,
    /// Debounce window the [`crate::watcher::AttentionWatcher`] waits after the
    /// last observed change before re-scanning and dispatching to the subscriber.
    pub debounce_interval: DurationMillis,
    /// Width, in `char`s, that `last-message` is truncated to.
    pub max_message_chars: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: DurationMillis(Duration::from_secs(1)),
            debounce_interval: DurationMillis(Duration::from_millis(500)),
            max_message_chars: 200,
        }
    }
}

/// A `Duration` newtype that (de)serializes as whole milliseconds, so
/// `WatcherConfig` round-trips cleanly through JSON/TOML without pulling in
/// a `serde_with` dependency for a single field shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DurationMillis(pub Duration);

impl From<DurationMillis> for Duration {
    fn from(value: DurationMillis) -> Self {
        value.0
    }
}

impl Serialize for DurationMillis {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0.as_millis() as u64)
    }
}

impl<'de> Deserialize<'de> for DurationMillis {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(DurationMillis(Duration::from_millis(millis)))
    }
}
