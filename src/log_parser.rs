use std::path::Path;

use crate::error::{AttentionError, Result};
use crate::event::Event;

/// Converts a text blob of newline-delimited JSON records into an ordered
/// sequence of [`Event`]s, tolerating partial trailing lines and malformed
/// entries.
///
/// Event logs are appended concurrently by a separate process that may be
/// mid-write when we read them; a truncated final line is normal and must
/// never poison the rest of the stream. Decode failures are therefore
/// skipped silently rather than surfaced as errors.
pub struct LogParser;

impl LogParser {
    /// Parses a blob of newline-delimited JSON into events, skipping any
    /// line that does not decode as a well-formed `Event`.
    pub fn parse_bytes(bytes: &[u8]) -> Vec<Event> {
        let text = String::from_utf8_lossy(bytes);
        Self::parse_str(&text)
    }

    pub fn parse_str(text: &str) -> Vec<Event> {
        text.trim()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match serde_json::from_str::<Event>(line) {
                Ok(event) => Some(event),
                Err(source) => {
                    let err = AttentionError::ParseDecodeError { source };
                    tracing::trace!(error = %err, "skipping malformed event line");
                    None
                }
            })
            .collect()
    }

    /// Reads the entire file as UTF-8 and parses it. Only I/O failures
    /// propagate — individual bad lines are still skipped silently.
    pub async fn parse_path(path: &Path) -> Result<Vec<Event>> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| AttentionError::IoReadError {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::parse_bytes(&bytes))
    }

    /// True iff at least one line of `bytes` parses as valid JSON (not
    /// necessarily a valid `Event` — this is a loose sniff test, not a
    /// validation pass).
    pub fn looks_like_line_delimited_json(bytes: &[u8]) -> bool {
        let text = String::from_utf8_lossy(bytes);
        text.trim()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .any(|line| serde_json::from_str::<serde_json::Value>(line).is_ok())
    }
}
