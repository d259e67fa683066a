use std::path::Path;

use serde::{Deserialize, Serialize};

/// Workspace metadata sourced from a conversation's `workspace.yaml`.
///
/// Despite the file extension, the grammar consumed here is a reduced
/// `key: value` subset — not general YAML. Anything a real YAML document
/// could additionally express (lists, nesting, quoting) is outside what any
/// caller is known to emit, and a line that doesn't match the grammar is
/// tolerated rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceMeta {
    pub repository: Option<String>,
    pub working_directory: Option<String>,
    pub summary: Option<String>,
}

impl WorkspaceMeta {
    /// The label a shell would show for this conversation: the repository
    /// if set, else the last path component of the working directory, else
    /// the literal string `"Unknown"`.
    pub fn project_name(&self) -> String {
        if let Some(repository) = self.repository.as_ref().filter(|s| !s.is_empty()) {
            return repository.clone();
        }
        if let Some(cwd) = self.working_directory.as_ref().filter(|s| !s.is_empty()) {
            if let Some(last) = Path::new(cwd).file_name().and_then(|n| n.to_str()) {
                return last.to_string();
            }
        }
        "Unknown".to_string()
    }
}

/// Parses the tiny key/value text format into a [`WorkspaceMeta`].
pub struct WorkspaceMetaParser;

impl WorkspaceMetaParser {
    /// Parses raw file content. Empty content yields a record with every
    /// field absent, never `None` — only a missing *file* is represented by
    /// the caller returning `None` before calling this.
    pub fn parse(content: &str) -> WorkspaceMeta {
        let mut meta = WorkspaceMeta::default();
        for line in content.lines() {
            let Some((key, value)) = split_key_value(line) else {
                continue;
            };
            match key {
                "repository" => meta.repository = Some(value.to_string()),
                "cwd" => meta.working_directory = Some(value.to_string()),
                "summary" => meta.summary = Some(value.to_string()),
                _ => {} // unknown keys are tolerated and ignored
            }
        }
        meta
    }

    /// Reads `path` and parses it; a missing file is represented as `None`
    /// at the caller, not here — this function assumes the file exists.
    pub async fn parse_path(path: &Path) -> Option<WorkspaceMeta> {
        let content = tokio::fs::read_to_string(path).await.ok()?;
        Some(Self::parse(&content))
    }
}

/// Splits `line` on the first `:` into a validated key and a trimmed value.
/// Keys must be `[A-Za-z0-9_]+`; colons inside the value are preserved.
fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let colon = line.find(':')?;
    let (key, rest) = line.split_at(colon);
    let key = key.trim();
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let value = rest[1..].trim();
    Some((key, value))
}
