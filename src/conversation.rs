use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::status::ConversationStatus;
use crate::workspace_meta::WorkspaceMeta;

/// Where a conversation's log lives on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// A directory containing `events.jsonl` and optionally `workspace.yaml`.
    Folder,
    /// A bare `<id>.jsonl` file sitting directly under the root.
    Flat,
}

/// One discovered session, synthesized fresh on every scan. Conversations
/// have no identity across restarts beyond their `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub storage_kind: StorageKind,
    pub event_count: usize,
    #[serde(with = "system_time_as_unix_millis")]
    pub last_modified: SystemTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<WorkspaceMeta>,
    pub status: ConversationStatus,
}

impl Conversation {
    pub fn requires_attention(&self) -> bool {
        self.status.code.is_attention_required()
    }
}

mod system_time_as_unix_millis {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = value
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SystemTime, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_millis(millis))
    }
}
