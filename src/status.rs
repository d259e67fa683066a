use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The verdict the [`crate::analyzer`] module assigns to one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Empty,
    Processing,
    WaitingForUser,
    WaitingForApproval,
    UserWaiting,
    Ready,
    Unknown,
}

impl StatusCode {
    /// `waiting-for-user` and `waiting-for-approval` are collectively the
    /// attention-required codes; every component agrees on this set.
    pub fn is_attention_required(self) -> bool {
        matches!(self, StatusCode::WaitingForUser | StatusCode::WaitingForApproval)
    }
}

/// A tagged status value: exactly one [`StatusCode`] plus the details that
/// code's rule produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStatus {
    pub code: StatusCode,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<String>,
    /// Truncated to `WatcherConfig::max_message_chars` by the analyzer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ConversationStatus {
    pub fn empty(reason: &str) -> Self {
        Self {
            code: StatusCode::Empty,
            reason: reason.to_string(),
            turn_id: None,
            last_message: None,
            timestamp: None,
        }
    }

    pub fn unknown() -> Self {
        Self {
            code: StatusCode::Unknown,
            reason: "Unable to determine state".to_string(),
            turn_id: None,
            last_message: None,
            timestamp: None,
        }
    }
}
