use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The type tag of one line in an `events.jsonl` file.
///
/// Unrecognized wire values decode to [`EventKind::Unknown`] rather than
/// failing the whole line — the analyzer tolerates unknown kinds by simply
/// never matching them against any rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UserMessage,
    AssistantTurnStart,
    AssistantTurnEnd,
    AssistantMessage,
    ToolExecutionStart,
    ToolExecutionComplete,
    Abort,
    SessionStart,
    #[serde(other)]
    Unknown,
}

/// A single tool invocation referenced from an [`EventPayload`].
///
/// Only presence/emptiness of `id` matters to the analyzer; `name` feeds the
/// human-readable approval reason, and `status` is currently unused but kept
/// so a future rule can read it without another wire-format migration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequest {
    #[serde(rename = "toolCallId", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "name", alias = "toolName", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// The `data` object of an event line. Every field is optional — the
/// analyzer never assumes a field is present just because the event's
/// `kind` usually carries it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    #[serde(rename = "turnId", default, skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "toolRequests", default, skip_serializing_if = "Vec::is_empty")]
    pub tool_requests: Vec<ToolRequest>,
    #[serde(rename = "toolCallId", default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(rename = "toolName", default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl EventPayload {
    pub fn is_empty(&self) -> bool {
        self == &EventPayload::default()
    }
}

/// One immutable line of a session's event log, decoded from JSON.
///
/// An `Event` is never mutated after construction; vectors of events flow
/// outward as plain values from [`crate::log_parser::LogParser`] into the
/// [`crate::analyzer`] module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_timestamp",
        serialize_with = "serialize_timestamp"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "data", default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<EventPayload>,
}

impl Event {
    pub fn tool_requests(&self) -> &[ToolRequest] {
        self.payload
            .as_ref()
            .map(|p| p.tool_requests.as_slice())
            .unwrap_or(&[])
    }

    pub fn content(&self) -> Option<&str> {
        self.payload.as_ref()?.content.as_deref()
    }

    pub fn turn_id(&self) -> Option<&str> {
        self.payload.as_ref()?.turn_id.as_deref()
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        self.payload.as_ref()?.tool_call_id.as_deref()
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.payload.as_ref()?.tool_name.as_deref()
    }
}

/// Either an RFC 3339 string or milliseconds-since-epoch; anything else
/// (including a string that fails to parse) becomes an absent timestamp
/// rather than a decode error for the whole event.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Millis(f64),
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| match raw {
        RawTimestamp::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .ok(),
        RawTimestamp::Millis(millis) => Utc.timestamp_millis_opt(millis as i64).single(),
    }))
}

fn serialize_timestamp<S>(
    timestamp: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match timestamp {
        Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
        None => serializer.serialize_none(),
    }
}
