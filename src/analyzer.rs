use std::collections::HashSet;

use crate::event::{Event, EventKind};
use crate::status::{ConversationStatus, StatusCode};

/// Pure function from an event history to a [`ConversationStatus`].
///
/// Deterministic, no I/O: the same `events` slice always yields the same
/// status. Callers re-run this on every scan rather than caching, since it
/// is cheap CPU work relative to the filesystem reads that feed it.
pub struct StatusAnalyzer {
    max_message_chars: usize,
}

impl StatusAnalyzer {
    pub fn new(max_message_chars: usize) -> Self {
        Self { max_message_chars }
    }

    pub fn analyze(&self, events: &[Event]) -> ConversationStatus {
        if events.is_empty() {
            return ConversationStatus::empty("No events");
        }

        let scoped = scope_to_current_session(events);
        if scoped.is_empty() {
            return ConversationStatus::empty("No events in current session");
        }

        if let Some(status) = self.pending_approval(scoped) {
            return status;
        }

        self.classify_turns(scoped)
    }

    /// Step 3 — pending-approval detection, which takes precedence over the
    /// turn-based rules in [`Self::classify_turns`]. Returns `None` if an
    /// `abort` was seen anywhere in `scoped` (approval detection is
    /// abandoned entirely in that case) or if no tool is currently pending.
    fn pending_approval(&self, scoped: &[Event]) -> Option<ConversationStatus> {
        let mut started: Vec<&Event> = Vec::new();
        let mut completed_ids: HashSet<&str> = HashSet::new();

        for event in scoped {
            match event.kind {
                EventKind::ToolExecutionStart => {
                    if event.tool_call_id().is_some() {
                        started.push(event);
                    }
                }
                EventKind::ToolExecutionComplete => {
                    if let Some(id) = event.tool_call_id() {
                        completed_ids.insert(id);
                    }
                }
                EventKind::Abort => return None,
                _ => {}
            }
        }

        let pending_start = started
            .into_iter()
            .rev()
            .find(|event| {
                event
                    .tool_call_id()
                    .is_some_and(|id| !completed_ids.contains(id))
            })?;

        let reason = match pending_start.tool_name() {
            Some(name) => format!("Tool '{name}' waiting for approval"),
            None => "Tool waiting for approval".to_string(),
        };

        Some(ConversationStatus {
            code: StatusCode::WaitingForApproval,
            reason,
            turn_id: None,
            last_message: None,
            timestamp: scoped.last().and_then(|e| e.timestamp),
        })
    }

    /// Step 4 — turn-based classification once no tool is pending approval.
    fn classify_turns(&self, scoped: &[Event]) -> ConversationStatus {
        let last_index = |kind: EventKind| -> Option<usize> {
            scoped.iter().rposition(|e| e.kind == kind)
        };

        let user_index = last_index(EventKind::UserMessage);
        let turn_end_index = last_index(EventKind::AssistantTurnEnd);
        let turn_start_index = last_index(EventKind::AssistantTurnStart);

        let timestamp = scoped.last().and_then(|e| e.timestamp);

        if let (Some(start), end) = (turn_start_index, turn_end_index) {
            if end.is_none_or(|end| start > end) {
                return ConversationStatus {
                    code: StatusCode::Processing,
                    reason: "Agent is processing".to_string(),
                    turn_id: scoped[start].turn_id().map(str::to_string),
                    last_message: None,
                    timestamp,
                };
            }
        }

        if let Some(end) = turn_end_index {
            let turn_closed_after_last_user_input = user_index.is_none_or(|user| end > user);
            if turn_closed_after_last_user_input {
                return self.after_turn_end(scoped, end, timestamp);
            }
        }

        if let Some(user) = user_index {
            if turn_end_index.is_none_or(|end| user > end) {
                return ConversationStatus {
                    code: StatusCode::UserWaiting,
                    reason: "Waiting for agent to respond".to_string(),
                    turn_id: None,
                    last_message: None,
                    timestamp: scoped[user].timestamp,
                };
            }
        }

        ConversationStatus::unknown()
    }

    /// Determines whether a closed turn left the agent waiting for the user
    /// (it replied with text and no tool calls) or simply `ready` (a bare
    /// turn-end, or a reply that still carried tool requests).
    fn after_turn_end(
        &self,
        scoped: &[Event],
        end_index: usize,
        timestamp: Option<chrono::DateTime<chrono::Utc>>,
    ) -> ConversationStatus {
        for event in scoped[..end_index].iter().rev() {
            match event.kind {
                EventKind::AssistantMessage => {
                    if event.tool_requests().is_empty() {
                        let last_message = event.content().map(|c| truncate(c, self.max_message_chars));
                        return ConversationStatus {
                            code: StatusCode::WaitingForUser,
                            reason: "Agent completed turn, awaiting user response".to_string(),
                            turn_id: None,
                            last_message,
                            timestamp,
                        };
                    }
                    break;
                }
                EventKind::AssistantTurnStart => break,
                _ => {}
            }
        }

        ConversationStatus {
            code: StatusCode::Ready,
            reason: "Turn ended with no textual reply".to_string(),
            turn_id: None,
            last_message: None,
            timestamp,
        }
    }
}

/// Step 1 — session scoping: if any `session-start` exists, only events
/// strictly after the last one are "current session" events — the marker
/// itself is a scoping boundary, not session content. A log containing only
/// a fresh `session-start` (the agent just restarted, nothing logged yet)
/// therefore scopes to an empty slice rather than a singleton.
fn scope_to_current_session(events: &[Event]) -> &[Event] {
    match events.iter().rposition(|e| e.kind == EventKind::SessionStart) {
        Some(index) => &events[index + 1..],
        None => events,
    }
}

/// Truncates `text` to at most `max_chars` `char`s, which matches the
/// truncation width closely enough for the ASCII and common Unicode text
/// these logs carry; this is a display truncation, not a byte-safety
/// boundary.
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventPayload;

    fn event(kind: EventKind) -> Event {
        Event {
            kind,
            timestamp: None,
            payload: None,
        }
    }

    fn with_payload(kind: EventKind, payload: EventPayload) -> Event {
        Event {
            kind,
            timestamp: None,
            payload: Some(payload),
        }
    }

    fn analyzer() -> StatusAnalyzer {
        StatusAnalyzer::new(200)
    }

    #[test]
    fn empty_input_is_empty() {
        let status = analyzer().analyze(&[]);
        assert_eq!(status.code, StatusCode::Empty);
        assert_eq!(status.reason, "No events");
    }

    #[test]
    fn no_events_at_all_and_empty_after_scoping_report_distinct_reasons() {
        let no_events_status = analyzer().analyze(&[]);
        assert_eq!(no_events_status.code, StatusCode::Empty);
        assert_eq!(no_events_status.reason, "No events");

        // A lone session-start with nothing logged since (agent just
        // restarted) scopes to an empty slice, which must be reported with
        // a distinct reason from "no events at all".
        let fresh_session_status = analyzer().analyze(&[event(EventKind::SessionStart)]);
        assert_eq!(fresh_session_status.code, StatusCode::Empty);
        assert_eq!(fresh_session_status.reason, "No events in current session");

        assert_ne!(no_events_status.reason, fresh_session_status.reason);
    }

    #[test]
    fn scoping_excludes_the_session_start_marker_itself() {
        let scoped = scope_to_current_session(&[event(EventKind::SessionStart)]);
        assert!(scoped.is_empty());
    }

    #[test]
    fn lone_turn_end_is_ready() {
        let events = vec![event(EventKind::AssistantTurnEnd)];
        let status = analyzer().analyze(&events);
        assert_eq!(status.code, StatusCode::Ready);
    }

    #[test]
    fn lone_user_message_is_user_waiting() {
        let events = vec![event(EventKind::UserMessage)];
        let status = analyzer().analyze(&events);
        assert_eq!(status.code, StatusCode::UserWaiting);
    }

    #[test]
    fn turn_end_after_tool_requests_is_ready_not_waiting_for_user() {
        let events = vec![
            event(EventKind::UserMessage),
            event(EventKind::AssistantTurnStart),
            with_payload(
                EventKind::AssistantMessage,
                EventPayload {
                    tool_requests: vec![crate::event::ToolRequest {
                        name: Some("bash".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            ),
            event(EventKind::AssistantTurnEnd),
        ];
        let status = analyzer().analyze(&events);
        assert_eq!(status.code, StatusCode::Ready);
    }

    #[test]
    fn scenario_waiting_for_user_after_completed_turn() {
        let events = vec![
            event(EventKind::UserMessage),
            event(EventKind::AssistantTurnStart),
            with_payload(
                EventKind::AssistantMessage,
                EventPayload {
                    content: Some("I've completed the task.".to_string()),
                    ..Default::default()
                },
            ),
            event(EventKind::AssistantTurnEnd),
        ];
        let status = analyzer().analyze(&events);
        assert_eq!(status.code, StatusCode::WaitingForUser);
        assert_eq!(status.reason, "Agent completed turn, awaiting user response");
        assert_eq!(status.last_message.as_deref(), Some("I've completed the task."));
    }

    #[test]
    fn scenario_processing() {
        let events = vec![
            event(EventKind::UserMessage),
            with_payload(
                EventKind::AssistantTurnStart,
                EventPayload {
                    turn_id: Some("turn-123".to_string()),
                    ..Default::default()
                },
            ),
        ];
        let status = analyzer().analyze(&events);
        assert_eq!(status.code, StatusCode::Processing);
        assert_eq!(status.turn_id.as_deref(), Some("turn-123"));
    }

    #[test]
    fn scenario_pending_bash_approval() {
        let events = vec![
            event(EventKind::UserMessage),
            event(EventKind::AssistantTurnStart),
            with_payload(
                EventKind::AssistantMessage,
                EventPayload {
                    tool_requests: vec![crate::event::ToolRequest {
                        name: Some("bash".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            ),
            with_payload(
                EventKind::ToolExecutionStart,
                EventPayload {
                    tool_call_id: Some("call_1".to_string()),
                    tool_name: Some("bash".to_string()),
                    ..Default::default()
                },
            ),
        ];
        let status = analyzer().analyze(&events);
        assert_eq!(status.code, StatusCode::WaitingForApproval);
        assert!(status.reason.contains("bash"));
        assert!(status.reason.contains("approval"));
    }

    #[test]
    fn scenario_multi_session_old_abort_ignored() {
        let events = vec![
            event(EventKind::SessionStart),
            event(EventKind::UserMessage),
            event(EventKind::AssistantTurnStart),
            with_payload(
                EventKind::ToolExecutionStart,
                EventPayload {
                    tool_call_id: Some("old".to_string()),
                    ..Default::default()
                },
            ),
            event(EventKind::Abort),
            event(EventKind::SessionStart),
            event(EventKind::UserMessage),
            event(EventKind::AssistantTurnStart),
            with_payload(
                EventKind::AssistantMessage,
                EventPayload {
                    content: Some("Build succeeded".to_string()),
                    ..Default::default()
                },
            ),
            event(EventKind::AssistantTurnEnd),
        ];
        let status = analyzer().analyze(&events);
        assert_eq!(status.code, StatusCode::WaitingForUser);
        assert_eq!(status.last_message.as_deref(), Some("Build succeeded"));
    }

    #[test]
    fn scenario_abort_clears_pending() {
        let events = vec![
            event(EventKind::UserMessage),
            event(EventKind::AssistantTurnStart),
            with_payload(
                EventKind::ToolExecutionStart,
                EventPayload {
                    tool_call_id: Some("c1".to_string()),
                    ..Default::default()
                },
            ),
            event(EventKind::Abort),
        ];
        let status = analyzer().analyze(&events);
        assert_ne!(status.code, StatusCode::WaitingForApproval);
    }

    #[test]
    fn last_message_is_truncated_to_configured_width() {
        let long_message = "x".repeat(500);
        let events = vec![
            event(EventKind::UserMessage),
            event(EventKind::AssistantTurnStart),
            with_payload(
                EventKind::AssistantMessage,
                EventPayload {
                    content: Some(long_message),
                    ..Default::default()
                },
            ),
            event(EventKind::AssistantTurnEnd),
        ];
        let status = StatusAnalyzer::new(200).analyze(&events);
        assert_eq!(status.last_message.as_ref().unwrap().chars().count(), 200);
    }

    #[test]
    fn is_pure_same_input_same_output() {
        let events = vec![
            event(EventKind::UserMessage),
            event(EventKind::AssistantTurnStart),
        ];
        let a = analyzer().analyze(&events);
        let b = analyzer().analyze(&events);
        assert_eq!(a, b);
    }
}
