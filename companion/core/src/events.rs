//! Hook Events
//!
//! Lifecycle events delivered by the host tool. One record arrives per
//! occurrence (session start, tool use, stop, session end). Parsing is
//! tolerant: unknown fields are ignored and every field except the event
//! name is optional.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output fragments that mark a tool result as failed
const ERROR_PATTERNS: [&str; 5] = ["error:", "Error:", "ERROR", "failed", "ENOENT"];

/// One lifecycle event from the host tool
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HookEvent {
    /// Event name (`SessionStart`, `PreToolUse`, `post-tool`, ...)
    #[serde(default, rename = "hook_event_name", alias = "event_name")]
    pub event_name: String,

    /// Name of the tool for tool events
    #[serde(default)]
    pub tool_name: Option<String>,

    /// Explicit success flag for post-tool events
    #[serde(default)]
    pub tool_result_ok: Option<bool>,

    /// Raw tool result, inspected when no explicit flag is present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<Value>,

    /// Host session identifier
    #[serde(default)]
    pub session_id: Option<String>,
}

impl HookEvent {
    /// Build an event with only a name
    pub fn named(event_name: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            ..Self::default()
        }
    }

    /// Attach a tool name
    #[must_use]
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool_name = Some(tool.into());
        self
    }

    /// Attach an explicit tool outcome
    #[must_use]
    pub fn with_result_ok(mut self, ok: bool) -> Self {
        self.tool_result_ok = Some(ok);
        self
    }

    /// Parse an event from its JSON form
    ///
    /// # Errors
    ///
    /// Returns the decode error for input that is not a JSON object with
    /// compatible field types.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// Classified event kind
    #[must_use]
    pub fn kind(&self) -> EventKind {
        EventKind::parse(&self.event_name)
    }

    /// Whether the tool completed successfully
    ///
    /// An explicit `tool_result_ok` wins; otherwise the raw result is
    /// scanned for failure markers.
    #[must_use]
    pub fn tool_succeeded(&self) -> bool {
        self.tool_result_ok
            .unwrap_or_else(|| !detect_tool_error(self.tool_result.as_ref()))
    }
}

/// Closed set of recognised event kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Host session started
    SessionStart,
    /// A tool is about to run
    PreToolUse,
    /// A tool finished
    PostToolUse,
    /// The agent finished its turn
    Stop,
    /// Host session ended
    SessionEnd,
    /// Informational notification
    Notification,
    /// Anything else
    Unknown,
}

impl EventKind {
    /// Classify an event name; never fails
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "SessionStart" | "session-start" => Self::SessionStart,
            "PreToolUse" | "pre-tool" => Self::PreToolUse,
            "PostToolUse" | "post-tool" => Self::PostToolUse,
            "Stop" | "stop" => Self::Stop,
            "SessionEnd" | "session-end" => Self::SessionEnd,
            "Notification" | "notification" => Self::Notification,
            _ => Self::Unknown,
        }
    }

    /// Whether events of this kind concern a specific tool
    #[must_use]
    pub fn is_tool_event(self) -> bool {
        matches!(self, Self::PreToolUse | Self::PostToolUse)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SessionStart => "SessionStart",
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
            Self::Stop => "Stop",
            Self::SessionEnd => "SessionEnd",
            Self::Notification => "Notification",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Inspect a raw tool result for failure
///
/// An object with a truthy `error` field fails outright. Otherwise the
/// `output` field (or the whole value when it is a bare string) is scanned
/// for common failure markers.
#[must_use]
pub fn detect_tool_error(result: Option<&Value>) -> bool {
    let Some(result) = result else {
        return false;
    };

    let output = match result {
        Value::Object(map) => {
            if map.get("error").is_some_and(is_truthy) {
                return true;
            }
            match map.get("output") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }
        }
        Value::String(s) => s.clone(),
        Value::Null => return false,
        other => other.to_string(),
    };

    ERROR_PATTERNS.iter().any(|p| output.contains(p))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_hook_spelling_and_aliases() {
        assert_eq!(EventKind::parse("SessionStart"), EventKind::SessionStart);
        assert_eq!(EventKind::parse("pre-tool"), EventKind::PreToolUse);
        assert_eq!(EventKind::parse("PostToolUse"), EventKind::PostToolUse);
        assert_eq!(EventKind::parse("stop"), EventKind::Stop);
        assert_eq!(EventKind::parse("session-end"), EventKind::SessionEnd);
        assert_eq!(EventKind::parse("Foo"), EventKind::Unknown);
        assert_eq!(EventKind::parse(""), EventKind::Unknown);
    }

    #[test]
    fn test_event_tolerates_unknown_and_missing_fields() {
        let event = HookEvent::from_json(
            r#"{"hook_event_name":"PreToolUse","tool_name":"Read","tool_input":{"file_path":"/x"},"extra":1}"#,
        )
        .unwrap();
        assert_eq!(event.kind(), EventKind::PreToolUse);
        assert_eq!(event.tool_name.as_deref(), Some("Read"));
        assert_eq!(event.session_id, None);

        let empty = HookEvent::from_json("{}").unwrap();
        assert_eq!(empty.kind(), EventKind::Unknown);
    }

    #[test]
    fn test_event_name_alias() {
        let event = HookEvent::from_json(r#"{"event_name":"stop","session_id":"abc"}"#).unwrap();
        assert_eq!(event.kind(), EventKind::Stop);
        assert_eq!(event.session_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_detect_error_flag_and_patterns() {
        assert!(detect_tool_error(Some(&json!({"error": true, "output": "something"}))));
        assert!(detect_tool_error(Some(&json!({"output": "error: file not found"}))));
        assert!(detect_tool_error(Some(&json!({"output": "ERROR: went wrong"}))));
        assert!(detect_tool_error(Some(&json!({"output": "Command failed with exit code 1"}))));
        assert!(detect_tool_error(Some(&json!({"output": "ENOENT: no such file"}))));
        assert!(detect_tool_error(Some(&json!("error: something failed"))));
    }

    #[test]
    fn test_detect_error_clean_results() {
        assert!(!detect_tool_error(None));
        assert!(!detect_tool_error(Some(&json!({}))));
        assert!(!detect_tool_error(Some(&json!({"error": false, "output": "ok"}))));
        assert!(!detect_tool_error(Some(&json!({"output": "Success! File written."}))));
    }

    #[test]
    fn test_explicit_flag_wins_over_output() {
        let mut event = HookEvent::named("PostToolUse").with_result_ok(true);
        event.tool_result = Some(json!({"output": "ERROR everywhere"}));
        assert!(event.tool_succeeded());

        event.tool_result_ok = None;
        assert!(!event.tool_succeeded());
    }
}
