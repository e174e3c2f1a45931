//! Event Mapper
//!
//! Pure translation from a lifecycle event to a [`TransitionRequest`].
//! The lookup is total: anything unrecognised maps to idle.

use std::collections::HashMap;
use std::time::Instant;

use crate::events::{EventKind, HookEvent};
use crate::settings::ToolOverride;
use crate::state::CompanionState;

/// Why a transition happened
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionReason {
    /// A recognised host event
    Event {
        /// Classified event
        kind: EventKind,
        /// Tool named by the event, if any
        tool: Option<String>,
    },
    /// An event name outside the known set
    Unrecognized {
        /// The raw event name
        name: String,
    },
    /// A timed state ran out
    Expired,
    /// Idle lasted past the sleep threshold
    Inactivity,
}

/// Instruction to change the active state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionRequest {
    /// State to enter
    pub target: CompanionState,
    /// When the triggering event was observed
    pub at: Instant,
    /// What caused the request
    pub reason: TransitionReason,
}

impl TransitionRequest {
    /// Request a state directly, outside the event table
    pub fn new(target: CompanionState, at: Instant, reason: TransitionReason) -> Self {
        Self { target, at, reason }
    }
}

/// Maps lifecycle events to display states
#[derive(Clone, Debug, Default)]
pub struct EventMapper {
    /// Tool-specific mappings, consulted before the general table
    overrides: HashMap<(EventKind, String), CompanionState>,
}

impl EventMapper {
    /// Mapper with only the general table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `toolOverrides` settings list
    ///
    /// Entries naming an unknown event or state are skipped.
    #[must_use]
    pub fn from_overrides(overrides: &[ToolOverride]) -> Self {
        let mut mapper = Self::new();
        for entry in overrides {
            let kind = EventKind::parse(&entry.event);
            if kind == EventKind::Unknown {
                tracing::warn!(event = %entry.event, tool = %entry.tool, "Ignoring tool override for unknown event");
                continue;
            }
            match entry.state.parse::<CompanionState>() {
                Ok(state) => mapper = mapper.with_override(kind, entry.tool.clone(), state),
                Err(e) => tracing::warn!(error = %e, tool = %entry.tool, "Ignoring tool override"),
            }
        }
        mapper
    }

    /// Add a tool-specific mapping
    #[must_use]
    pub fn with_override(
        mut self,
        kind: EventKind,
        tool: impl Into<String>,
        state: CompanionState,
    ) -> Self {
        self.overrides.insert((kind, tool.into()), state);
        self
    }

    /// Number of tool-specific mappings
    #[must_use]
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Map an event name plus optional tool details
    ///
    /// A post-tool event without an outcome counts as success.
    #[must_use]
    pub fn map(
        &self,
        event_name: &str,
        tool_name: Option<&str>,
        tool_result_ok: Option<bool>,
        at: Instant,
    ) -> TransitionRequest {
        let kind = EventKind::parse(event_name);

        if kind == EventKind::Unknown {
            tracing::debug!(event = %event_name, "Unrecognized event, mapping to idle");
            return TransitionRequest::new(
                CompanionState::Idle,
                at,
                TransitionReason::Unrecognized {
                    name: event_name.to_string(),
                },
            );
        }

        let tool_specific = tool_name
            .filter(|_| kind.is_tool_event())
            .and_then(|tool| self.overrides.get(&(kind, tool.to_string())).copied());

        let target = tool_specific
            .unwrap_or_else(|| general_state(kind, tool_result_ok.unwrap_or(true)));

        TransitionRequest::new(
            target,
            at,
            TransitionReason::Event {
                kind,
                tool: tool_name.map(str::to_string),
            },
        )
    }

    /// Map a full hook event, detecting tool failure from its result
    #[must_use]
    pub fn map_event(&self, event: &HookEvent, at: Instant) -> TransitionRequest {
        let ok = (event.kind() == EventKind::PostToolUse).then(|| event.tool_succeeded());
        self.map(&event.event_name, event.tool_name.as_deref(), ok, at)
    }
}

/// General event table
fn general_state(kind: EventKind, tool_ok: bool) -> CompanionState {
    match kind {
        EventKind::SessionStart => CompanionState::Greeting,
        EventKind::PreToolUse => CompanionState::Working,
        EventKind::PostToolUse if tool_ok => CompanionState::Success,
        EventKind::PostToolUse => CompanionState::Error,
        EventKind::Stop => CompanionState::Celebrating,
        EventKind::SessionEnd => CompanionState::Farewell,
        EventKind::Notification | EventKind::Unknown => CompanionState::Idle,
    }
}
