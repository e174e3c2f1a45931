//! Companion States
//!
//! The closed set of display states the character can be in. Each state
//! names its conventional asset, whether it expires on its own, and which
//! emotion glyphs decorate it.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default lifetime of a timed state before it reverts to idle
pub const DEFAULT_STATE_DURATION: Duration = Duration::from_secs(3);

/// Display state of the companion
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanionState {
    /// Resting between events (initial state)
    #[default]
    Idle,
    /// Session just started
    Greeting,
    /// A tool is running
    Working,
    /// A tool finished cleanly
    Success,
    /// A tool failed
    Error,
    /// The agent stopped after finishing its turn
    Celebrating,
    /// Extended inactivity while idle
    Sleeping,
    /// Session ended; the process winds down after this
    Farewell,
}

impl CompanionState {
    /// Every state, in declaration order
    pub const ALL: [CompanionState; 8] = [
        Self::Idle,
        Self::Greeting,
        Self::Working,
        Self::Success,
        Self::Error,
        Self::Celebrating,
        Self::Sleeping,
        Self::Farewell,
    ];

    /// Canonical lowercase name, also the conventional asset stem
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Greeting => "greeting",
            Self::Working => "working",
            Self::Success => "success",
            Self::Error => "error",
            Self::Celebrating => "celebrating",
            Self::Sleeping => "sleeping",
            Self::Farewell => "farewell",
        }
    }

    /// Whether the state expires on its own after a fixed duration
    #[must_use]
    pub const fn is_timed(self) -> bool {
        matches!(
            self,
            Self::Greeting | Self::Success | Self::Error | Self::Celebrating | Self::Farewell
        )
    }

    /// Whether leaving this state by expiry ends the process
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Farewell)
    }
}

impl fmt::Display for CompanionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a string names no known state
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown companion state: {0}")]
pub struct UnknownState(pub String);

impl FromStr for CompanionState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|state| state.name() == lowered)
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}
