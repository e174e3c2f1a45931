//! State Machine
//!
//! Holds the single active [`CompanionState`] and decides when it changes.
//!
//! # Rules
//!
//! - `apply` replaces the current state unconditionally and restarts its
//!   clock (which also resets the inactivity clock).
//! - `tick` expires timed states back to idle, and moves idle to sleeping
//!   once the inactivity threshold passes.
//! - Farewell never reverts: when it expires the machine signals shutdown
//!   and ignores everything afterwards.
//!
//! The machine never reads the wall clock itself; callers pass `now`, which
//! keeps every transition reproducible in tests.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::mapper::{TransitionReason, TransitionRequest};
use crate::state::{CompanionState, DEFAULT_STATE_DURATION};

/// Default idle time before the companion falls asleep
pub const DEFAULT_SLEEP_AFTER: Duration = Duration::from_secs(120);

/// Timing constants for state expiry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateTimings {
    /// Lifetime of every timed state
    pub state_duration: Duration,
    /// Idle time before sleeping
    pub sleep_after: Duration,
}

impl StateTimings {
    /// Lifetime of `state`, or `None` for permanent states
    #[must_use]
    pub fn duration_for(&self, state: CompanionState) -> Option<Duration> {
        state.is_timed().then_some(self.state_duration)
    }
}

impl Default for StateTimings {
    fn default() -> Self {
        Self {
            state_duration: DEFAULT_STATE_DURATION,
            sleep_after: DEFAULT_SLEEP_AFTER,
        }
    }
}

/// A completed state change
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Previous state
    pub from: CompanionState,
    /// New state
    pub to: CompanionState,
    /// When the new state was entered
    pub at: Instant,
    /// What caused it
    pub reason: TransitionReason,
}

/// Result of advancing the machine's clock
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing changed
    Unchanged,
    /// Expiry or inactivity moved the machine
    Transitioned(Transition),
    /// Farewell elapsed; the host loop should stop
    Shutdown,
}

/// Requests the machine refuses
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MachineError {
    /// Farewell already completed
    #[error("state machine has shut down; dropped request for {0}")]
    ShutDown(CompanionState),
}

/// Owner of the active state
#[derive(Clone, Debug)]
pub struct StateMachine {
    state: CompanionState,
    entered_at: Instant,
    timings: StateTimings,
    shut_down: bool,
}

impl StateMachine {
    /// Start in idle at `now`
    #[must_use]
    pub fn new(now: Instant, timings: StateTimings) -> Self {
        Self {
            state: CompanionState::Idle,
            entered_at: now,
            timings,
            shut_down: false,
        }
    }

    /// Active state
    #[must_use]
    pub fn state(&self) -> CompanionState {
        self.state
    }

    /// When the active state was entered
    #[must_use]
    pub fn entered_at(&self) -> Instant {
        self.entered_at
    }

    /// Time spent in the active state as of `now`
    #[must_use]
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.entered_at)
    }

    /// Current timing constants
    #[must_use]
    pub fn timings(&self) -> StateTimings {
        self.timings
    }

    /// Replace the timing constants (settings reload)
    ///
    /// The active state keeps its entry time; the new durations apply from
    /// the next tick.
    pub fn set_timings(&mut self, timings: StateTimings) {
        self.timings = timings;
    }

    /// Whether farewell has completed
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Instant of the next automatic change, if any
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        if self.shut_down {
            return None;
        }
        match self.timings.duration_for(self.state) {
            Some(d) => self.entered_at.checked_add(d),
            None if self.state == CompanionState::Idle => {
                self.entered_at.checked_add(self.timings.sleep_after)
            }
            None => None,
        }
    }

    /// Enter the requested state
    ///
    /// A request older than the current entry still wins (last writer wins)
    /// but is logged, since the single-consumer loop should never produce one.
    ///
    /// # Errors
    ///
    /// [`MachineError::ShutDown`] once farewell has completed.
    pub fn apply(&mut self, request: TransitionRequest) -> Result<Transition, MachineError> {
        if self.shut_down {
            return Err(MachineError::ShutDown(request.target));
        }

        if request.at < self.entered_at {
            warn!(
                current = %self.state,
                target = %request.target,
                "Transition request predates current state; applying anyway"
            );
        }

        let at = request.at.max(self.entered_at);
        Ok(self.enter(request.target, at, request.reason))
    }

    /// Advance the clock to `now`
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if self.shut_down {
            return TickOutcome::Unchanged;
        }

        let elapsed = self.elapsed(now);

        if let Some(duration) = self.timings.duration_for(self.state) {
            if elapsed < duration {
                return TickOutcome::Unchanged;
            }
            if self.state.is_terminal() {
                info!(state = %self.state, "Terminal state elapsed, signalling shutdown");
                self.shut_down = true;
                return TickOutcome::Shutdown;
            }
            let at = self.entered_at.checked_add(duration).unwrap_or(now);
            return TickOutcome::Transitioned(self.enter(
                CompanionState::Idle,
                at,
                TransitionReason::Expired,
            ));
        }

        if self.state == CompanionState::Idle && elapsed >= self.timings.sleep_after {
            let at = self.entered_at.checked_add(self.timings.sleep_after).unwrap_or(now);
            return TickOutcome::Transitioned(self.enter(
                CompanionState::Sleeping,
                at,
                TransitionReason::Inactivity,
            ));
        }

        TickOutcome::Unchanged
    }

    fn enter(&mut self, to: CompanionState, at: Instant, reason: TransitionReason) -> Transition {
        let from = self.state;
        self.state = to;
        self.entered_at = at;
        debug!(%from, %to, ?reason, "State transition");
        Transition {
            from,
            to,
            at,
            reason,
        }
    }
}
