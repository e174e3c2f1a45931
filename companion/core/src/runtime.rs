//! Runtime Loop
//!
//! Drives a [`Companion`] from a tokio interval. External producers talk to
//! the loop only through a [`CompanionHandle`]; queued commands are drained
//! between ticks, so no request ever lands in the middle of a render.
//!
//! The loop ends when farewell completes, when a [`Command::Shutdown`]
//! arrives, or when the caller's shutdown future resolves. In every case the
//! notifier is closed before returning.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::engine::Companion;
use crate::events::HookEvent;
use crate::machine::TickOutcome;
use crate::notifier::Notifier;
use crate::render::motion::Point;
use crate::settings::{Settings, MIN_TICK_INTERVAL_MS};

/// Messages accepted by the runtime loop
#[derive(Clone, Debug)]
pub enum Command {
    /// A host lifecycle event
    Event(HookEvent),
    /// Pointer moved
    Pointer {
        /// Pointer position
        pointer: Point,
        /// Character anchor position
        anchor: Point,
    },
    /// Replace settings wholesale
    ReloadSettings(Box<Settings>),
    /// Stop the loop
    Shutdown,
}

/// Why the loop ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// Farewell elapsed
    Farewell,
    /// A shutdown command was received
    Requested,
    /// The shutdown future resolved
    Cancelled,
}

/// Returned when the loop is no longer running
#[derive(Debug, Error, PartialEq, Eq)]
#[error("companion runtime has stopped")]
pub struct HandleClosed;

/// Sending side of the command channel
#[derive(Clone, Debug)]
pub struct CompanionHandle {
    tx: mpsc::Sender<Command>,
}

/// Create a handle and the receiver to pass to [`run`]
#[must_use]
pub fn channel(capacity: usize) -> (CompanionHandle, mpsc::Receiver<Command>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (CompanionHandle { tx }, rx)
}

impl CompanionHandle {
    /// Queue a host event, waiting for room
    ///
    /// # Errors
    ///
    /// [`HandleClosed`] once the loop has stopped.
    pub async fn event(&self, event: HookEvent) -> Result<(), HandleClosed> {
        self.send(Command::Event(event)).await
    }

    /// Report the pointer position; dropped if the queue is full
    ///
    /// # Errors
    ///
    /// [`HandleClosed`] once the loop has stopped.
    pub fn pointer(&self, pointer: Point, anchor: Point) -> Result<(), HandleClosed> {
        match self.tx.try_send(Command::Pointer { pointer, anchor }) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(HandleClosed),
        }
    }

    /// Queue a settings replacement
    ///
    /// # Errors
    ///
    /// [`HandleClosed`] once the loop has stopped.
    pub async fn reload(&self, settings: Settings) -> Result<(), HandleClosed> {
        self.send(Command::ReloadSettings(Box::new(settings))).await
    }

    /// Ask the loop to stop
    ///
    /// # Errors
    ///
    /// [`HandleClosed`] if it already has.
    pub async fn shutdown(&self) -> Result<(), HandleClosed> {
        self.send(Command::Shutdown).await
    }

    /// Whether the loop has stopped
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, command: Command) -> Result<(), HandleClosed> {
        self.tx.send(command).await.map_err(|_| HandleClosed)
    }
}

/// What draining the queue did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Drained {
    Nothing,
    Reloaded,
    Shutdown,
}

/// Run the tick loop until farewell, a shutdown command, or `shutdown`
///
/// `interval` pins the tick period. With `None` the period follows
/// `timing.tickIntervalMs` from the settings, including later reloads.
/// Periods below the settings minimum are raised to it.
pub async fn run<N, F>(
    mut companion: Companion,
    mut rx: mpsc::Receiver<Command>,
    mut notifier: N,
    interval: Option<Duration>,
    shutdown: F,
) -> ExitReason
where
    N: Notifier,
    F: Future<Output = ()>,
{
    let mut period = interval.unwrap_or_else(|| companion.settings().tick_interval());
    let mut ticker = new_ticker(period, false);
    tokio::pin!(shutdown);

    info!(?period, pinned = interval.is_some(), state = %companion.state(), "Runtime loop started");

    let mut producers_gone = false;
    let reason = loop {
        tokio::select! {
            biased;

            () = &mut shutdown => break ExitReason::Cancelled,

            _ = ticker.tick() => {
                match drain(&mut companion, &mut rx, &mut producers_gone) {
                    Drained::Shutdown => break ExitReason::Requested,
                    Drained::Reloaded if interval.is_none() => {
                        let next = companion.settings().tick_interval();
                        if next != period {
                            info!(from = ?period, to = ?next, "Tick interval changed");
                            period = next;
                            ticker = new_ticker(period, true);
                        }
                    }
                    Drained::Reloaded | Drained::Nothing => {}
                }

                let now = Instant::now().into_std();
                let result = companion.tick(now);

                match (result.frame, result.sound) {
                    (Some(frame), sound) => notifier.notify(frame, sound),
                    (None, Some(cue)) => notifier.play(cue),
                    (None, None) => {}
                }

                if result.outcome == TickOutcome::Shutdown {
                    break ExitReason::Farewell;
                }
            }
        }
    };

    notifier.close();
    info!(?reason, "Runtime loop stopped");
    reason
}

/// Interval for `period`, never shorter than the settings minimum
fn new_ticker(period: Duration, delayed: bool) -> Interval {
    let period = period.max(Duration::from_millis(MIN_TICK_INTERVAL_MS));
    let mut ticker = if delayed {
        tokio::time::interval_at(Instant::now() + period, period)
    } else {
        tokio::time::interval(period)
    };
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Apply every queued command
fn drain(
    companion: &mut Companion,
    rx: &mut mpsc::Receiver<Command>,
    producers_gone: &mut bool,
) -> Drained {
    let mut drained = Drained::Nothing;
    loop {
        match rx.try_recv() {
            Ok(Command::Event(event)) => {
                let now = Instant::now().into_std();
                companion.handle_event(&event, now);
            }
            Ok(Command::Pointer { pointer, anchor }) => companion.set_pointer(pointer, anchor),
            Ok(Command::ReloadSettings(settings)) => {
                companion.reload_settings(*settings);
                drained = Drained::Reloaded;
            }
            Ok(Command::Shutdown) => return Drained::Shutdown,
            Err(mpsc::error::TryRecvError::Empty) => return drained,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                if !*producers_gone {
                    debug!("All handles dropped; continuing on timers only");
                    *producers_gone = true;
                }
                return drained;
            }
        }
    }
}
