//! Companion Core - Headless State and Animation Engine
//!
//! This crate turns lifecycle events from a host tool (session start, tool
//! use, stop, session end) into an animated character overlay: which state
//! is showing, when it expires, and what every frame looks like. It has no
//! window-system or audio dependency; a [`notifier::Platform`] supplies
//! those.
//!
//! # Architecture
//!
//! ```text
//!  host event ──► CompanionHandle ──► runtime loop (one task)
//!                                        │
//!                                        ├─► EventMapper ──► StateMachine
//!                                        │                      │
//!                                        │        state, since_entry, clock
//!                                        │                      ▼
//!                                        └──────────────── RenderPipeline
//!                                                               │ RenderFrame
//!                                                               ▼
//!                         Platform ◄── worker ◄── DispatchNotifier
//! ```
//!
//! One tokio task ([`runtime::run`]) owns the [`Companion`] engine. It
//! drains queued commands, advances expiry, renders, and hands the frame to
//! the notifier, once per tick.
//!
//! # Module Overview
//!
//! - [`state`]: The closed set of display states
//! - [`events`]: Host lifecycle events and tool failure detection
//! - [`mapper`]: Event to state translation
//! - [`machine`]: Active state, expiry and sleep
//! - [`render`]: Motion, entry animations, gradient, decorations, bubble
//! - [`settings`]: The `settings-fx.json` document
//! - [`messages`]: Speech bubble lines
//! - [`theme`]: Image and sound resolution
//! - [`notifier`]: Platform boundary
//! - [`engine`]: The owned engine object
//! - [`runtime`]: The tick loop and its command channel
//! - [`config`]: Process-level TOML/env configuration
//!
//! # No UI Dependencies
//!
//! Nothing here links a windowing, terminal UI or audio library.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod events;
pub mod machine;
pub mod mapper;
pub mod messages;
pub mod notifier;
pub mod render;
pub mod runtime;
pub mod settings;
pub mod state;
pub mod theme;

// Re-exports for convenience
pub use engine::{Companion, TickResult};
pub use events::{detect_tool_error, EventKind, HookEvent};
pub use machine::{MachineError, StateMachine, StateTimings, TickOutcome, Transition};
pub use mapper::{EventMapper, TransitionReason, TransitionRequest};
pub use messages::MessageBook;
pub use notifier::{DispatchNotifier, LogPlatform, Notifier, Platform, PlatformError, SoundCue};
pub use render::{RenderFrame, RenderInput, RenderPipeline};
pub use runtime::{channel, run, Command, CompanionHandle, ExitReason, HandleClosed};
pub use settings::{Settings, SettingsError};
pub use state::CompanionState;
pub use theme::{Theme, ThemeError};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, RuntimeConfig,
};
