//! Companion Engine
//!
//! The single owned object behind the tick loop: state machine, mapper,
//! render pipeline, theme and the seeded random source used for bubble
//! lines. Every mutation goes through `&mut self`, so there is exactly one
//! writer and no shared state to guard.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::events::HookEvent;
use crate::machine::{StateMachine, TickOutcome, Transition};
use crate::mapper::{EventMapper, TransitionReason, TransitionRequest};
use crate::notifier::SoundCue;
use crate::render::gradient::Sprite;
use crate::render::motion::Point;
use crate::render::{RenderFrame, RenderInput, RenderPipeline};
use crate::settings::Settings;
use crate::state::CompanionState;
use crate::theme::Theme;

/// Everything one tick produced
#[derive(Clone, Debug)]
pub struct TickResult {
    /// What the state machine did
    pub outcome: TickOutcome,
    /// Frame to show; `None` when the overlay is disabled
    pub frame: Option<RenderFrame>,
    /// Sound queued by the latest event transition
    pub sound: Option<SoundCue>,
}

/// The companion engine
#[derive(Debug)]
pub struct Companion {
    machine: StateMachine,
    mapper: EventMapper,
    pipeline: RenderPipeline,
    theme: Theme,
    plugin_root: PathBuf,
    rng: StdRng,
    bubble: Option<String>,
    pointer: Option<Point>,
    anchor: Point,
    started_at: Instant,
    pending_sound: Option<SoundCue>,
}

impl Companion {
    /// Engine with explicit settings, theme and random source
    #[must_use]
    pub fn new(settings: Settings, theme: Theme, rng: StdRng, now: Instant) -> Self {
        let settings = Arc::new(settings);
        Self {
            machine: StateMachine::new(now, settings.timings()),
            mapper: EventMapper::from_overrides(&settings.tool_overrides),
            plugin_root: theme
                .dir()
                .parent()
                .and_then(Path::parent)
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            pipeline: RenderPipeline::new(settings),
            theme,
            rng,
            bubble: None,
            pointer: None,
            anchor: Point::default(),
            started_at: now,
            pending_sound: None,
        }
    }

    /// Engine reading settings and theme from `plugin_root`
    ///
    /// Never fails; anything missing or invalid falls back to defaults.
    #[must_use]
    pub fn load(plugin_root: &Path, rng: StdRng, now: Instant) -> Self {
        let settings = Settings::load(&plugin_root.join(crate::settings::SETTINGS_FILE_NAME));
        let theme = Theme::load(plugin_root, settings.theme.as_str());
        info!(
            root = %plugin_root.display(),
            theme = %theme.name(),
            "Companion loaded"
        );
        let mut companion = Self::new(settings, theme, rng, now);
        companion.plugin_root = plugin_root.to_path_buf();
        companion
    }

    /// Active state
    #[must_use]
    pub fn state(&self) -> CompanionState {
        self.machine.state()
    }

    /// Settings in effect
    #[must_use]
    pub fn settings(&self) -> &Settings {
        self.pipeline.settings()
    }

    /// Theme in use
    #[must_use]
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Bubble line chosen for the active state
    #[must_use]
    pub fn bubble(&self) -> Option<&str> {
        self.bubble.as_deref()
    }

    /// Whether farewell has completed
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.machine.is_shut_down()
    }

    /// Map and apply a host event
    pub fn handle_event(&mut self, event: &HookEvent, now: Instant) -> Option<Transition> {
        let request = self.mapper.map_event(event, now);
        self.apply(request)
    }

    /// Apply a transition request
    ///
    /// Requests after farewell are logged and dropped.
    pub fn apply(&mut self, request: TransitionRequest) -> Option<Transition> {
        match self.machine.apply(request) {
            Ok(transition) => {
                self.on_enter(&transition);
                Some(transition)
            }
            Err(e) => {
                warn!(error = %e, "Transition dropped");
                None
            }
        }
    }

    /// Update the pointer and character anchor
    ///
    /// Affects rendering only; the inactivity clock is not touched.
    pub fn set_pointer(&mut self, pointer: Point, anchor: Point) {
        self.pointer = Some(pointer);
        self.anchor = anchor;
    }

    /// Replace settings, reloading the theme if its name changed
    pub fn reload_settings(&mut self, settings: Settings) {
        let theme_changed = settings.theme != self.settings().theme;

        self.mapper = EventMapper::from_overrides(&settings.tool_overrides);
        self.machine.set_timings(settings.timings());

        if theme_changed {
            self.theme = Theme::load(&self.plugin_root, settings.theme.as_str());
            self.pipeline.clear_cache();
        }
        if !settings.speech_bubble.enabled {
            self.bubble = None;
        }

        info!(theme = %settings.theme.as_str(), theme_changed, "Settings reloaded");
        self.pipeline.set_settings(Arc::new(settings));
    }

    /// Advance expiry, then render
    pub fn tick(&mut self, now: Instant) -> TickResult {
        let outcome = self.machine.tick(now);
        if let TickOutcome::Transitioned(ref transition) = outcome {
            self.on_enter(transition);
        }

        let frame = self
            .settings()
            .overlay
            .enabled
            .then(|| self.render(now));

        TickResult {
            outcome,
            frame,
            sound: self.pending_sound.take(),
        }
    }

    /// Frame for `now` without advancing anything
    #[must_use]
    pub fn render(&self, now: Instant) -> RenderFrame {
        let state = self.machine.state();
        let input = RenderInput::new(
            state,
            self.machine.elapsed(now),
            now.saturating_duration_since(self.started_at),
        )
        .with_bubble(self.bubble.as_deref())
        .with_pointer(self.pointer, self.anchor)
        .with_asset(self.theme.image(state));
        self.pipeline.render(&input)
    }

    /// Base image with the bottom fade applied, cached per asset
    pub fn faded_sprite(&mut self, asset: &str, sprite: &Sprite) -> Arc<Sprite> {
        self.pipeline.faded_sprite(asset, sprite)
    }

    /// Time until the machine changes on its own, as of `now`
    #[must_use]
    pub fn time_to_deadline(&self, now: Instant) -> Option<Duration> {
        self.machine
            .deadline()
            .map(|d| d.saturating_duration_since(now))
    }

    fn on_enter(&mut self, transition: &Transition) {
        let settings = Arc::clone(self.pipeline.settings());

        // A new state always replaces the previous bubble
        self.bubble = if settings.speech_bubble.enabled {
            self.theme
                .messages()
                .pick(transition.to, &mut self.rng)
                .map(str::to_string)
        } else {
            None
        };

        // Sounds accompany host events only, not expiry or sleep
        if matches!(transition.reason, TransitionReason::Event { .. }) && settings.audio.enabled {
            self.pending_sound = self.theme.sound(transition.to).map(|path| SoundCue {
                path: path.to_path_buf(),
                volume: settings.audio.volume,
            });
        }

        debug!(
            from = %transition.from,
            to = %transition.to,
            bubble = ?self.bubble,
            "Entered state"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::HookEvent;
    use rand::SeedableRng;

    fn companion(settings: Settings, now: Instant) -> (tempfile::TempDir, Companion) {
        let root = tempfile::tempdir().unwrap();
        let sounds = root.path().join("themes/default/sounds");
        std::fs::create_dir_all(&sounds).unwrap();
        std::fs::write(sounds.join("success.wav"), b"x").unwrap();
        let theme = Theme::load(root.path(), "default");
        let c = Companion::new(settings, theme, StdRng::seed_from_u64(42), now);
        (root, c)
    }

    #[test]
    fn test_event_sets_bubble_and_sound() {
        let t0 = Instant::now();
        let (_root, mut c) = companion(Settings::default(), t0);

        let event = HookEvent::named("PostToolUse").with_tool("Bash").with_result_ok(true);
        c.handle_event(&event, t0);
        assert_eq!(c.state(), CompanionState::Success);
        assert!(c.bubble().is_some());

        let result = c.tick(t0 + Duration::from_millis(10));
        assert!(result.sound.unwrap().path.ends_with("success.wav"));
        assert!(result.frame.unwrap().bubble.is_some());

        // Sound is handed out once
        assert!(c.tick(t0 + Duration::from_millis(20)).sound.is_none());
    }

    #[test]
    fn test_audio_disabled_queues_nothing() {
        let t0 = Instant::now();
        let mut settings = Settings::default();
        settings.audio.enabled = false;
        let (_root, mut c) = companion(settings, t0);
        c.handle_event(&HookEvent::named("PostToolUse").with_result_ok(true), t0);
        assert!(c.tick(t0).sound.is_none());
    }

    #[test]
    fn test_overlay_disabled_still_transitions() {
        let t0 = Instant::now();
        let mut settings = Settings::default();
        settings.overlay.enabled = false;
        let (_root, mut c) = companion(settings, t0);

        c.handle_event(&HookEvent::named("SessionStart"), t0);
        let result = c.tick(t0 + Duration::from_secs(3));
        assert!(result.frame.is_none());
        assert!(matches!(result.outcome, TickOutcome::Transitioned(_)));
        assert_eq!(c.state(), CompanionState::Idle);
    }

    #[test]
    fn test_pointer_does_not_delay_sleep() {
        let t0 = Instant::now();
        let mut settings = Settings::default();
        settings.timing.sleep_after = 10.0;
        let (_root, mut c) = companion(settings, t0);

        c.set_pointer(Point::new(1.0, 1.0), Point::new(50.0, 50.0));
        c.tick(t0 + Duration::from_secs(9));
        c.set_pointer(Point::new(2.0, 2.0), Point::new(50.0, 50.0));
        c.tick(t0 + Duration::from_secs(10));
        assert_eq!(c.state(), CompanionState::Sleeping);
    }

    #[test]
    fn test_reload_replaces_timings_and_overrides() {
        let t0 = Instant::now();
        let (_root, mut c) = companion(Settings::default(), t0);

        let settings = Settings::from_json(
            r#"{"timing": {"stateDuration": 1.0},
                "speechBubble": {"enabled": false},
                "toolOverrides": [{"event": "PreToolUse", "tool": "TodoWrite", "state": "celebrating"}]}"#,
        )
        .unwrap();
        c.reload_settings(settings);

        c.handle_event(&HookEvent::named("PreToolUse").with_tool("TodoWrite"), t0);
        assert_eq!(c.state(), CompanionState::Celebrating);
        assert!(c.bubble().is_none());
        c.tick(t0 + Duration::from_secs(1));
        assert_eq!(c.state(), CompanionState::Idle);
    }

    #[test]
    fn test_events_after_farewell_are_dropped() {
        let t0 = Instant::now();
        let (_root, mut c) = companion(Settings::default(), t0);
        c.handle_event(&HookEvent::named("SessionEnd"), t0);
        assert_eq!(c.tick(t0 + Duration::from_secs(3)).outcome, TickOutcome::Shutdown);
        assert!(c.is_finished());
        assert!(c.handle_event(&HookEvent::named("SessionStart"), t0 + Duration::from_secs(4)).is_none());
        assert_eq!(c.state(), CompanionState::Farewell);
    }
}
