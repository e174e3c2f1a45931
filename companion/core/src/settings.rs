//! Settings Document
//!
//! Typed form of `settings-fx.json`. Every field has a documented default,
//! unknown keys are ignored, and values are clamped into range once at load
//! time. The runtime never mutates a `Settings`; a reload swaps the whole
//! value.
//!
//! # Example
//!
//! ```json
//! {
//!   "overlay": { "enabled": true, "maxHeight": 500,
//!                "bottomGradient": { "enabled": true, "percentage": 0.25 } },
//!   "audio": { "enabled": true, "volume": 0.5 },
//!   "immersion": { "breathing": true, "sway": false, "cursorInfluence": true,
//!                  "cursorInfluenceStrength": 0.6 },
//!   "speechBubble": { "enabled": true, "displayDuration": 2.5 },
//!   "emotionOverlays": { "enabled": true },
//!   "timing": { "sleepAfter": 300 },
//!   "toolOverrides": [ { "event": "PreToolUse", "tool": "TodoWrite", "state": "celebrating" } ]
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::machine::StateTimings;
use crate::render::color::Rgba;

/// File name of the settings document under the plugin root
pub const SETTINGS_FILE_NAME: &str = "settings-fx.json";

/// Fastest accepted tick period
pub const MIN_TICK_INTERVAL_MS: u64 = 10;

/// Slowest accepted tick period
pub const MAX_TICK_INTERVAL_MS: u64 = 1000;

/// Longest timed state, bubble or inactivity threshold (one day)
pub const MAX_DURATION_SECS: f32 = 86_400.0;

/// Errors raised while loading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the settings file
    #[error("Failed to read settings at {path}: {source}")]
    Read {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// The document is not valid JSON for this schema
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Complete settings document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Overlay window options
    pub overlay: OverlaySettings,
    /// Sound options
    pub audio: AudioSettings,
    /// Idle motion toggles
    pub immersion: ImmersionSettings,
    /// Speech bubble options
    pub speech_bubble: SpeechBubbleSettings,
    /// Emotion glyph options
    pub emotion_overlays: EmotionOverlaySettings,
    /// State timing constants
    pub timing: TimingSettings,
    /// Theme directory name
    pub theme: ThemeName,
    /// Tool-specific event mappings
    pub tool_overrides: Vec<ToolOverride>,
}

/// Theme name with a `"default"` fallback
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemeName(pub String);

impl Default for ThemeName {
    fn default() -> Self {
        Self("default".to_string())
    }
}

impl ThemeName {
    /// The theme name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Overlay window options
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlaySettings {
    /// Whether frames are shown at all
    pub enabled: bool,
    /// Maximum character height in pixels
    pub max_height: u32,
    /// Horizontal offset from the terminal edge
    pub offset_x: i32,
    /// Vertical offset from the terminal edge
    pub offset_y: i32,
    /// Fade the window in at startup and out at farewell
    pub fade_animation: bool,
    /// Bottom alpha fade
    pub bottom_gradient: BottomGradientSettings,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_height: 750,
            offset_x: 20,
            offset_y: 0,
            fade_animation: true,
            bottom_gradient: BottomGradientSettings::default(),
        }
    }
}

/// Bottom alpha fade options
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BottomGradientSettings {
    /// Whether the fade is applied
    pub enabled: bool,
    /// Fraction of the image height that fades (0-1)
    pub percentage: f32,
}

impl Default for BottomGradientSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            percentage: 0.2,
        }
    }
}

/// Sound options
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudioSettings {
    /// Whether sounds play
    pub enabled: bool,
    /// Playback volume (0-1)
    pub volume: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.5,
        }
    }
}

/// Idle motion toggles
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImmersionSettings {
    /// Vertical float
    pub floating: bool,
    /// Breathing scale
    pub breathing: bool,
    /// Rotational sway and drift
    pub sway: bool,
    /// Tilt toward the pointer
    pub cursor_influence: bool,
    /// Strength of the pointer tilt (0-1)
    pub cursor_influence_strength: f32,
    /// One-shot entry animations
    pub transitions: bool,
}

impl Default for ImmersionSettings {
    fn default() -> Self {
        Self {
            floating: true,
            breathing: true,
            sway: true,
            cursor_influence: true,
            cursor_influence_strength: 0.5,
            transitions: true,
        }
    }
}

/// Speech bubble options
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpeechBubbleSettings {
    /// Whether bubbles are shown
    pub enabled: bool,
    /// Seconds a bubble stays visible
    pub display_duration: f32,
    /// Fill colour (hex)
    pub background_color: String,
    /// Text colour (hex)
    pub text_color: String,
    /// Outline colour (hex)
    pub border_color: String,
    /// Font size in points
    pub font_size: f32,
    /// Corner radius in pixels
    pub corner_radius: f32,
    /// Inner padding in pixels
    pub padding: f32,
    /// Maximum bubble width in pixels
    pub max_width: f32,
}

impl Default for SpeechBubbleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            display_duration: 3.0,
            background_color: "#ffffff".to_string(),
            text_color: "#222222".to_string(),
            border_color: "#8c73ff".to_string(),
            font_size: 13.0,
            corner_radius: 10.0,
            padding: 8.0,
            max_width: 200.0,
        }
    }
}

impl SpeechBubbleSettings {
    /// How long a bubble stays up
    #[must_use]
    pub fn display_duration(&self) -> Duration {
        seconds_or(self.display_duration, Duration::from_secs(3))
    }

    /// Parsed fill colour
    #[must_use]
    pub fn background(&self) -> Rgba {
        Rgba::from_hex(&self.background_color)
    }

    /// Parsed text colour
    #[must_use]
    pub fn text(&self) -> Rgba {
        Rgba::from_hex(&self.text_color)
    }

    /// Parsed outline colour
    #[must_use]
    pub fn border(&self) -> Rgba {
        Rgba::from_hex(&self.border_color)
    }
}

/// Emotion glyph options
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmotionOverlaySettings {
    /// Whether glyphs are drawn
    pub enabled: bool,
}

impl Default for EmotionOverlaySettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// State timing constants
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimingSettings {
    /// Seconds a timed state lasts
    pub state_duration: f32,
    /// Idle seconds before sleeping
    pub sleep_after: f32,
    /// Tick interval in milliseconds
    pub tick_interval_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            state_duration: 3.0,
            sleep_after: 120.0,
            tick_interval_ms: 50,
        }
    }
}

/// One tool-specific event mapping
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOverride {
    /// Event name (`PreToolUse`, `post-tool`, ...)
    pub event: String,
    /// Tool name to match exactly
    pub tool: String,
    /// Target state name
    pub state: String,
}

impl Settings {
    /// Parse and validate a settings document
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Parse`] for malformed JSON.
    pub fn from_json(input: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(input)?;
        Ok(settings.validated())
    }

    /// Load from a file; a missing file yields defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&content)?;
        info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Load from a file, falling back to defaults on any failure
    #[must_use]
    pub fn load(path: &Path) -> Self {
        Self::from_path(path).unwrap_or_else(|e| {
            warn!(error = %e, "Invalid settings, using defaults");
            Self::default()
        })
    }

    /// Clamp every value into its documented range
    #[must_use]
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();

        self.overlay.max_height = self.overlay.max_height.max(1);
        self.overlay.bottom_gradient.percentage =
            clamp_unit(self.overlay.bottom_gradient.percentage, defaults.overlay.bottom_gradient.percentage);
        self.audio.volume = clamp_unit(self.audio.volume, defaults.audio.volume);
        self.immersion.cursor_influence_strength = clamp_unit(
            self.immersion.cursor_influence_strength,
            defaults.immersion.cursor_influence_strength,
        );

        if !(self.speech_bubble.display_duration.is_finite() && self.speech_bubble.display_duration >= 0.0) {
            warn!(value = self.speech_bubble.display_duration, "Invalid speechBubble.displayDuration");
            self.speech_bubble.display_duration = defaults.speech_bubble.display_duration;
        }
        self.speech_bubble.display_duration = at_most(self.speech_bubble.display_duration, MAX_DURATION_SECS);
        self.speech_bubble.max_width = positive_or(self.speech_bubble.max_width, defaults.speech_bubble.max_width);
        self.speech_bubble.font_size = positive_or(self.speech_bubble.font_size, defaults.speech_bubble.font_size);

        self.timing.state_duration = at_most(
            positive_or(self.timing.state_duration, defaults.timing.state_duration),
            MAX_DURATION_SECS,
        );
        self.timing.sleep_after = at_most(
            positive_or(self.timing.sleep_after, defaults.timing.sleep_after).max(1.0),
            MAX_DURATION_SECS,
        );
        self.timing.tick_interval_ms = clamp_tick_interval_ms(self.timing.tick_interval_ms);

        if self.theme.0.trim().is_empty() {
            self.theme = ThemeName::default();
        }

        self
    }

    /// State expiry constants
    #[must_use]
    pub fn timings(&self) -> StateTimings {
        let defaults = StateTimings::default();
        StateTimings {
            state_duration: seconds_or(self.timing.state_duration, defaults.state_duration),
            sleep_after: seconds_or(self.timing.sleep_after, defaults.sleep_after),
        }
    }

    /// Tick loop period
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(clamp_tick_interval_ms(self.timing.tick_interval_ms))
    }

    /// Effective gradient fraction (0 when disabled)
    #[must_use]
    pub fn gradient_percentage(&self) -> f32 {
        if self.overlay.bottom_gradient.enabled {
            self.overlay.bottom_gradient.percentage
        } else {
            0.0
        }
    }
}

/// Clamp a tick period into the supported range
#[must_use]
pub fn clamp_tick_interval_ms(ms: u64) -> u64 {
    let clamped = ms.clamp(MIN_TICK_INTERVAL_MS, MAX_TICK_INTERVAL_MS);
    if clamped != ms {
        warn!(requested = ms, used = clamped, "Tick interval out of range");
    }
    clamped
}

/// Seconds as a `Duration`, or `fallback` when unrepresentable
fn seconds_or(secs: f32, fallback: Duration) -> Duration {
    Duration::try_from_secs_f32(secs)
        .map(|d| d.min(Duration::from_secs_f32(MAX_DURATION_SECS)))
        .unwrap_or(fallback)
}

fn at_most(value: f32, max: f32) -> f32 {
    if value > max {
        warn!(value, max, "Setting too large, clamped");
        max
    } else {
        value
    }
}

fn clamp_unit(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

fn positive_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!(value, fallback, "Non-positive setting replaced with default");
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!(s.overlay.enabled);
        assert_eq!(s.overlay.max_height, 750);
        assert!(s.audio.enabled);
        assert!((s.audio.volume - 0.5).abs() < f32::EPSILON);
        assert!(s.immersion.breathing && s.immersion.sway && s.immersion.cursor_influence);
        assert!(s.speech_bubble.enabled);
        assert!(s.emotion_overlays.enabled);
        assert_eq!(s.theme.as_str(), "default");
        assert_eq!(s.timings(), StateTimings::default());
    }

    #[test]
    fn test_empty_document_is_defaults() {
        assert_eq!(Settings::from_json("{}").unwrap(), Settings::default());
    }

    #[test]
    fn test_partial_document_and_unknown_keys() {
        let s = Settings::from_json(
            r#"{
                "overlay": {"enabled": true, "maxHeight": 500, "responsive": true},
                "audio": {"volume": 0.8},
                "somethingElse": [1, 2, 3]
            }"#,
        )
        .unwrap();
        assert_eq!(s.overlay.max_height, 500);
        assert!(s.audio.enabled);
        assert!((s.audio.volume - 0.8).abs() < f32::EPSILON);
        assert_eq!(s.speech_bubble, SpeechBubbleSettings::default());
    }

    #[test]
    fn test_values_are_clamped() {
        let s = Settings::from_json(
            r#"{
                "overlay": {"bottomGradient": {"percentage": 1.7}},
                "audio": {"volume": -2},
                "immersion": {"cursorInfluenceStrength": 4.0},
                "timing": {"stateDuration": 0, "sleepAfter": 0.2, "tickIntervalMs": 1},
                "theme": "  "
            }"#,
        )
        .unwrap();
        assert!((s.overlay.bottom_gradient.percentage - 1.0).abs() < f32::EPSILON);
        assert!(s.audio.volume.abs() < f32::EPSILON);
        assert!((s.immersion.cursor_influence_strength - 1.0).abs() < f32::EPSILON);
        assert!((s.timing.state_duration - 3.0).abs() < f32::EPSILON);
        assert!((s.timing.sleep_after - 1.0).abs() < f32::EPSILON);
        assert_eq!(s.timing.tick_interval_ms, 10);
        assert_eq!(s.theme.as_str(), "default");
    }

    #[test]
    fn test_huge_durations_are_capped() {
        let s = Settings::from_json(
            r#"{
                "timing": {"stateDuration": 1e30, "sleepAfter": 1e19, "tickIntervalMs": 0},
                "speechBubble": {"displayDuration": 1e30}
            }"#,
        )
        .unwrap();
        assert!((s.timing.state_duration - MAX_DURATION_SECS).abs() < f32::EPSILON);
        assert!((s.timing.sleep_after - MAX_DURATION_SECS).abs() < f32::EPSILON);
        assert_eq!(s.timing.tick_interval_ms, MIN_TICK_INTERVAL_MS);

        let timings = s.timings();
        assert_eq!(timings.sleep_after, Duration::from_secs(86_400));
        assert_eq!(s.speech_bubble.display_duration(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_unvalidated_durations_never_panic() {
        let mut s = Settings::default();
        s.timing.state_duration = 1e30;
        s.timing.sleep_after = f32::NAN;
        s.timing.tick_interval_ms = 0;
        s.speech_bubble.display_duration = -5.0;

        let timings = s.timings();
        assert_eq!(timings.state_duration, Duration::from_secs(86_400));
        assert_eq!(timings.sleep_after, StateTimings::default().sleep_after);
        assert_eq!(s.tick_interval(), Duration::from_millis(MIN_TICK_INTERVAL_MS));
        assert_eq!(s.speech_bubble.display_duration(), Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(matches!(
            Settings::from_json("{ invalid json }"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join(SETTINGS_FILE_NAME);
        assert_eq!(Settings::load(&missing), Settings::default());

        let mut file = std::fs::File::create(&missing).unwrap();
        write!(file, "not json").unwrap();
        assert_eq!(Settings::load(&missing), Settings::default());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, r#"{"audio": {"enabled": false}, "theme": "neon"}"#).unwrap();
        let s = Settings::load(&path);
        assert!(!s.audio.enabled);
        assert_eq!(s.theme.as_str(), "neon");
    }

    #[test]
    fn test_gradient_percentage_respects_toggle() {
        let mut s = Settings::default();
        s.overlay.bottom_gradient.percentage = 0.4;
        assert!((s.gradient_percentage() - 0.4).abs() < f32::EPSILON);
        s.overlay.bottom_gradient.enabled = false;
        assert!(s.gradient_percentage().abs() < f32::EPSILON);
    }

    #[test]
    fn test_tool_overrides_parse() {
        let s = Settings::from_json(
            r#"{"toolOverrides": [{"event": "PreToolUse", "tool": "TodoWrite", "state": "celebrating"}]}"#,
        )
        .unwrap();
        assert_eq!(
            s.tool_overrides,
            vec![ToolOverride {
                event: "PreToolUse".to_string(),
                tool: "TodoWrite".to_string(),
                state: "celebrating".to_string(),
            }]
        );
    }
}
