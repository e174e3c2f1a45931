//! Render Pipeline
//!
//! Computes one [`RenderFrame`] per tick from the active state, the time
//! since it was entered, the global clock and the current settings.
//!
//! # Layers (bottom to top)
//!
//! 1. Aura glow beneath the character
//! 2. Base asset with the bottom alpha fade
//! 3. Transform: float, then either the entry animation or the baseline
//!    breathing, sway and cursor pose
//! 4. Emotion decorations
//! 5. Speech bubble
//!
//! [`RenderPipeline::render`] reads nothing but its arguments and the
//! settings it holds, so equal inputs always produce equal frames.

pub mod bubble;
pub mod color;
pub mod decoration;
pub mod easing;
pub mod gradient;
pub mod motion;
pub mod transition;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::settings::Settings;
use crate::state::CompanionState;

use self::bubble::BubbleLayout;
use self::color::Rgba;
use self::decoration::{decorations_for, Decoration};
use self::gradient::{GradientCache, Sprite};
use self::motion::Point;
use self::transition::EntryAnimation;

/// Length of the window fade at startup and at the end of farewell
pub const WINDOW_FADE: Duration = Duration::from_millis(300);

/// Everything a frame depends on besides settings
#[derive(Clone, Copy, Debug)]
pub struct RenderInput<'a> {
    /// Active state
    pub state: CompanionState,
    /// Time since the active state was entered
    pub since_entry: Duration,
    /// Time since the engine started
    pub clock: Duration,
    /// Bubble message chosen for this state
    pub bubble: Option<&'a str>,
    /// Pointer position, when known
    pub pointer: Option<Point>,
    /// Character anchor on screen
    pub anchor: Point,
    /// Resolved base image
    pub asset: Option<&'a Path>,
}

impl<'a> RenderInput<'a> {
    /// Input with no pointer, bubble or asset
    #[must_use]
    pub fn new(state: CompanionState, since_entry: Duration, clock: Duration) -> Self {
        Self {
            state,
            since_entry,
            clock,
            bubble: None,
            pointer: None,
            anchor: Point::default(),
            asset: None,
        }
    }

    /// Attach a bubble message
    #[must_use]
    pub fn with_bubble(mut self, text: Option<&'a str>) -> Self {
        self.bubble = text;
        self
    }

    /// Attach the pointer and anchor positions
    #[must_use]
    pub fn with_pointer(mut self, pointer: Option<Point>, anchor: Point) -> Self {
        self.pointer = pointer;
        self.anchor = anchor;
        self
    }

    /// Attach the base image path
    #[must_use]
    pub fn with_asset(mut self, asset: Option<&'a Path>) -> Self {
        self.asset = asset;
        self
    }
}

/// Soft glow drawn beneath the character
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Aura {
    /// Blur radius in pixels
    pub radius: f32,
    /// Glow colour
    pub color: Rgba,
    /// Glow opacity
    pub opacity: f32,
}

/// Bottom fade parameters for the base image
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GradientParams {
    /// Fraction of the height that fades
    pub percentage: f32,
    /// Fraction of the height where the fade starts
    pub start_fraction: f32,
}

/// Where the overlay window sits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Placement {
    /// Maximum character height in pixels
    pub max_height: u32,
    /// Horizontal offset from the screen edge
    pub offset_x: i32,
    /// Vertical offset from the screen edge
    pub offset_y: i32,
}

/// Fully computed visuals for one instant
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderFrame {
    /// State being shown
    pub state: CompanionState,
    /// Base image, if the theme resolved one
    pub asset: Option<PathBuf>,
    /// Window placement
    pub placement: Placement,
    /// Whole-window opacity (fades at startup and farewell)
    pub opacity: f32,
    /// Horizontal offset in pixels
    pub offset_x: f32,
    /// Vertical offset in pixels (positive is up)
    pub offset_y: f32,
    /// Scale multiplier
    pub scale: f32,
    /// Rotation in degrees
    pub rotation: f32,
    /// Glow beneath the base image
    pub aura: Aura,
    /// Bottom fade, when enabled
    pub gradient: Option<GradientParams>,
    /// Entry animation currently playing
    pub entry_animation: Option<&'static str>,
    /// Emotion glyphs, drawn above the base
    pub decorations: Vec<Decoration>,
    /// Speech bubble, drawn last
    pub bubble: Option<BubbleLayout>,
}

/// Turns engine state into frames
#[derive(Debug)]
pub struct RenderPipeline {
    settings: Arc<Settings>,
    gradients: GradientCache,
}

impl RenderPipeline {
    /// Pipeline using `settings`
    #[must_use]
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            gradients: GradientCache::new(),
        }
    }

    /// Settings in effect
    #[must_use]
    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Swap in reloaded settings
    pub fn set_settings(&mut self, settings: Arc<Settings>) {
        self.settings = settings;
    }

    /// Compute the frame for `input`
    #[must_use]
    pub fn render(&self, input: &RenderInput<'_>) -> RenderFrame {
        let settings = &self.settings;
        let immersion = &settings.immersion;
        let t = input.clock.as_secs_f32();

        let mut offset_x = 0.0;
        let mut offset_y = if immersion.floating {
            motion::float_offset(t)
        } else {
            0.0
        };
        let mut scale = 1.0;
        let mut rotation = 0.0;

        let limit = settings.timings().duration_for(input.state);
        let entry = immersion
            .transitions
            .then(|| EntryAnimation::for_state(input.state))
            .flatten()
            .and_then(|anim| anim.sample(input.since_entry, limit).map(|pose| (anim, pose)));

        if let Some((_, pose)) = entry {
            offset_x += pose.dx;
            offset_y += pose.dy;
            scale *= pose.scale;
        } else {
            if immersion.breathing {
                scale *= motion::breathing_scale(t);
            }
            if immersion.sway {
                let sway = motion::sway(t);
                rotation += sway.rotation;
                offset_x += sway.drift_x;
            }
            if immersion.cursor_influence {
                if let Some(pointer) = input.pointer {
                    let lean = motion::cursor_influence(
                        pointer,
                        input.anchor,
                        immersion.cursor_influence_strength,
                    );
                    rotation += lean.tilt;
                    offset_x += lean.shift_x;
                    offset_y += lean.shift_y;
                }
            }
        }

        let percentage = settings.gradient_percentage();
        let gradient = (percentage > 0.0).then(|| GradientParams {
            percentage,
            start_fraction: 1.0 - percentage,
        });

        let decorations = if settings.emotion_overlays.enabled {
            decorations_for(input.state, input.since_entry.as_secs_f32())
        } else {
            Vec::new()
        };

        let bubble = if settings.speech_bubble.enabled {
            input
                .bubble
                .and_then(|text| bubble::layout(text, &settings.speech_bubble, input.since_entry))
        } else {
            None
        };

        RenderFrame {
            state: input.state,
            asset: input.asset.map(Path::to_path_buf),
            placement: Placement {
                max_height: settings.overlay.max_height,
                offset_x: settings.overlay.offset_x,
                offset_y: settings.overlay.offset_y,
            },
            opacity: self.window_opacity(input, limit),
            offset_x,
            offset_y,
            scale,
            rotation,
            aura: Aura {
                radius: motion::aura_radius(t),
                color: motion::AURA_COLOR,
                opacity: motion::AURA_OPACITY,
            },
            gradient,
            entry_animation: entry.map(|(anim, _)| anim.name()),
            decorations,
            bubble,
        }
    }

    fn window_opacity(&self, input: &RenderInput<'_>, limit: Option<Duration>) -> f32 {
        if !self.settings.overlay.fade_animation {
            return 1.0;
        }
        let fade = WINDOW_FADE.as_secs_f32();
        let fade_in = (input.clock.as_secs_f32() / fade).min(1.0);
        let fade_out = match (input.state, limit) {
            (CompanionState::Farewell, Some(limit)) => {
                (limit.saturating_sub(input.since_entry).as_secs_f32() / fade).min(1.0)
            }
            _ => 1.0,
        };
        fade_in.min(fade_out)
    }

    /// Base image with the configured bottom fade, cached per asset
    ///
    /// For platforms that decode images themselves and want the faded
    /// pixels rather than the fade parameters.
    pub fn faded_sprite(&mut self, asset: &str, sprite: &Sprite) -> Arc<Sprite> {
        let percentage = self.settings.gradient_percentage();
        self.gradients.get_or_apply(asset, sprite, percentage)
    }

    /// Drop cached faded images (theme change)
    pub fn clear_cache(&mut self) {
        self.gradients.clear();
    }
}
