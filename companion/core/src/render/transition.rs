//! Entry Animations
//!
//! One-shot animations played when a state is entered. While one runs it
//! replaces the baseline breathing, sway and cursor pose; once its duration
//! passes it yields nothing, even if the state itself is permanent.

use std::f32::consts::TAU;
use std::time::Duration;

use serde::Serialize;

use super::easing::EasingFunction;
use crate::state::CompanionState;

/// A one-shot animation keyed by state
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryAnimation {
    /// Start enlarged and settle elastically to normal size
    ScalePop {
        /// Peak scale
        scale: f32,
        /// Length of the animation
        duration: Duration,
    },
    /// Drop from a height and bounce to rest
    Bounce {
        /// Starting height in pixels
        height: f32,
        /// Length of the animation
        duration: Duration,
    },
    /// Horizontal shake with decaying amplitude
    Shake {
        /// Peak displacement in pixels
        intensity: f32,
        /// Full oscillations
        cycles: u32,
        /// Length of the animation
        duration: Duration,
    },
}

/// Pose contribution of an entry animation at one instant
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct EntryPose {
    /// Horizontal offset in pixels
    pub dx: f32,
    /// Vertical offset in pixels (positive is up)
    pub dy: f32,
    /// Scale multiplier
    pub scale: f32,
}

impl EntryAnimation {
    /// Animation played on entering `state`, if any
    #[must_use]
    pub fn for_state(state: CompanionState) -> Option<Self> {
        let anim = match state {
            CompanionState::Greeting => Self::ScalePop {
                scale: 1.15,
                duration: Duration::from_millis(400),
            },
            CompanionState::Working => Self::Bounce {
                height: 6.0,
                duration: Duration::from_millis(300),
            },
            CompanionState::Success => Self::Bounce {
                height: 15.0,
                duration: Duration::from_millis(500),
            },
            CompanionState::Error => Self::Shake {
                intensity: 5.0,
                cycles: 4,
                duration: Duration::from_millis(400),
            },
            CompanionState::Celebrating => Self::Bounce {
                height: 25.0,
                duration: Duration::from_millis(600),
            },
            CompanionState::Farewell => Self::ScalePop {
                scale: 1.1,
                duration: Duration::from_millis(300),
            },
            CompanionState::Idle | CompanionState::Sleeping => return None,
        };
        Some(anim)
    }

    /// Short name for logs and frames
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ScalePop { .. } => "scale_pop",
            Self::Bounce { .. } => "bounce",
            Self::Shake { .. } => "shake",
        }
    }

    /// Nominal length
    #[must_use]
    pub fn duration(&self) -> Duration {
        match *self {
            Self::ScalePop { duration, .. }
            | Self::Bounce { duration, .. }
            | Self::Shake { duration, .. } => duration,
        }
    }

    /// Pose at `since_entry`, or `None` once finished
    ///
    /// `limit` caps the animation to the state's display duration.
    #[must_use]
    pub fn sample(&self, since_entry: Duration, limit: Option<Duration>) -> Option<EntryPose> {
        let window = limit.map_or(self.duration(), |l| l.min(self.duration()));
        if window.is_zero() || since_entry >= window {
            return None;
        }

        // Progress is measured against the nominal length so a capped
        // animation is cut short rather than sped up.
        let p = since_entry.as_secs_f32() / self.duration().as_secs_f32();

        let pose = match *self {
            Self::ScalePop { scale, .. } => {
                let eased = EasingFunction::EaseOutElastic.apply(p);
                EntryPose {
                    scale: scale + (1.0 - scale) * eased,
                    ..EntryPose::identity()
                }
            }
            Self::Bounce { height, .. } => {
                let eased = EasingFunction::EaseOutBounce.apply(p);
                EntryPose {
                    dy: height * (1.0 - eased),
                    ..EntryPose::identity()
                }
            }
            Self::Shake {
                intensity, cycles, ..
            } => {
                #[allow(clippy::cast_precision_loss)]
                let wave = (TAU * cycles as f32 * p).sin();
                EntryPose {
                    dx: intensity * wave * (1.0 - p),
                    ..EntryPose::identity()
                }
            }
        };
        Some(pose)
    }
}

impl EntryPose {
    /// No displacement at unit scale
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            dx: 0.0,
            dy: 0.0,
            scale: 1.0,
        }
    }
}
