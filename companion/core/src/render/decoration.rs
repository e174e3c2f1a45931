//! Emotion Decorations
//!
//! Small animated glyphs drawn above the character. Positions are
//! fractions of the character's bounding box (0,0 top-left, 1,1
//! bottom-right) so any renderer can place them.

use std::f32::consts::{PI, TAU};

use serde::Serialize;

use crate::state::CompanionState;

/// Glyph families
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    /// Drop sliding down beside the head
    SweatDrop,
    /// Twinkling points around the body
    Sparkle,
    /// Stars orbiting the head
    Star,
    /// Z letters drifting upward
    Zzz,
    /// Pulsing concentration strokes
    FocusLines,
}

/// One glyph instance in a frame
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Decoration {
    /// Glyph family
    pub emotion: Emotion,
    /// Character to draw
    pub glyph: char,
    /// Horizontal position (fraction of width)
    pub x: f32,
    /// Vertical position (fraction of height)
    pub y: f32,
    /// Size multiplier
    pub scale: f32,
    /// Opacity (0-1)
    pub opacity: f32,
    /// Rotation in degrees
    pub rotation: f32,
}

const SPARKLE_SPOTS: [(f32, f32, f32); 3] = [(0.15, 0.2, 0.0), (0.85, 0.3, 0.33), (0.75, 0.05, 0.66)];
const STAR_PHASES: [f32; 2] = [0.0, 0.5];
const ZZZ_PHASES: [f32; 3] = [0.0, 0.33, 0.66];
const FOCUS_ANGLES: [f32; 4] = [-60.0, -20.0, 20.0, 60.0];

impl Emotion {
    /// Glyphs shown in `state`
    #[must_use]
    pub fn for_state(state: CompanionState) -> &'static [Emotion] {
        match state {
            CompanionState::Error => &[Self::SweatDrop],
            CompanionState::Success => &[Self::Sparkle],
            CompanionState::Celebrating => &[Self::Sparkle, Self::Star],
            CompanionState::Sleeping => &[Self::Zzz],
            CompanionState::Working => &[Self::FocusLines],
            CompanionState::Idle | CompanionState::Greeting | CompanionState::Farewell => &[],
        }
    }

    /// Character drawn for this family
    #[must_use]
    pub fn glyph(self) -> char {
        match self {
            Self::SweatDrop => '💧',
            Self::Sparkle => '✨',
            Self::Star => '⭐',
            Self::Zzz => 'z',
            Self::FocusLines => '|',
        }
    }

    /// Glyph instances at `t` seconds since the state was entered
    #[must_use]
    pub fn sample(self, t: f32) -> Vec<Decoration> {
        let glyph = self.glyph();
        let base = Decoration {
            emotion: self,
            glyph,
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            opacity: 1.0,
            rotation: 0.0,
        };

        match self {
            Self::SweatDrop => {
                let p = cycle(t, 1.2, 0.0);
                vec![Decoration {
                    x: 0.78,
                    y: 0.18 + 0.06 * p,
                    opacity: 1.0 - p,
                    ..base
                }]
            }
            Self::Sparkle => SPARKLE_SPOTS
                .iter()
                .map(|&(x, y, offset)| {
                    let p = cycle(t, 1.5, offset);
                    let pulse = (PI * p).sin().max(0.0);
                    Decoration {
                        x,
                        y,
                        scale: pulse,
                        opacity: pulse,
                        rotation: 90.0 * p,
                        ..base
                    }
                })
                .collect(),
            Self::Star => STAR_PHASES
                .iter()
                .map(|&offset| {
                    let angle = TAU * (t / 3.0 + offset);
                    Decoration {
                        x: 0.5 + 0.45 * angle.cos(),
                        y: 0.2 + 0.1 * angle.sin(),
                        scale: 0.8,
                        ..base
                    }
                })
                .collect(),
            Self::Zzz => ZZZ_PHASES
                .iter()
                .map(|&offset| {
                    let p = cycle(t, 2.4, offset);
                    Decoration {
                        x: 0.7 + 0.12 * p + 0.03 * (TAU * p).sin(),
                        y: 0.15 - 0.2 * p,
                        scale: 0.6 + 0.6 * p,
                        opacity: 1.0 - p,
                        ..base
                    }
                })
                .collect(),
            Self::FocusLines => FOCUS_ANGLES
                .iter()
                .enumerate()
                .map(|(i, &angle)| {
                    #[allow(clippy::cast_precision_loss)]
                    let phase = i as f32 * 0.25;
                    Decoration {
                        x: 0.5 + 0.4 * angle.to_radians().sin(),
                        y: 0.1 - 0.08 * angle.to_radians().cos(),
                        scale: 0.8 + 0.2 * (TAU * (t / 0.6 + phase)).sin(),
                        opacity: 0.7,
                        rotation: angle,
                        ..base
                    }
                })
                .collect(),
        }
    }
}

/// Progress through a repeating cycle, in 0..1
fn cycle(t: f32, period: f32, offset: f32) -> f32 {
    (t / period + offset).rem_euclid(1.0)
}

/// Every glyph for `state` at `t` seconds since entry
#[must_use]
pub fn decorations_for(state: CompanionState, t: f32) -> Vec<Decoration> {
    Emotion::for_state(state)
        .iter()
        .flat_map(|e| e.sample(t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_glyph_table() {
        assert_eq!(Emotion::for_state(CompanionState::Error), &[Emotion::SweatDrop]);
        assert_eq!(
            Emotion::for_state(CompanionState::Celebrating),
            &[Emotion::Sparkle, Emotion::Star]
        );
        assert_eq!(Emotion::for_state(CompanionState::Sleeping), &[Emotion::Zzz]);
        assert_eq!(Emotion::for_state(CompanionState::Working), &[Emotion::FocusLines]);
        assert!(Emotion::for_state(CompanionState::Idle).is_empty());
        assert!(Emotion::for_state(CompanionState::Farewell).is_empty());
    }

    #[test]
    fn test_instances_per_family() {
        assert_eq!(decorations_for(CompanionState::Error, 0.5).len(), 1);
        assert_eq!(decorations_for(CompanionState::Success, 0.5).len(), 3);
        assert_eq!(decorations_for(CompanionState::Celebrating, 0.5).len(), 5);
        assert_eq!(decorations_for(CompanionState::Sleeping, 0.5).len(), 3);
        assert_eq!(decorations_for(CompanionState::Working, 0.5).len(), 4);
    }

    #[test]
    fn test_motion_is_periodic_and_bounded() {
        for state in CompanionState::ALL {
            for step in 0..50 {
                #[allow(clippy::cast_precision_loss)]
                let t = step as f32 * 0.137;
                for d in decorations_for(state, t) {
                    assert!((0.0..=1.0).contains(&d.opacity), "{d:?}");
                    assert!(d.scale >= 0.0, "{d:?}");
                }
            }
        }
        let a = Emotion::SweatDrop.sample(0.3);
        let b = Emotion::SweatDrop.sample(1.5);
        assert!((a[0].y - b[0].y).abs() < 1e-4);
    }

    #[test]
    fn test_zzz_rises_and_fades() {
        let early = Emotion::Zzz.sample(0.1)[0];
        let late = Emotion::Zzz.sample(2.0)[0];
        assert!(late.y < early.y);
        assert!(late.opacity < early.opacity);
    }
}
