//! Idle Motion
//!
//! Continuous, phase-based motion functions of the global clock. None of
//! them keep state; the same `t` always yields the same value.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use super::color::Rgba;

/// Vertical float amplitude in pixels
pub const FLOAT_AMPLITUDE: f32 = 3.0;
/// Vertical float period in seconds
pub const FLOAT_PERIOD: f32 = 2.5;
/// Breathing scale amplitude (fraction of size)
pub const BREATH_INTENSITY: f32 = 0.008;
/// Breathing period in seconds
pub const BREATH_PERIOD: f32 = 3.5;
/// Maximum sway rotation in degrees
pub const SWAY_ANGLE: f32 = 1.5;
/// Sway period in seconds
pub const SWAY_PERIOD: f32 = 4.0;
/// Horizontal drift accompanying sway, in pixels
pub const SWAY_DRIFT: f32 = 1.0;
/// Maximum tilt toward the pointer in degrees
pub const CURSOR_TILT_MAX: f32 = 3.0;
/// Maximum shift toward the pointer in pixels
pub const CURSOR_SHIFT_MAX: f32 = 4.0;
/// Pointer distance at which influence reaches zero
pub const CURSOR_FALLOFF: f32 = 400.0;
/// Aura radius at the bottom of its pulse
pub const AURA_MIN_RADIUS: f32 = 8.0;
/// Aura radius at the top of its pulse
pub const AURA_MAX_RADIUS: f32 = 14.0;
/// Aura pulse period in seconds
pub const AURA_PERIOD: f32 = 2.0;
/// Aura opacity
pub const AURA_OPACITY: f32 = 0.35;
/// Aura colour
pub const AURA_COLOR: Rgba = Rgba::new(0.55, 0.45, 1.0, 1.0);

/// A point in screen pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate
    pub x: f32,
    /// Vertical coordinate
    pub y: f32,
}

impl Point {
    /// Build a point
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    #[must_use]
    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

fn wave(t: f32, period: f32) -> f32 {
    (TAU * t / period).sin()
}

/// Vertical float offset (positive is up)
#[must_use]
pub fn float_offset(t: f32) -> f32 {
    FLOAT_AMPLITUDE * wave(t, FLOAT_PERIOD)
}

/// Breathing scale multiplier
#[must_use]
pub fn breathing_scale(t: f32) -> f32 {
    1.0 + BREATH_INTENSITY * wave(t, BREATH_PERIOD)
}

/// Sway pose at a point in time
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sway {
    /// Rotation in degrees
    pub rotation: f32,
    /// Horizontal drift in pixels
    pub drift_x: f32,
}

/// Rotational sway with a quarter-phase horizontal drift
#[must_use]
pub fn sway(t: f32) -> Sway {
    let phase = TAU * t / SWAY_PERIOD;
    Sway {
        rotation: SWAY_ANGLE * phase.sin(),
        drift_x: SWAY_DRIFT * phase.cos(),
    }
}

/// Pose adjustment toward the pointer
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CursorInfluence {
    /// Tilt in degrees (positive leans right)
    pub tilt: f32,
    /// Horizontal shift in pixels
    pub shift_x: f32,
    /// Vertical shift in pixels (positive is up)
    pub shift_y: f32,
}

/// Lean toward the pointer, decaying linearly to zero at [`CURSOR_FALLOFF`]
///
/// `strength` scales the result (0-1). A pointer exactly on the anchor has
/// no direction and yields no influence.
#[must_use]
pub fn cursor_influence(pointer: Point, anchor: Point, strength: f32) -> CursorInfluence {
    let distance = pointer.distance(anchor);
    if distance >= CURSOR_FALLOFF || distance <= f32::EPSILON {
        return CursorInfluence::default();
    }

    let factor = (1.0 - distance / CURSOR_FALLOFF) * strength.clamp(0.0, 1.0);
    let dir_x = (pointer.x - anchor.x) / distance;
    // Screen y grows downward; influence y is positive upward
    let dir_y = (anchor.y - pointer.y) / distance;

    CursorInfluence {
        tilt: CURSOR_TILT_MAX * dir_x * factor,
        shift_x: CURSOR_SHIFT_MAX * dir_x * factor,
        shift_y: CURSOR_SHIFT_MAX * 0.5 * dir_y * factor,
    }
}

/// Pulsing aura radius
#[must_use]
pub fn aura_radius(t: f32) -> f32 {
    AURA_MIN_RADIUS + (AURA_MAX_RADIUS - AURA_MIN_RADIUS) * (0.5 + 0.5 * wave(t, AURA_PERIOD))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn test_float_wave() {
        assert!(float_offset(0.0).abs() < EPS);
        assert!((float_offset(FLOAT_PERIOD / 4.0) - FLOAT_AMPLITUDE).abs() < EPS);
        assert!((float_offset(FLOAT_PERIOD * 0.75) + FLOAT_AMPLITUDE).abs() < EPS);
    }

    #[test]
    fn test_breathing_wave() {
        assert!((breathing_scale(0.0) - 1.0).abs() < EPS);
        assert!((breathing_scale(BREATH_PERIOD / 4.0) - (1.0 + BREATH_INTENSITY)).abs() < EPS);
    }

    #[test]
    fn test_sway_wave() {
        let start = sway(0.0);
        assert!(start.rotation.abs() < EPS);
        assert!((start.drift_x - SWAY_DRIFT).abs() < EPS);
        assert!((sway(SWAY_PERIOD / 4.0).rotation - SWAY_ANGLE).abs() < EPS);
    }

    #[test]
    fn test_aura_range() {
        assert!((aura_radius(0.0) - (AURA_MIN_RADIUS + AURA_MAX_RADIUS) / 2.0).abs() < EPS);
        assert!((aura_radius(AURA_PERIOD / 4.0) - AURA_MAX_RADIUS).abs() < EPS);
        assert!((aura_radius(AURA_PERIOD * 0.75) - AURA_MIN_RADIUS).abs() < EPS);
    }

    #[test]
    fn test_cursor_influence_decays_linearly() {
        let anchor = Point::new(500.0, 500.0);
        let near = cursor_influence(Point::new(600.0, 500.0), anchor, 1.0);
        let far = cursor_influence(Point::new(800.0, 500.0), anchor, 1.0);

        assert!((near.tilt - CURSOR_TILT_MAX * 0.75).abs() < EPS);
        assert!((far.tilt - CURSOR_TILT_MAX * 0.25).abs() < EPS);
        assert!(near.shift_y.abs() < EPS);
    }

    #[test]
    fn test_cursor_influence_zero_beyond_falloff() {
        let anchor = Point::new(0.0, 0.0);
        assert_eq!(
            cursor_influence(Point::new(CURSOR_FALLOFF, 0.0), anchor, 1.0),
            CursorInfluence::default()
        );
        assert_eq!(
            cursor_influence(Point::new(0.0, 1000.0), anchor, 1.0),
            CursorInfluence::default()
        );
        assert_eq!(cursor_influence(anchor, anchor, 1.0), CursorInfluence::default());
    }

    #[test]
    fn test_cursor_influence_direction_and_strength() {
        let anchor = Point::new(100.0, 100.0);
        let left = cursor_influence(Point::new(0.0, 100.0), anchor, 1.0);
        assert!(left.tilt < 0.0 && left.shift_x < 0.0);

        let above = cursor_influence(Point::new(100.0, 0.0), anchor, 1.0);
        assert!(above.shift_y > 0.0);

        let half = cursor_influence(Point::new(0.0, 100.0), anchor, 0.5);
        assert!((half.tilt - left.tilt * 0.5).abs() < EPS);
    }
}
