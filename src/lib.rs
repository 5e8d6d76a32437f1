//! Endless Drive - runtime core of an endless-driving arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (vehicles, crash handling, world streaming, traffic)
//! - `audio`: Abstract audio collaborator and the car audio controller
//! - `settings`: Session configuration (JSON)
//! - `tuning`: Data-driven per-vehicle balance
//! - `error`: Configuration and simulation errors

pub mod audio;
pub mod error;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use error::{ConfigError, SimError};
pub use settings::Settings;
pub use tuning::VehicleTuning;

use glam::{Quat, Vec2, Vec3};

/// Game configuration constants
pub mod consts {
    /// Fixed physics timestep (50 Hz)
    pub const SIM_DT: f32 = 1.0 / 50.0;
    /// Periodic bookkeeping interval (10 Hz)
    pub const PERIODIC_INTERVAL: f32 = 0.1;
    /// Maximum physics substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame delta the scheduler will accept
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Gravity along world up (m/s²)
    pub const GRAVITY: f32 = -9.81;

    /// Road section defaults
    pub const SECTION_LENGTH: f32 = 26.0;
    pub const SECTION_RING_SIZE: usize = 10;
    pub const SECTION_POOL_SIZE: usize = 20;

    /// Traffic defaults
    pub const TRAFFIC_POOL_SIZE: usize = 20;
    pub const TRAFFIC_LANE_Y: f32 = -1.4;

    /// km/h per m/s
    pub const MS_TO_KMH: f32 = 3.6;
}

/// Clamp a 2D vector to at most `max` length; non-finite input collapses to zero
#[inline]
pub fn clamp_magnitude(v: Vec2, max: f32) -> Vec2 {
    if !v.is_finite() {
        return Vec2::ZERO;
    }
    // Huge components would overflow length_squared to infinity
    let largest = v.abs().max_element();
    let v = if largest > max { v / largest * max } else { v };
    v.clamp_length_max(max)
}

/// Linear interpolation with `t` clamped to [0, 1]
#[inline]
pub fn lerp_clamped(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Where `value` sits between `min` and `max`, clamped to [0, 1]
#[inline]
pub fn inverse_lerp_clamped(min: f32, max: f32, value: f32) -> f32 {
    if (max - min).abs() <= f32::EPSILON {
        return if value >= max { 1.0 } else { 0.0 };
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Heading of a rotation around world up (radians, 0 = +Z)
#[inline]
pub fn yaw_of(rotation: Quat) -> f32 {
    let forward = rotation * Vec3::Z;
    forward.x.atan2(forward.z)
}

/// Rotation keeping only the heading of `rotation` (upright, no pitch or roll)
#[inline]
pub fn level_rotation(rotation: Quat) -> Quat {
    Quat::from_rotation_y(yaw_of(rotation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clamp_magnitude_keeps_short_vectors() {
        let v = Vec2::new(0.3, -0.4);
        assert_eq!(clamp_magnitude(v, 1.0), v);
    }

    #[test]
    fn test_clamp_magnitude_rejects_nan() {
        assert_eq!(clamp_magnitude(Vec2::new(f32::NAN, 1.0), 1.0), Vec2::ZERO);
        assert_eq!(clamp_magnitude(Vec2::new(f32::INFINITY, 0.0), 1.0), Vec2::ZERO);
    }

    #[test]
    fn test_clamp_magnitude_survives_huge_components() {
        let clamped = clamp_magnitude(Vec2::new(0.0, 1e20), 1.0);
        assert!((clamped - Vec2::new(0.0, 1.0)).length() < 1e-6);
        let diagonal = clamp_magnitude(Vec2::new(-3e38, 3e38), 1.0);
        assert!((diagonal.length() - 1.0).abs() < 1e-5);
        assert!(diagonal.x < 0.0 && diagonal.y > 0.0);
    }

    #[test]
    fn test_inverse_lerp_degenerate_band() {
        assert_eq!(inverse_lerp_clamped(5.0, 5.0, 4.0), 0.0);
        assert_eq!(inverse_lerp_clamped(5.0, 5.0, 6.0), 1.0);
        assert!((inverse_lerp_clamped(5.0, 30.0, 17.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_level_rotation_keeps_heading() {
        let tilted = Quat::from_rotation_y(0.8) * Quat::from_rotation_x(0.6);
        let level = level_rotation(tilted);
        assert!((yaw_of(level) - 0.8).abs() < 1e-4);
        let up = level * Vec3::Y;
        assert!((up - Vec3::Y).length() < 1e-5);
    }

    proptest! {
        #[test]
        fn clamp_magnitude_never_exceeds_unit(x in -1e30f32..1e30, y in -1e30f32..1e30) {
            let v = Vec2::new(x, y);
            let clamped = clamp_magnitude(v, 1.0);
            prop_assert!(clamped.length() <= 1.0 + 1e-5);
            // Anything outside the unit circle comes back on it
            if v.length() > 1.0 {
                prop_assert!((clamped.length() - 1.0).abs() < 1e-5);
            }
        }
    }
}
