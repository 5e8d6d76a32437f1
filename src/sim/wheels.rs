//! Wheel-collider style actuation
//!
//! The controller emits per-wheel motor/brake torque and a front steer angle.
//! A host engine would feed these to its wheel colliders; `apply_wheel_commands`
//! is the simplified solver used when the core integrates the body itself.

use glam::Vec3;

use super::body::{Body, ForceMode};
use super::spatial::{LayerMask, Spatial};
use crate::tuning::WheelTuning;

pub const WHEEL_COUNT: usize = 4;

/// Wheel indices into the per-wheel arrays
pub const FRONT_LEFT: usize = 0;
pub const FRONT_RIGHT: usize = 1;
pub const REAR_LEFT: usize = 2;
pub const REAR_RIGHT: usize = 3;

/// Actuator commands for one tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelCommands {
    pub motor_torque: [f32; WHEEL_COUNT],
    pub brake_torque: [f32; WHEEL_COUNT],
    /// Front wheel steer angle (degrees)
    pub steer_angle: f32,
}

impl WheelCommands {
    /// Rear-wheel drive with the same torque on both driven wheels
    pub fn rear_drive(torque: f32) -> Self {
        let mut commands = Self::default();
        commands.motor_torque[REAR_LEFT] = torque;
        commands.motor_torque[REAR_RIGHT] = torque;
        commands
    }

    pub fn with_brake(mut self, torque: f32) -> Self {
        self.brake_torque = [torque; WHEEL_COUNT];
        self
    }

    pub fn with_steer(mut self, angle: f32) -> Self {
        self.steer_angle = angle;
        self
    }
}

/// Wheel hub offsets from the body origin, local space
pub fn wheel_offsets(tuning: &WheelTuning) -> [Vec3; WHEEL_COUNT] {
    let half_track = tuning.track_width * 0.5;
    let half_base = tuning.wheel_base * 0.5;
    let mut offsets = [Vec3::ZERO; WHEEL_COUNT];
    offsets[FRONT_LEFT] = Vec3::new(-half_track, 0.0, half_base);
    offsets[FRONT_RIGHT] = Vec3::new(half_track, 0.0, half_base);
    offsets[REAR_LEFT] = Vec3::new(-half_track, 0.0, -half_base);
    offsets[REAR_RIGHT] = Vec3::new(half_track, 0.0, -half_base);
    offsets
}

/// Which wheels touch the ground within `probe_distance`
pub fn probe_wheels(
    body: &Body,
    tuning: &WheelTuning,
    probe_distance: f32,
    spatial: &dyn Spatial,
) -> [bool; WHEEL_COUNT] {
    let down = -body.up();
    wheel_offsets(tuning).map(|offset| {
        let hub = body.position + body.rotation * offset;
        spatial
            .raycast(hub, down, probe_distance, LayerMask::GROUND)
            .is_some()
    })
}

/// Turn wheel commands into body motion. Only grounded wheels transmit torque.
pub fn apply_wheel_commands(
    body: &mut Body,
    commands: &WheelCommands,
    grounded: &[bool; WHEEL_COUNT],
    tuning: &WheelTuning,
    dt: f32,
) {
    let forward = body.forward();

    let mut drive = 0.0;
    let mut brake = 0.0;
    for i in 0..WHEEL_COUNT {
        if grounded[i] {
            drive += commands.motor_torque[i] / tuning.wheel_radius;
            brake += commands.brake_torque[i] / tuning.wheel_radius;
        }
    }

    if drive != 0.0 {
        body.apply_force(forward * drive, ForceMode::Force, dt);
    }

    // Brakes slow the car down but never push it backwards
    let speed = body.forward_speed();
    if brake > 0.0 && speed != 0.0 {
        let dv = (brake / body.mass * dt).min(speed.abs());
        body.apply_force(-forward * dv * speed.signum(), ForceMode::VelocityChange, dt);
    }

    let front_grounded = grounded[FRONT_LEFT] || grounded[FRONT_RIGHT];
    if front_grounded {
        let speed = body.forward_speed();
        let yaw_rate = speed * commands.steer_angle.to_radians().tan() / tuning.wheel_base;
        body.angular_velocity.y = yaw_rate.clamp(-body.max_angular_speed, body.max_angular_speed);
    }

    if grounded.iter().any(|g| *g) {
        let right = body.right();
        let lateral = body.linear_velocity.dot(right);
        let removed = lateral * (tuning.lateral_grip * dt).clamp(0.0, 1.0);
        body.linear_velocity -= right * removed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::spatial::FlatGround;

    fn grounded_body() -> Body {
        Body::new(1200.0, 0.05, 7.0)
    }

    #[test]
    fn test_all_wheels_grounded_on_flat_road() {
        let body = grounded_body();
        let tuning = WheelTuning::default();
        let contacts = probe_wheels(&body, &tuning, 0.5, &FlatGround::new(0.0));
        assert_eq!(contacts, [true; WHEEL_COUNT]);

        let mut airborne = grounded_body();
        airborne.position.y = 2.0;
        let contacts = probe_wheels(&airborne, &tuning, 0.5, &FlatGround::new(0.0));
        assert_eq!(contacts, [false; WHEEL_COUNT]);
    }

    #[test]
    fn test_motor_torque_accelerates_forward() {
        let mut body = grounded_body();
        let tuning = WheelTuning::default();
        let commands = WheelCommands::rear_drive(500.0);
        apply_wheel_commands(&mut body, &commands, &[true; WHEEL_COUNT], &tuning, 0.02);

        // 2 wheels * 500 N·m / 0.35 m over 1200 kg for 0.02 s
        let expected = 2.0 * 500.0 / 0.35 / 1200.0 * 0.02;
        assert!((body.forward_speed() - expected).abs() < 1e-5);
    }

    #[test]
    fn test_airborne_wheels_transmit_nothing() {
        let mut body = grounded_body();
        let tuning = WheelTuning::default();
        let commands = WheelCommands::rear_drive(500.0).with_steer(20.0);
        apply_wheel_commands(&mut body, &commands, &[false; WHEEL_COUNT], &tuning, 0.02);
        assert_eq!(body.linear_velocity, Vec3::ZERO);
        assert_eq!(body.angular_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_brakes_stop_without_reversing() {
        let mut body = grounded_body();
        body.linear_velocity = Vec3::Z * 0.1;
        let tuning = WheelTuning::default();
        let commands = WheelCommands::default().with_brake(1000.0);
        apply_wheel_commands(&mut body, &commands, &[true; WHEEL_COUNT], &tuning, 0.02);
        assert!(body.forward_speed().abs() < 1e-6);
    }

    #[test]
    fn test_steering_yaws_toward_angle() {
        let mut body = grounded_body();
        body.linear_velocity = Vec3::Z * 10.0;
        let tuning = WheelTuning::default();
        let commands = WheelCommands::default().with_steer(15.0);
        apply_wheel_commands(&mut body, &commands, &[true; WHEEL_COUNT], &tuning, 0.02);
        assert!(body.angular_velocity.y > 0.0);
    }
}
