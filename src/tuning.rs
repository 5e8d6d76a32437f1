//! Data-driven vehicle balance
//!
//! Every vehicle gets one immutable `VehicleTuning`, loaded once with the
//! session settings. Angles are in degrees, speeds in m/s unless named otherwise.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ensure};

/// How a vehicle turns control decisions into motion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum ActuatorKind {
    /// Direct force/torque on the rigid body
    #[default]
    Force,
    /// Motor/brake/steer commands on four wheels
    Wheels(WheelTuning),
}

/// Wheel-collider style drivetrain (rear-wheel drive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelTuning {
    /// Motor torque per driven wheel at full throttle (N·m)
    pub max_motor_torque: f32,
    /// Brake torque per wheel with the brake held (N·m)
    pub max_brake_torque: f32,
    /// Motor cuts out above this speed (km/h)
    pub max_speed_kmh: f32,
    pub wheel_radius: f32,
    /// Front-to-rear axle distance
    pub wheel_base: f32,
    /// Left-to-right wheel distance
    pub track_width: f32,
    /// Fraction of sideways velocity removed per second while grounded
    pub lateral_grip: f32,
}

impl Default for WheelTuning {
    fn default() -> Self {
        Self {
            max_motor_torque: 500.0,
            max_brake_torque: 1000.0,
            max_speed_kmh: 30.0,
            wheel_radius: 0.35,
            wheel_base: 2.5,
            track_width: 1.6,
            lateral_grip: 8.0,
        }
    }
}

/// Crash detection and recovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashTuning {
    /// Impulse magnitude that counts as a crash
    pub threshold: f32,
    /// Seconds spent crashed before recovery
    pub duration: f32,
    /// Velocity change along the reflected direction on impact
    pub bounce_force: f32,
    /// Angular velocity change scale for the tumble
    pub torque_force: f32,
    /// Linear damping while crashed
    pub drag: f32,
}

impl Default for CrashTuning {
    fn default() -> Self {
        Self {
            threshold: 5.0,
            duration: 3.0,
            bounce_force: 5.0,
            torque_force: 10.0,
            drag: 2.0,
        }
    }
}

/// Engine/skid/brake cue behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarAudioTuning {
    pub min_pitch: f32,
    pub max_pitch: f32,
    /// Skid kicks in when braking above this fraction of max forward velocity
    pub skid_speed_ratio: f32,
    /// Minimum speed for the brake cue
    pub brake_sound_threshold: f32,
    /// Minimum impulse for the crash cue
    pub crash_sound_threshold: f32,
    pub engine_volume: f32,
}

impl Default for CarAudioTuning {
    fn default() -> Self {
        Self {
            min_pitch: 0.5,
            max_pitch: 2.0,
            skid_speed_ratio: 0.92,
            brake_sound_threshold: 5.0,
            crash_sound_threshold: 5.0,
            engine_volume: 1.0,
        }
    }
}

/// Per-vehicle tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleTuning {
    pub actuator: ActuatorKind,
    pub mass: f32,

    // === Longitudinal ===
    pub acceleration_multiplier: f32,
    pub brake_multiplier: f32,
    /// Reverse is only driven while slower than this
    pub reverse_speed: f32,
    pub reverse_acceleration_multiplier: f32,
    /// Linear damping with no throttle
    pub idle_damping: f32,
    /// Forward speed above which negative throttle brakes instead of reversing
    pub brake_speed_threshold: f32,
    /// Forward velocity treated as "flat out" (audio)
    pub max_forward_velocity: f32,

    // === Steering ===
    pub max_steering_angle: f32,
    /// Full steering authority at or below this speed
    pub min_steering_speed: f32,
    /// No steering authority at or above this speed
    pub max_steering_speed: f32,
    pub steering_lerp_speed: f32,
    /// Yaw velocity change per degree of steer per m/s
    pub yaw_torque_factor: f32,
    /// Steer angle above which the drift side force applies
    pub drift_angle_threshold: f32,
    pub drift_force_factor: f32,
    pub max_angular_speed: f32,
    pub angular_damping: f32,
    /// Fraction of yaw/roll/pitch rate the road soaks up per second while grounded
    pub ground_angular_friction: f32,
    /// Fraction of sideways velocity the road soaks up per second while grounded
    pub ground_lateral_friction: f32,

    // === Jump ===
    pub jump_force: f32,
    pub ground_check_distance: f32,

    pub crash: CrashTuning,
    pub audio: CarAudioTuning,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            actuator: ActuatorKind::Force,
            mass: 1.0,

            acceleration_multiplier: 3.0,
            brake_multiplier: 15.0,
            reverse_speed: 5.0,
            reverse_acceleration_multiplier: 2.0,
            idle_damping: 0.5,
            brake_speed_threshold: 0.1,
            max_forward_velocity: 30.0,

            max_steering_angle: 25.0,
            min_steering_speed: 5.0,
            max_steering_speed: 30.0,
            steering_lerp_speed: 5.0,
            yaw_torque_factor: 0.05,
            drift_angle_threshold: 5.0,
            drift_force_factor: 0.1,
            max_angular_speed: 7.0,
            angular_damping: 0.05,
            ground_angular_friction: 8.0,
            ground_lateral_friction: 2.0,

            jump_force: 10.0,
            ground_check_distance: 0.5,

            crash: CrashTuning::default(),
            audio: CarAudioTuning::default(),
        }
    }
}

impl VehicleTuning {
    /// Wheel-driven preset: heavier body, torque-based drivetrain
    pub fn wheeled() -> Self {
        Self {
            actuator: ActuatorKind::Wheels(WheelTuning::default()),
            mass: 1200.0,
            max_steering_angle: 30.0,
            jump_force: 12000.0,
            ..Self::default()
        }
    }

    /// Fail fast on values that would misbehave at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(self.mass > 0.0 && self.mass.is_finite(), "vehicle.mass", "must be positive")?;
        ensure(
            self.acceleration_multiplier >= 0.0
                && self.brake_multiplier >= 0.0
                && self.reverse_acceleration_multiplier >= 0.0,
            "vehicle.multipliers",
            "acceleration/brake/reverse multipliers must not be negative",
        )?;
        ensure(self.reverse_speed >= 0.0, "vehicle.reverse_speed", "must not be negative")?;
        ensure(self.idle_damping >= 0.0, "vehicle.idle_damping", "must not be negative")?;
        ensure(
            self.max_forward_velocity > 0.0,
            "vehicle.max_forward_velocity",
            "must be positive",
        )?;
        ensure(
            self.min_steering_speed >= 0.0 && self.min_steering_speed < self.max_steering_speed,
            "vehicle.steering_speed",
            "min_steering_speed must be below max_steering_speed",
        )?;
        ensure(
            self.steering_lerp_speed >= 0.0,
            "vehicle.steering_lerp_speed",
            "must not be negative",
        )?;
        ensure(
            self.max_angular_speed > 0.0 && self.angular_damping >= 0.0,
            "vehicle.angular",
            "max_angular_speed must be positive and angular_damping non-negative",
        )?;
        ensure(
            self.ground_angular_friction >= 0.0 && self.ground_lateral_friction >= 0.0,
            "vehicle.ground_friction",
            "must not be negative",
        )?;
        ensure(
            self.ground_check_distance > 0.0,
            "vehicle.ground_check_distance",
            "must be positive",
        )?;
        ensure(self.jump_force >= 0.0, "vehicle.jump_force", "must not be negative")?;
        ensure(self.crash.threshold >= 0.0, "vehicle.crash.threshold", "must not be negative")?;
        ensure(self.crash.duration > 0.0, "vehicle.crash.duration", "must be positive")?;
        ensure(self.crash.drag >= 0.0, "vehicle.crash.drag", "must not be negative")?;
        ensure(
            self.audio.min_pitch <= self.audio.max_pitch,
            "vehicle.audio.pitch",
            "min_pitch must not exceed max_pitch",
        )?;

        if let ActuatorKind::Wheels(wheels) = &self.actuator {
            ensure(
                wheels.wheel_radius > 0.0 && wheels.wheel_base > 0.0 && wheels.track_width > 0.0,
                "vehicle.wheels.geometry",
                "wheel radius, base and track must be positive",
            )?;
            ensure(
                wheels.max_motor_torque >= 0.0 && wheels.max_brake_torque >= 0.0,
                "vehicle.wheels.torque",
                "torques must not be negative",
            )?;
            ensure(wheels.lateral_grip >= 0.0, "vehicle.wheels.lateral_grip", "must not be negative")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(VehicleTuning::default().validate().is_ok());
        assert!(VehicleTuning::wheeled().validate().is_ok());
    }

    #[test]
    fn test_inverted_steering_band_rejected() {
        let tuning = VehicleTuning {
            min_steering_speed: 30.0,
            max_steering_speed: 5.0,
            ..Default::default()
        };
        let err = tuning.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "vehicle.steering_speed",
                ..
            }
        ));
    }

    #[test]
    fn test_json_roundtrip_preserves_actuator() {
        let tuning = VehicleTuning::wheeled();
        let json = serde_json::to_string(&tuning).unwrap();
        let back: VehicleTuning = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tuning);
    }
}
