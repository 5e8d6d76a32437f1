//! Rigid body stand-in
//!
//! A minimal integrator with the force modes the vehicle controller needs.
//! Hosts with a real physics engine mirror this state in and out; headless
//! hosts (tests, the demo binary) integrate it directly.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// How a force/torque vector is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceMode {
    /// Continuous force, scaled by dt and inverse mass
    Force,
    /// Continuous acceleration, scaled by dt
    Acceleration,
    /// Instant change in momentum, scaled by inverse mass
    Impulse,
    /// Instant change in velocity
    VelocityChange,
}

/// Position and orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Kinetic state of one vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    /// Radians per second, world space
    pub angular_velocity: Vec3,
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub max_angular_speed: f32,
}

impl Body {
    pub fn new(mass: f32, angular_damping: f32, max_angular_speed: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass,
            linear_damping: 0.0,
            angular_damping,
            max_angular_speed,
        }
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Velocity projected onto the forward axis
    #[inline]
    pub fn forward_speed(&self) -> f32 {
        self.linear_velocity.dot(self.forward())
    }

    pub fn pose(&self) -> Pose {
        Pose {
            position: self.position,
            rotation: self.rotation,
        }
    }

    /// Teleport to `pose` and drop all motion
    pub fn reset_to(&mut self, pose: Pose) {
        self.position = pose.position;
        self.rotation = pose.rotation;
        self.linear_velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
        self.linear_damping = 0.0;
    }

    /// Change linear velocity. Non-finite vectors are dropped.
    pub fn apply_force(&mut self, force: Vec3, mode: ForceMode, dt: f32) {
        if !force.is_finite() {
            log::warn!("Dropped non-finite force {:?}", force);
            return;
        }
        self.linear_velocity += self.velocity_delta(force, mode, dt);
    }

    /// Change angular velocity. Non-finite vectors are dropped.
    pub fn apply_torque(&mut self, torque: Vec3, mode: ForceMode, dt: f32) {
        if !torque.is_finite() {
            log::warn!("Dropped non-finite torque {:?}", torque);
            return;
        }
        // Scalar inertia equal to mass
        self.angular_velocity += self.velocity_delta(torque, mode, dt);
        self.clamp_angular_speed();
    }

    fn velocity_delta(&self, v: Vec3, mode: ForceMode, dt: f32) -> Vec3 {
        match mode {
            ForceMode::Force => v * dt / self.mass,
            ForceMode::Acceleration => v * dt,
            ForceMode::Impulse => v / self.mass,
            ForceMode::VelocityChange => v,
        }
    }

    fn clamp_angular_speed(&mut self) {
        self.angular_velocity = self.angular_velocity.clamp_length_max(self.max_angular_speed);
    }

    /// Advance one step: gravity, damping, then position and orientation
    pub fn integrate(&mut self, dt: f32, gravity: f32) {
        self.linear_velocity.y += gravity * dt;
        self.linear_velocity *= (1.0 - self.linear_damping * dt).clamp(0.0, 1.0);
        self.angular_velocity *= (1.0 - self.angular_damping * dt).clamp(0.0, 1.0);
        self.clamp_angular_speed();

        self.position += self.linear_velocity * dt;
        let spin = self.angular_velocity * dt;
        if spin.length_squared() > 0.0 {
            self.rotation = (Quat::from_scaled_axis(spin) * self.rotation).normalize();
        }
    }

    /// Keep the body on top of the ground; kills downward velocity on contact
    pub fn rest_on(&mut self, ground_height: f32) {
        if self.position.y < ground_height {
            self.position.y = ground_height;
            if self.linear_velocity.y < 0.0 {
                self.linear_velocity.y = 0.0;
            }
        }
    }
}
