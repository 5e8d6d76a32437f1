//! Crash detection and recovery
//!
//! `Normal --[impulse > threshold]--> Crashed --[timer >= duration]--> Normal`.
//! Shared by every vehicle regardless of how it is actuated.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::{CollisionEvent, VehicleRole, ignores_impact, reflect};
use crate::tuning::CrashTuning;

/// Recovery fires once the timer is within this of the duration, so a run of
/// fixed steps that should sum to the duration isn't lost to rounding.
const TIMER_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrashState {
    Normal,
    Crashed,
}

/// Velocity changes to apply on crash entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrashImpulse {
    /// Linear velocity change (bounce off the contact)
    pub bounce: Vec3,
    /// Angular velocity change (tumble)
    pub spin: Vec3,
}

/// Why an impact didn't cause a crash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactIgnored {
    AlreadyCrashed,
    BelowThreshold,
    FilteredPartner,
    MalformedImpulse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrashMachine {
    state: CrashState,
    timer: f32,
    braking_enabled: bool,
}

impl Default for CrashMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CrashMachine {
    pub fn new() -> Self {
        Self {
            state: CrashState::Normal,
            timer: 0.0,
            braking_enabled: true,
        }
    }

    pub fn state(&self) -> CrashState {
        self.state
    }

    pub fn is_crashed(&self) -> bool {
        self.state == CrashState::Crashed
    }

    /// Seconds spent in the current crash (0 while Normal)
    pub fn timer(&self) -> f32 {
        self.timer
    }

    pub fn braking_enabled(&self) -> bool {
        self.braking_enabled
    }

    /// Back to Normal without a recovery (session restart / slot reuse)
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Evaluate an impact. On crash entry returns the impulses to apply.
    pub fn on_impact<R: Rng + ?Sized>(
        &mut self,
        role: VehicleRole,
        event: &CollisionEvent,
        velocity: Vec3,
        tuning: &CrashTuning,
        rng: &mut R,
    ) -> Result<CrashImpulse, ImpactIgnored> {
        if self.is_crashed() {
            return Err(ImpactIgnored::AlreadyCrashed);
        }
        let Some(impulse) = event.valid_impulse() else {
            log::warn!("Ignoring collision with malformed impulse {}", event.impulse);
            return Err(ImpactIgnored::MalformedImpulse);
        };
        if impulse <= tuning.threshold {
            return Err(ImpactIgnored::BelowThreshold);
        }
        if ignores_impact(role, event.other) {
            return Err(ImpactIgnored::FilteredPartner);
        }

        self.state = CrashState::Crashed;
        self.braking_enabled = false;
        self.timer = 0.0;

        let bounce = match event.unit_normal() {
            Some(normal) => reflect(velocity.normalize_or_zero(), normal) * tuning.bounce_force,
            None => {
                log::warn!("Crash with degenerate contact normal {:?}; no bounce", event.normal);
                Vec3::ZERO
            }
        };

        // Up axis biased positive so cars flip rather than dig in
        let spin = Vec3::new(
            rng.random_range(-1.0f32..=1.0),
            rng.random_range(0.5f32..=1.0),
            rng.random_range(-1.0f32..=1.0),
        ) * tuning.torque_force;

        Ok(CrashImpulse { bounce, spin })
    }

    /// Accumulate crash time. Returns true on the tick that recovers.
    pub fn advance(&mut self, dt: f32, tuning: &CrashTuning) -> bool {
        if !self.is_crashed() {
            return false;
        }
        self.timer += dt;
        if self.timer + TIMER_EPSILON >= tuning.duration {
            self.state = CrashState::Normal;
            self.braking_enabled = true;
            self.timer = 0.0;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::collision::CollisionParticipantKind;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn hit(other: CollisionParticipantKind, impulse: f32) -> CollisionEvent {
        CollisionEvent::new(other, impulse, Vec3::NEG_Z)
    }

    #[test]
    fn test_crash_and_recover_after_duration() {
        let tuning = CrashTuning::default();
        let mut rng = Pcg32::seed_from_u64(7);
        let mut crash = CrashMachine::new();

        let impulse = crash
            .on_impact(
                VehicleRole::Player,
                &hit(CollisionParticipantKind::Obstacle, 20.0),
                Vec3::Z * 30.0,
                &tuning,
                &mut rng,
            )
            .unwrap();
        assert!(crash.is_crashed());
        assert!(!crash.braking_enabled());
        // Head-on: bounce straight back
        assert!((impulse.bounce - Vec3::NEG_Z * tuning.bounce_force).length() < 1e-5);
        assert!(impulse.spin.y >= 0.5 * tuning.torque_force);

        let dt = 1.0 / 50.0;
        for _ in 0..149 {
            assert!(!crash.advance(dt, &tuning));
        }
        assert!(crash.is_crashed());
        assert!(crash.advance(dt, &tuning));
        assert_eq!(crash.state(), CrashState::Normal);
        assert!(crash.braking_enabled());
        assert_eq!(crash.timer(), 0.0);
    }

    #[test]
    fn test_soft_impacts_ignored() {
        let tuning = CrashTuning::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut crash = CrashMachine::new();
        let result = crash.on_impact(
            VehicleRole::Player,
            &hit(CollisionParticipantKind::Obstacle, 5.0),
            Vec3::Z,
            &tuning,
            &mut rng,
        );
        assert_eq!(result, Err(ImpactIgnored::BelowThreshold));
        assert!(!crash.is_crashed());
    }

    #[test]
    fn test_traffic_ignores_traffic_and_terrain() {
        let tuning = CrashTuning::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut crash = CrashMachine::new();
        for other in [CollisionParticipantKind::Traffic, CollisionParticipantKind::Terrain] {
            let result = crash.on_impact(VehicleRole::Traffic, &hit(other, 50.0), Vec3::Z, &tuning, &mut rng);
            assert_eq!(result, Err(ImpactIgnored::FilteredPartner));
        }
        assert!(!crash.is_crashed());
        assert!(crash.braking_enabled());

        assert!(
            crash
                .on_impact(
                    VehicleRole::Traffic,
                    &hit(CollisionParticipantKind::Player, 50.0),
                    Vec3::Z,
                    &tuning,
                    &mut rng
                )
                .is_ok()
        );
    }

    #[test]
    fn test_second_impact_while_crashed_ignored() {
        let tuning = CrashTuning::default();
        let mut rng = Pcg32::seed_from_u64(3);
        let mut crash = CrashMachine::new();
        let event = hit(CollisionParticipantKind::Obstacle, 30.0);
        assert!(crash.on_impact(VehicleRole::Player, &event, Vec3::Z, &tuning, &mut rng).is_ok());
        crash.advance(1.0, &tuning);
        assert_eq!(
            crash.on_impact(VehicleRole::Player, &event, Vec3::Z, &tuning, &mut rng),
            Err(ImpactIgnored::AlreadyCrashed)
        );
        // Timer keeps running from the first crash
        assert!((crash.timer() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_normal_crashes_without_nan() {
        let tuning = CrashTuning::default();
        let mut rng = Pcg32::seed_from_u64(5);
        let mut crash = CrashMachine::new();
        let event = CollisionEvent::new(CollisionParticipantKind::Obstacle, 30.0, Vec3::ZERO);
        let impulse = crash
            .on_impact(VehicleRole::Player, &event, Vec3::Z * 10.0, &tuning, &mut rng)
            .unwrap();
        assert_eq!(impulse.bounce, Vec3::ZERO);
        assert!(impulse.spin.is_finite());
        assert!(crash.is_crashed());
    }

    #[test]
    fn test_nan_impulse_rejected() {
        let tuning = CrashTuning::default();
        let mut rng = Pcg32::seed_from_u64(5);
        let mut crash = CrashMachine::new();
        let event = CollisionEvent::new(CollisionParticipantKind::Obstacle, f32::NAN, Vec3::Z);
        assert_eq!(
            crash.on_impact(VehicleRole::Player, &event, Vec3::Z, &tuning, &mut rng),
            Err(ImpactIgnored::MalformedImpulse)
        );
        assert!(!crash.is_crashed());
    }
}
