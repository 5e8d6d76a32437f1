//! Vehicle controller
//!
//! One physics tick turns the normalized `(steer, throttle)` input into
//! forces on the body (or wheel commands), handles jumping and ground
//! contact, and hands impacts to the crash state machine. Player and traffic
//! cars share this code; only the player drives audio.

use glam::{Vec2, Vec3};
use rand_pcg::Pcg32;

use super::body::{Body, ForceMode, Pose};
use super::collision::{CollisionEvent, VehicleRole};
use super::crash::{CrashImpulse, CrashMachine, CrashState, ImpactIgnored};
use super::spatial::{LayerMask, Spatial};
use super::wheels::{self, WHEEL_COUNT, WheelCommands};
use crate::audio::{AudioFrame, AudioSink, CarAudio, DriveMode};
use crate::consts::MS_TO_KMH;
use crate::tuning::{ActuatorKind, VehicleTuning};
use crate::{clamp_magnitude, inverse_lerp_clamped, lerp_clamped, level_rotation};

/// Throttle magnitudes below this count as no input
const THROTTLE_DEADZONE: f32 = 1e-3;

/// Collaborators a vehicle needs during a tick
pub struct TickContext<'a> {
    pub spatial: &'a dyn Spatial,
    pub audio: &'a mut dyn AudioSink,
    pub rng: &'a mut Pcg32,
    /// Gravity along world up
    pub gravity: f32,
}

/// What a tick applied, for hosts and tests
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Actuation {
    pub mode: DriveMode,
    /// Requested acceleration along the forward axis (negative = braking or reverse)
    pub longitudinal: f32,
    /// Drift acceleration along the right axis
    pub lateral: f32,
    /// Yaw velocity change about the up axis
    pub yaw: f32,
    /// Steering angle actually used for torque (sign flipped when reversing)
    pub applied_steer: f32,
    /// Commands sent to the wheels (wheel actuator only)
    pub wheels: Option<WheelCommands>,
    pub jumped: bool,
    /// True on the tick the vehicle left the Crashed state
    pub recovered: bool,
}

#[derive(Debug, Clone)]
pub struct VehicleDynamics {
    role: VehicleRole,
    tuning: VehicleTuning,
    body: Body,
    input: Vec2,
    brake_held: bool,
    jump_requested: bool,
    grounded: bool,
    jumping: bool,
    wheel_contacts: [bool; WHEEL_COUNT],
    /// Smoothed steering angle (degrees); this is what the wheels show
    steer_angle: f32,
    crash: CrashMachine,
    audio: Option<CarAudio>,
}

impl VehicleDynamics {
    pub fn new(role: VehicleRole, tuning: VehicleTuning) -> Self {
        let body = Body::new(tuning.mass, tuning.angular_damping, tuning.max_angular_speed);
        let audio = (role == VehicleRole::Player)
            .then(|| CarAudio::new(tuning.audio.clone(), tuning.max_forward_velocity));
        Self {
            role,
            tuning,
            body,
            input: Vec2::ZERO,
            brake_held: false,
            jump_requested: false,
            grounded: false,
            jumping: false,
            wheel_contacts: [false; WHEEL_COUNT],
            steer_angle: 0.0,
            crash: CrashMachine::new(),
            audio,
        }
    }

    // === Accessors ===

    pub fn role(&self) -> VehicleRole {
        self.role
    }

    pub fn tuning(&self) -> &VehicleTuning {
        &self.tuning
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Direct body access for hosts mirroring an external physics engine
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    pub fn position(&self) -> Vec3 {
        self.body.position
    }

    pub fn input(&self) -> Vec2 {
        self.input
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn is_jumping(&self) -> bool {
        self.jumping
    }

    pub fn crash_state(&self) -> CrashState {
        self.crash.state()
    }

    pub fn is_crashed(&self) -> bool {
        self.crash.is_crashed()
    }

    pub fn crash_timer(&self) -> f32 {
        self.crash.timer()
    }

    pub fn braking_enabled(&self) -> bool {
        self.crash.braking_enabled()
    }

    /// Smoothed steering angle shown on the front wheels (degrees)
    pub fn wheel_angle(&self) -> f32 {
        self.steer_angle
    }

    pub fn car_audio(&self) -> Option<&CarAudio> {
        self.audio.as_ref()
    }

    // === Input ===

    /// Store the steering/throttle vector, clamped to unit length.
    /// Ignored while crashed.
    pub fn set_input(&mut self, steer_throttle: Vec2) {
        if self.crash.is_crashed() {
            return;
        }
        let finite = |v: f32| if v.is_finite() { v } else { 0.0 };
        let sanitized = Vec2::new(finite(steer_throttle.x), finite(steer_throttle.y));
        self.input = clamp_magnitude(sanitized, 1.0);
    }

    /// Explicit brake button
    pub fn set_braking(&mut self, held: bool) {
        self.brake_held = held;
    }

    /// Jump on the next tick if grounded
    pub fn request_jump(&mut self) {
        self.jump_requested = true;
    }

    // === Lifecycle ===

    /// Teleport to `pose`, clear all motion, input and crash state
    pub fn reset_to(&mut self, pose: Pose) {
        self.body.reset_to(pose);
        self.input = Vec2::ZERO;
        self.brake_held = false;
        self.jump_requested = false;
        self.grounded = false;
        self.jumping = false;
        self.wheel_contacts = [false; WHEEL_COUNT];
        self.steer_angle = 0.0;
        self.crash.reset();
    }

    /// Start the engine loop (player only)
    pub fn start_audio(&mut self, sink: &mut dyn AudioSink) {
        if let Some(audio) = &mut self.audio {
            audio.start(sink);
        }
    }

    pub fn stop_audio(&mut self, sink: &mut dyn AudioSink) {
        if let Some(audio) = &mut self.audio {
            audio.stop_all(sink);
        }
    }

    // === Simulation ===

    /// Advance one fixed physics step
    pub fn tick(&mut self, dt: f32, ctx: &mut TickContext<'_>) -> Actuation {
        if self.crash.is_crashed() {
            return self.tick_crashed(dt, ctx);
        }

        self.probe_ground(ctx.spatial);
        let jumped = self.try_jump(ctx);

        let forward_speed = self.body.forward_speed();
        let applied_steer = self.update_steering(forward_speed, dt);

        let mut actuation = match self.tuning.actuator.clone() {
            ActuatorKind::Force => self.actuate_force(forward_speed, applied_steer, dt),
            ActuatorKind::Wheels(wheel_tuning) => {
                let throttle = self.input.y;
                let motor = if forward_speed.abs() * MS_TO_KMH < wheel_tuning.max_speed_kmh {
                    throttle * wheel_tuning.max_motor_torque
                } else {
                    0.0
                };
                let brake = if self.brake_held && self.crash.braking_enabled() {
                    wheel_tuning.max_brake_torque
                } else {
                    0.0
                };
                let commands = WheelCommands::rear_drive(motor)
                    .with_brake(brake)
                    .with_steer(self.steer_angle);
                wheels::apply_wheel_commands(
                    &mut self.body,
                    &commands,
                    &self.wheel_contacts,
                    &wheel_tuning,
                    dt,
                );

                let mode = self.wheel_drive_mode(throttle, brake, forward_speed);
                self.body.linear_damping = if mode == DriveMode::Coasting {
                    self.tuning.idle_damping
                } else {
                    0.0
                };
                Actuation {
                    mode,
                    longitudinal: motor / wheel_tuning.wheel_radius / self.body.mass,
                    wheels: Some(commands),
                    ..Default::default()
                }
            }
        };
        actuation.applied_steer = applied_steer;
        actuation.jumped = jumped;

        if let Some(audio) = &mut self.audio {
            let frame = AudioFrame {
                mode: actuation.mode,
                throttle: self.input.y,
                forward_speed: self.body.forward_speed(),
                speed: self.body.linear_velocity.length(),
                dt,
            };
            audio.update(&frame, ctx.audio);
        }

        self.integrate(dt, ctx);
        actuation
    }

    fn tick_crashed(&mut self, dt: f32, ctx: &mut TickContext<'_>) -> Actuation {
        // Edge-triggered; a jump pressed mid-crash is dropped
        self.jump_requested = false;
        self.body.linear_damping = self.tuning.crash.drag;
        if let Some(audio) = &mut self.audio {
            audio.fade_out(dt, ctx.audio);
        }

        let recovered = self.crash.advance(dt, &self.tuning.crash);
        if recovered {
            self.body.linear_damping = 0.0;
            self.body.rotation = level_rotation(self.body.rotation);
            self.body.angular_velocity = Vec3::ZERO;
            if let Some(audio) = &mut self.audio {
                audio.on_recover(ctx.audio);
            }
            log::debug!("{:?} recovered at z={:.1}", self.role, self.body.position.z);
        }

        self.integrate(dt, ctx);
        Actuation {
            recovered,
            ..Default::default()
        }
    }

    /// Route an impact through the crash state machine and apply the result
    pub fn on_collision(
        &mut self,
        event: &CollisionEvent,
        ctx: &mut TickContext<'_>,
    ) -> Result<CrashImpulse, ImpactIgnored> {
        let impulse = self.crash.on_impact(
            self.role,
            event,
            self.body.linear_velocity,
            &self.tuning.crash,
            &mut *ctx.rng,
        )?;

        self.input = Vec2::ZERO;
        self.body.apply_force(impulse.bounce, ForceMode::VelocityChange, 0.0);
        self.body.apply_torque(impulse.spin, ForceMode::VelocityChange, 0.0);
        if let Some(audio) = &mut self.audio {
            audio.on_crash(event.impulse, ctx.audio);
        }
        log::debug!(
            "{:?} crashed into {:?} (impulse {:.1}) at z={:.1}",
            self.role,
            event.other,
            event.impulse,
            self.body.position.z
        );
        Ok(impulse)
    }

    fn probe_ground(&mut self, spatial: &dyn Spatial) {
        let probe = self.tuning.ground_check_distance;
        self.grounded = match &self.tuning.actuator {
            ActuatorKind::Force => spatial
                .raycast(self.body.position, Vec3::NEG_Y, probe, LayerMask::GROUND)
                .is_some(),
            ActuatorKind::Wheels(wheel_tuning) => {
                self.wheel_contacts = wheels::probe_wheels(&self.body, wheel_tuning, probe, spatial);
                self.wheel_contacts.iter().any(|c| *c)
            }
        };

        if self.grounded && self.jumping && self.body.linear_velocity.y <= 0.0 {
            self.jumping = false;
        }
    }

    fn try_jump(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let requested = std::mem::take(&mut self.jump_requested);
        if !requested || !self.grounded || self.jumping {
            return false;
        }
        self.body
            .apply_force(Vec3::Y * self.tuning.jump_force, ForceMode::Impulse, 0.0);
        self.jumping = true;
        if let Some(audio) = &mut self.audio {
            audio.on_jump(ctx.audio);
        }
        true
    }

    /// Smooth toward the speed-scaled target angle. Returns the angle to apply,
    /// which is inverted while rolling backwards.
    fn update_steering(&mut self, forward_speed: f32, dt: f32) -> f32 {
        let t = &self.tuning;
        let speed_factor =
            inverse_lerp_clamped(t.min_steering_speed, t.max_steering_speed, forward_speed.abs());
        let target = t.max_steering_angle * self.input.x * (1.0 - speed_factor);
        self.steer_angle = lerp_clamped(self.steer_angle, target, t.steering_lerp_speed * dt);

        if forward_speed < 0.0 {
            -self.steer_angle
        } else {
            self.steer_angle
        }
    }

    fn actuate_force(&mut self, forward_speed: f32, applied_steer: f32, dt: f32) -> Actuation {
        let t = &self.tuning;
        let throttle = self.input.y;
        let forward = self.body.forward();
        let can_brake = self.crash.braking_enabled() && forward_speed > t.brake_speed_threshold;

        let (mode, longitudinal) = if self.brake_held && can_brake {
            (DriveMode::Braking, -t.brake_multiplier)
        } else if throttle.abs() < THROTTLE_DEADZONE {
            (DriveMode::Coasting, 0.0)
        } else if throttle > 0.0 {
            (DriveMode::Accelerating, t.acceleration_multiplier * throttle)
        } else if forward_speed > t.brake_speed_threshold {
            if can_brake {
                (DriveMode::Braking, -t.brake_multiplier * throttle.abs())
            } else {
                (DriveMode::Coasting, 0.0)
            }
        } else if -forward_speed < t.reverse_speed {
            (DriveMode::Reversing, -t.reverse_acceleration_multiplier * throttle.abs())
        } else {
            (DriveMode::Reversing, 0.0)
        };

        match mode {
            DriveMode::Accelerating | DriveMode::Reversing => {
                self.body.linear_damping = 0.0;
                self.body
                    .apply_force(forward * longitudinal, ForceMode::Acceleration, dt);
            }
            DriveMode::Braking => {
                self.body.linear_damping = 0.0;
                // Oppose motion, but never push the car backwards
                let speed = self.body.linear_velocity.length();
                let dv = (longitudinal.abs() * dt).min(speed);
                let against = -self.body.linear_velocity.normalize_or_zero();
                self.body
                    .apply_force(against * dv, ForceMode::VelocityChange, dt);
            }
            DriveMode::Coasting => {
                if throttle.abs() < THROTTLE_DEADZONE {
                    self.body.linear_damping = t.idle_damping;
                }
            }
        }

        let yaw = applied_steer * t.yaw_torque_factor * forward_speed;
        self.body
            .apply_torque(self.body.up() * yaw, ForceMode::VelocityChange, dt);

        let lateral = if self.steer_angle.abs() > t.drift_angle_threshold {
            let accel = applied_steer * t.drift_force_factor;
            self.body
                .apply_force(-self.body.right() * accel, ForceMode::Acceleration, dt);
            -accel
        } else {
            0.0
        };

        if self.grounded {
            self.apply_ground_friction(dt);
        }

        Actuation {
            mode,
            longitudinal,
            lateral,
            yaw,
            ..Default::default()
        }
    }

    /// Tyre contact stand-in: bleeds off spin and sideways slide on the road
    fn apply_ground_friction(&mut self, dt: f32) {
        let angular_keep = (1.0 - self.tuning.ground_angular_friction * dt).clamp(0.0, 1.0);
        self.body.angular_velocity *= angular_keep;

        let right = self.body.right();
        let slide = self.body.linear_velocity.dot(right);
        let removed = slide * (self.tuning.ground_lateral_friction * dt).clamp(0.0, 1.0);
        self.body.linear_velocity -= right * removed;
    }

    fn wheel_drive_mode(&self, throttle: f32, brake: f32, forward_speed: f32) -> DriveMode {
        if brake > 0.0 {
            DriveMode::Braking
        } else if throttle.abs() < THROTTLE_DEADZONE {
            DriveMode::Coasting
        } else if throttle > 0.0 {
            DriveMode::Accelerating
        } else if forward_speed > self.tuning.brake_speed_threshold {
            DriveMode::Braking
        } else {
            DriveMode::Reversing
        }
    }

    fn integrate(&mut self, dt: f32, ctx: &TickContext<'_>) {
        self.body.integrate(dt, ctx.gravity);
        let position = self.body.position;
        if let Some(height) = ctx.spatial.ground_height(position.x, position.z) {
            self.body.rest_on(height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Cue, CueRecorder, SilentAudio};
    use crate::consts::{GRAVITY, SIM_DT};
    use crate::sim::collision::CollisionParticipantKind;
    use crate::sim::spatial::FlatGround;
    use proptest::prelude::*;
    use rand::SeedableRng;

    struct Harness {
        ground: FlatGround,
        audio: CueRecorder,
        rng: Pcg32,
    }

    impl Harness {
        fn new(seed: u64) -> Self {
            Self {
                ground: FlatGround::new(0.0),
                audio: CueRecorder::new(),
                rng: Pcg32::seed_from_u64(seed),
            }
        }

        fn ctx(&mut self) -> TickContext<'_> {
            TickContext {
                spatial: &self.ground,
                audio: &mut self.audio,
                rng: &mut self.rng,
                gravity: GRAVITY,
            }
        }
    }

    fn moving_car(role: VehicleRole, speed: f32) -> VehicleDynamics {
        let mut car = VehicleDynamics::new(role, VehicleTuning::default());
        car.body_mut().linear_velocity = Vec3::Z * speed;
        car
    }

    fn hard_hit() -> CollisionEvent {
        CollisionEvent::new(CollisionParticipantKind::Obstacle, 20.0, Vec3::NEG_Z)
    }

    #[test]
    fn test_zero_input_only_damps() {
        let mut h = Harness::new(1);
        let mut car = moving_car(VehicleRole::Player, 10.0);
        let actuation = car.tick(SIM_DT, &mut h.ctx());

        assert_eq!(actuation.mode, DriveMode::Coasting);
        assert_eq!(actuation.longitudinal, 0.0);
        let expected = 10.0 * (1.0 - 0.5 * SIM_DT);
        assert!((car.body().forward_speed() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_full_throttle_accelerates() {
        let mut h = Harness::new(1);
        let mut car = moving_car(VehicleRole::Player, 0.0);
        car.set_input(Vec2::new(0.0, 1.0));
        let actuation = car.tick(SIM_DT, &mut h.ctx());
        assert_eq!(actuation.mode, DriveMode::Accelerating);
        assert!((car.body().forward_speed() - 3.0 * SIM_DT).abs() < 1e-5);
    }

    #[test]
    fn test_crash_zeroes_input_and_recovers() {
        let mut h = Harness::new(9);
        let mut car = moving_car(VehicleRole::Player, 20.0);
        car.set_input(Vec2::new(0.5, 1.0));

        assert!(car.on_collision(&hard_hit(), &mut h.ctx()).is_ok());
        assert!(car.is_crashed());
        assert_eq!(car.input(), Vec2::ZERO);
        assert!(!car.braking_enabled());
        assert_eq!(h.audio.plays(Cue::Crash), 1);

        // Input is locked out while crashed
        car.set_input(Vec2::new(1.0, 1.0));
        assert_eq!(car.input(), Vec2::ZERO);

        let ticks = (3.0 / SIM_DT).round() as usize;
        let mut recovered_at = None;
        for i in 0..ticks {
            if car.tick(SIM_DT, &mut h.ctx()).recovered {
                recovered_at = Some(i);
            }
        }
        assert_eq!(recovered_at, Some(ticks - 1));
        assert_eq!(car.crash_state(), CrashState::Normal);
        assert!(car.braking_enabled());
        assert_eq!(car.crash_timer(), 0.0);
        assert_eq!(car.body().linear_damping, 0.0);
        let up = car.body().up();
        assert!((up - Vec3::Y).length() < 1e-4);
    }

    #[test]
    fn test_crash_drag_while_crashed() {
        let mut h = Harness::new(2);
        let mut car = moving_car(VehicleRole::Player, 20.0);
        car.on_collision(&hard_hit(), &mut h.ctx()).unwrap();
        car.tick(SIM_DT, &mut h.ctx());
        assert_eq!(car.body().linear_damping, car.tuning().crash.drag);
    }

    #[test]
    fn test_traffic_ignores_terrain() {
        let mut h = Harness::new(3);
        let mut car = moving_car(VehicleRole::Traffic, 10.0);
        let event = CollisionEvent::new(CollisionParticipantKind::Terrain, 50.0, Vec3::Y);
        assert_eq!(
            car.on_collision(&event, &mut h.ctx()),
            Err(ImpactIgnored::FilteredPartner)
        );
        assert!(!car.is_crashed());
        assert_eq!(car.body().linear_velocity, Vec3::Z * 10.0);
        // Traffic has no audio
        assert!(h.audio.requests.is_empty());
    }

    #[test]
    fn test_reverse_capped_at_reverse_speed() {
        let mut h = Harness::new(4);
        let mut car = moving_car(VehicleRole::Player, -5.0);
        car.set_input(Vec2::new(0.0, -1.0));
        let actuation = car.tick(SIM_DT, &mut h.ctx());
        assert_eq!(actuation.mode, DriveMode::Reversing);
        assert_eq!(actuation.longitudinal, 0.0);

        let mut slow = moving_car(VehicleRole::Player, -1.0);
        slow.set_input(Vec2::new(0.0, -1.0));
        let actuation = slow.tick(SIM_DT, &mut h.ctx());
        assert_eq!(actuation.longitudinal, -2.0);
        assert_eq!(h.audio.plays(Cue::Reverse), 2);
    }

    #[test]
    fn test_negative_throttle_brakes_when_moving_forward() {
        let mut h = Harness::new(4);
        let mut car = moving_car(VehicleRole::Player, 10.0);
        car.set_input(Vec2::new(0.0, -1.0));
        let actuation = car.tick(SIM_DT, &mut h.ctx());
        assert_eq!(actuation.mode, DriveMode::Braking);
        assert!((car.body().forward_speed() - (10.0 - 15.0 * SIM_DT)).abs() < 1e-4);
    }

    #[test]
    fn test_brake_button_stops_without_reversing() {
        let mut h = Harness::new(4);
        let mut car = moving_car(VehicleRole::Player, 0.2);
        car.set_braking(true);
        car.tick(SIM_DT, &mut h.ctx());
        assert!(car.body().forward_speed().abs() < 1e-5);
    }

    #[test]
    fn test_reverse_flips_applied_steer_only() {
        let mut h = Harness::new(5);
        let mut car = moving_car(VehicleRole::Player, -2.0);
        car.set_input(Vec2::new(1.0, 0.0));
        let actuation = car.tick(SIM_DT, &mut h.ctx());

        assert!(car.wheel_angle() > 0.0);
        assert_eq!(actuation.applied_steer, -car.wheel_angle());

        let mut forward = moving_car(VehicleRole::Player, 2.0);
        forward.set_input(Vec2::new(1.0, 0.0));
        let actuation = forward.tick(SIM_DT, &mut h.ctx());
        assert_eq!(actuation.applied_steer, forward.wheel_angle());
    }

    /// Car whose wheels reach the target angle in a single tick
    fn snappy_car(speed: f32) -> VehicleDynamics {
        let tuning = VehicleTuning {
            steering_lerp_speed: 1.0 / SIM_DT,
            ..VehicleTuning::default()
        };
        let mut car = VehicleDynamics::new(VehicleRole::Player, tuning);
        car.body_mut().linear_velocity = Vec3::Z * speed;
        car
    }

    #[test]
    fn test_yaw_scales_with_applied_steer_and_speed() {
        let mut h = Harness::new(12);
        let t = VehicleTuning::default();

        // Gentle steer stays under the drift threshold
        let mut gentle = snappy_car(10.0);
        gentle.set_input(Vec2::new(0.2, 0.0));
        let actuation = gentle.tick(SIM_DT, &mut h.ctx());
        assert!(actuation.applied_steer > 0.0);
        assert!(actuation.applied_steer < t.drift_angle_threshold);
        let expected = actuation.applied_steer * t.yaw_torque_factor * 10.0;
        assert!((actuation.yaw - expected).abs() < 1e-5);
        assert_eq!(actuation.lateral, 0.0);

        // Full lock drifts
        let mut hard = snappy_car(10.0);
        hard.set_input(Vec2::new(1.0, 0.0));
        let actuation = hard.tick(SIM_DT, &mut h.ctx());
        assert!((actuation.applied_steer - 20.0).abs() < 1e-4);
        assert!((actuation.yaw - 20.0 * t.yaw_torque_factor * 10.0).abs() < 1e-4);
        let drift = -actuation.applied_steer * t.drift_force_factor;
        assert!((actuation.lateral - drift).abs() < 1e-5);
        assert!(actuation.lateral < 0.0);
    }

    #[test]
    fn test_reversing_yaw_uses_flipped_angle() {
        let mut h = Harness::new(13);
        let t = VehicleTuning::default();
        let mut car = snappy_car(-4.0);
        car.set_input(Vec2::new(1.0, 0.0));
        let actuation = car.tick(SIM_DT, &mut h.ctx());

        assert!((car.wheel_angle() - 25.0).abs() < 1e-4);
        assert_eq!(actuation.applied_steer, -car.wheel_angle());
        let expected = actuation.applied_steer * t.yaw_torque_factor * -4.0;
        assert!((actuation.yaw - expected).abs() < 1e-5);
        assert!(actuation.yaw > 0.0);
        let drift = -actuation.applied_steer * t.drift_force_factor;
        assert!((actuation.lateral - drift).abs() < 1e-5);
    }

    #[test]
    fn test_steering_authority_fades_with_speed() {
        let mut h = Harness::new(6);
        let mut slow = moving_car(VehicleRole::Player, 2.0);
        let mut fast = moving_car(VehicleRole::Player, 40.0);
        slow.set_input(Vec2::new(1.0, 0.0));
        // Throttle keeps the fast car above max steering speed
        fast.set_input(Vec2::new(1.0, 1.0));
        for _ in 0..50 {
            slow.tick(SIM_DT, &mut h.ctx());
            fast.tick(SIM_DT, &mut h.ctx());
        }
        assert!(slow.wheel_angle() > 20.0);
        assert!(fast.wheel_angle().abs() < 1e-3);
    }

    #[test]
    fn test_jump_is_edge_triggered() {
        let mut h = Harness::new(7);
        let mut car = moving_car(VehicleRole::Player, 0.0);
        car.request_jump();
        assert!(car.tick(SIM_DT, &mut h.ctx()).jumped);
        assert!(car.is_jumping());
        assert!(car.body().linear_velocity.y > 9.0);
        assert_eq!(h.audio.plays(Cue::Jump), 1);

        // No second impulse without a new request, and none mid-air
        assert!(!car.tick(SIM_DT, &mut h.ctx()).jumped);
        car.request_jump();
        assert!(!car.tick(SIM_DT, &mut h.ctx()).jumped);

        // Land again
        for _ in 0..200 {
            car.tick(SIM_DT, &mut h.ctx());
        }
        assert!(car.is_grounded());
        assert!(!car.is_jumping());
        car.request_jump();
        assert!(car.tick(SIM_DT, &mut h.ctx()).jumped);
    }

    #[test]
    fn test_wheeled_car_drives_forward() {
        let mut h = Harness::new(8);
        let mut car = VehicleDynamics::new(VehicleRole::Player, VehicleTuning::wheeled());
        car.set_input(Vec2::new(0.0, 1.0));
        let actuation = car.tick(SIM_DT, &mut h.ctx());
        // Probe runs before actuation, so the first tick already has contact
        let commands = actuation.wheels.unwrap();
        assert_eq!(commands.motor_torque[wheels::REAR_LEFT], 500.0);
        assert!(car.body().forward_speed() > 0.0);

        // Motor cuts out at the speed limit
        car.body_mut().linear_velocity = Vec3::Z * (31.0 / MS_TO_KMH);
        let actuation = car.tick(SIM_DT, &mut h.ctx());
        assert_eq!(actuation.wheels.unwrap().motor_torque[wheels::REAR_LEFT], 0.0);
    }

    #[test]
    fn test_wheeled_brake_button() {
        let mut h = Harness::new(8);
        let mut car = VehicleDynamics::new(VehicleRole::Player, VehicleTuning::wheeled());
        car.body_mut().linear_velocity = Vec3::Z * 5.0;
        car.set_braking(true);
        let actuation = car.tick(SIM_DT, &mut h.ctx());
        assert_eq!(actuation.mode, DriveMode::Braking);
        assert_eq!(actuation.wheels.unwrap().brake_torque, [1000.0; WHEEL_COUNT]);
        assert!(car.body().forward_speed() < 5.0);
    }

    #[test]
    fn test_huge_throttle_is_full_throttle() {
        let mut car = VehicleDynamics::new(VehicleRole::Player, VehicleTuning::default());
        car.set_input(Vec2::new(0.0, 1e20));
        assert!((car.input() - Vec2::new(0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_non_finite_input_treated_as_zero() {
        let mut car = VehicleDynamics::new(VehicleRole::Player, VehicleTuning::default());
        car.set_input(Vec2::new(f32::NAN, 0.5));
        assert_eq!(car.input(), Vec2::new(0.0, 0.5));
    }

    /// Run a fixed script (steer, throttle, a crash at tick 40) and return the body
    fn scripted_run(tuning: VehicleTuning, seed: u64) -> Body {
        let ground = FlatGround::new(0.0);
        let mut audio = SilentAudio;
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut car = VehicleDynamics::new(VehicleRole::Player, tuning);
        for i in 0..300 {
            let mut ctx = TickContext {
                spatial: &ground,
                audio: &mut audio,
                rng: &mut rng,
                gravity: GRAVITY,
            };
            let steer = ((i as f32) * 0.05).sin();
            car.set_input(Vec2::new(steer, if i % 90 < 60 { 1.0 } else { -0.6 }));
            if i == 40 {
                let _ = car.on_collision(&hard_hit(), &mut ctx);
            }
            car.tick(SIM_DT, &mut ctx);
        }
        car.body().clone()
    }

    #[test]
    fn test_tuning_roundtrip_reproduces_behavior() {
        let tuning = VehicleTuning::default();
        let json = serde_json::to_string(&tuning).unwrap();
        let restored: VehicleTuning = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, tuning);
        assert_eq!(scripted_run(tuning, 42), scripted_run(restored, 42));
    }

    proptest! {
        #[test]
        fn input_always_within_unit_circle(x in -50.0f32..50.0, y in -50.0f32..50.0) {
            let mut car = VehicleDynamics::new(VehicleRole::Player, VehicleTuning::default());
            car.set_input(Vec2::new(x, y));
            prop_assert!(car.input().length() <= 1.0 + 1e-5);
        }
    }
}
