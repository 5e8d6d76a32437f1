//! Two-rate scheduler
//!
//! One external frame clock drives two logical clocks: fixed-rate physics and
//! slower periodic bookkeeping. Tick times are derived from tick counts rather
//! than accumulated, so long sessions don't drift.

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, PERIODIC_INTERVAL, SIM_DT};
use crate::error::{ConfigError, ensure};

/// Slack when comparing tick deadlines
const DEADLINE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockSettings {
    /// Fixed physics timestep (seconds)
    pub physics_dt: f32,
    /// Streamer/spawner bookkeeping interval (seconds)
    pub periodic_interval: f32,
    /// Physics steps per frame before the backlog is dropped
    pub max_substeps: u32,
    /// Longest frame delta accepted
    pub max_frame_dt: f32,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            physics_dt: SIM_DT,
            periodic_interval: PERIODIC_INTERVAL,
            max_substeps: MAX_SUBSTEPS,
            max_frame_dt: MAX_FRAME_DT,
        }
    }
}

impl ClockSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.physics_dt > 0.0 && self.physics_dt.is_finite(),
            "clock.physics_dt",
            "must be positive",
        )?;
        ensure(
            self.periodic_interval > 0.0 && self.periodic_interval.is_finite(),
            "clock.periodic_interval",
            "must be positive",
        )?;
        ensure(self.max_substeps > 0, "clock.max_substeps", "must be at least 1")?;
        ensure(self.max_frame_dt > 0.0, "clock.max_frame_dt", "must be positive")
    }
}

/// A due tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// Fixed physics step of `dt` seconds
    Physics(f32),
    /// Bookkeeping at session time `now`
    Periodic { now: f64 },
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    settings: ClockSettings,
    /// Session time the external clock has reached
    frame_end: f64,
    physics_ticks: u64,
    periodic_ticks: u64,
    substeps: u32,
    dropped_steps: u64,
}

impl Scheduler {
    pub fn new(settings: ClockSettings) -> Self {
        Self {
            settings,
            frame_end: 0.0,
            physics_ticks: 0,
            periodic_ticks: 0,
            substeps: 0,
            dropped_steps: 0,
        }
    }

    pub fn physics_dt(&self) -> f32 {
        self.settings.physics_dt
    }

    /// Session time reached by the frame clock
    pub fn now(&self) -> f64 {
        self.frame_end
    }

    pub fn physics_ticks(&self) -> u64 {
        self.physics_ticks
    }

    pub fn periodic_ticks(&self) -> u64 {
        self.periodic_ticks
    }

    /// Physics steps skipped because a frame hit the substep cap
    pub fn dropped_steps(&self) -> u64 {
        self.dropped_steps
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.settings.clone());
    }

    fn next_physics_at(&self) -> f64 {
        (self.physics_ticks + 1) as f64 * self.settings.physics_dt as f64
    }

    fn next_periodic_at(&self) -> f64 {
        (self.periodic_ticks + 1) as f64 * self.settings.periodic_interval as f64
    }

    /// Feed one external frame. Non-finite or negative deltas count as zero.
    pub fn begin_frame(&mut self, frame_dt: f32) {
        let dt = if frame_dt.is_finite() {
            frame_dt.clamp(0.0, self.settings.max_frame_dt)
        } else {
            0.0
        };
        self.frame_end += dt as f64;
        self.substeps = 0;
    }

    /// Next due tick of the current frame in time order, physics first on ties
    pub fn next_tick(&mut self) -> Option<Tick> {
        let limit = self.frame_end + DEADLINE_EPSILON;
        let mut physics_at = self.next_physics_at();

        if physics_at <= limit && self.substeps >= self.settings.max_substeps {
            // Drop the backlog; the sim runs slow rather than spiraling
            let mut behind = 0;
            while physics_at <= limit {
                self.physics_ticks += 1;
                behind += 1;
                physics_at = self.next_physics_at();
            }
            self.dropped_steps += behind;
            log::debug!("Dropped {} physics steps", behind);
        }

        let periodic_at = self.next_periodic_at();
        let physics_due = physics_at <= limit;
        let periodic_due = periodic_at <= limit;

        if physics_due && (!periodic_due || physics_at <= periodic_at + DEADLINE_EPSILON) {
            self.physics_ticks += 1;
            self.substeps += 1;
            return Some(Tick::Physics(self.settings.physics_dt));
        }
        if periodic_due {
            self.periodic_ticks += 1;
            return Some(Tick::Periodic { now: periodic_at });
        }
        None
    }
}
