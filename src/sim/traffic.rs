//! AI traffic pool
//!
//! Traffic cars are pooled like road sections. Bookkeeping runs on the
//! periodic clock: cars outside the despawn window are parked at the rest
//! pose, and at most one car is released per cooldown. Active cars drive on
//! the physics clock with a steady cruise throttle.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::body::Pose;
use super::collision::VehicleRole;
use super::pool::{Pool, SlotId};
use super::spatial::FlatGround;
use super::vehicle::{TickContext, VehicleDynamics};
use crate::consts::{TRAFFIC_LANE_Y, TRAFFIC_POOL_SIZE};
use crate::error::{ConfigError, ensure};
use crate::tuning::VehicleTuning;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    pub pool_size: usize,
    /// Minimum seconds between two spawns
    pub spawn_cooldown: f32,
    pub spawn_distance_ahead: f32,
    pub despawn_distance_ahead: f32,
    pub despawn_distance_behind: f32,
    pub lane_x: f32,
    /// Height of the traffic lane surface
    pub lane_y: f32,
    /// Number of AI car variants (0 = none assigned, spawner disabled)
    pub prefab_count: usize,
    /// Constant throttle fed to every active AI car
    pub cruise_throttle: f32,
    /// Horizontal radius used for car-vs-car contact
    pub collision_radius: f32,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            pool_size: TRAFFIC_POOL_SIZE,
            spawn_cooldown: 2.0,
            spawn_distance_ahead: 100.0,
            despawn_distance_ahead: 200.0,
            despawn_distance_behind: 50.0,
            lane_x: 0.0,
            lane_y: TRAFFIC_LANE_Y,
            prefab_count: 3,
            cruise_throttle: 0.3,
            collision_radius: 1.0,
        }
    }
}

impl TrafficConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(self.spawn_cooldown >= 0.0, "traffic.spawn_cooldown", "must not be negative")?;
        ensure(
            self.despawn_distance_ahead >= 0.0 && self.despawn_distance_behind >= 0.0,
            "traffic.despawn_distance",
            "must not be negative",
        )?;
        ensure(
            self.spawn_distance_ahead <= self.despawn_distance_ahead
                && self.spawn_distance_ahead >= -self.despawn_distance_behind,
            "traffic.spawn_distance_ahead",
            "must lie inside the despawn window",
        )?;
        ensure(
            (-1.0..=1.0).contains(&self.cruise_throttle),
            "traffic.cruise_throttle",
            "must be within [-1, 1]",
        )?;
        ensure(self.collision_radius > 0.0, "traffic.collision_radius", "must be positive")
    }

    /// Where parked cars wait
    pub fn rest_pose(&self) -> Pose {
        Pose::at(Vec3::new(self.lane_x, self.lane_y, 0.0))
    }
}

/// One pooled AI car
#[derive(Debug, Clone)]
pub struct TrafficCar {
    pub vehicle: VehicleDynamics,
    /// Model variant, fixed when the pool is filled
    pub variant: usize,
}

#[derive(Debug, Clone)]
pub struct TrafficSpawner {
    config: TrafficConfig,
    enabled: bool,
    pool: Pool<TrafficCar>,
    /// Session time of the last spawn
    last_spawn_time: f64,
    /// Traffic drives on its own lane surface
    lane: FlatGround,
    /// Slots parked by the last `update`, reused between calls
    despawned: Vec<SlotId>,
}

impl TrafficSpawner {
    pub fn new(config: TrafficConfig, tuning: VehicleTuning) -> Self {
        let enabled = config.prefab_count > 0;
        if !enabled {
            log::error!("No AI car variants configured; traffic disabled");
        }
        let variants = config.prefab_count.max(1);
        let rest = config.rest_pose();
        let pool = Pool::new(config.pool_size, |id| {
            let mut vehicle = VehicleDynamics::new(VehicleRole::Traffic, tuning.clone());
            vehicle.reset_to(rest);
            TrafficCar {
                vehicle,
                variant: id % variants,
            }
        });
        Self {
            lane: FlatGround::new(config.lane_y),
            despawned: Vec::with_capacity(config.pool_size),
            config,
            enabled,
            pool,
            last_spawn_time: 0.0,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn config(&self) -> &TrafficConfig {
        &self.config
    }

    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn is_active(&self, slot: SlotId) -> bool {
        self.pool.is_active(slot)
    }

    pub fn last_spawn_time(&self) -> f64 {
        self.last_spawn_time
    }

    pub fn car(&self, slot: SlotId) -> Option<&TrafficCar> {
        self.pool.get(slot)
    }

    pub fn car_mut(&mut self, slot: SlotId) -> Option<&mut TrafficCar> {
        self.pool.get_mut(slot)
    }

    /// Active cars in slot order
    pub fn active(&self) -> impl Iterator<Item = (SlotId, &TrafficCar)> {
        self.pool.iter_active()
    }

    /// Slots parked by the most recent `update`
    pub fn despawned(&self) -> &[SlotId] {
        &self.despawned
    }

    /// Park every car and restart the cooldown clock
    pub fn reset(&mut self) {
        let rest = self.config.rest_pose();
        self.pool.release_all();
        for (_, car) in self.pool.iter_all_mut() {
            car.vehicle.reset_to(rest);
        }
        self.last_spawn_time = 0.0;
        self.despawned.clear();
    }

    /// Periodic bookkeeping: park out-of-range cars, then maybe spawn one.
    /// Returns the spawned slot, if any.
    pub fn update(&mut self, now: f64, player_z: f32) -> Option<SlotId> {
        self.despawned.clear();
        if !self.enabled {
            return None;
        }
        self.despawn_out_of_range(player_z);
        self.try_spawn(now, player_z)
    }

    fn despawn_out_of_range(&mut self, player_z: f32) {
        let ahead = self.config.despawn_distance_ahead;
        let behind = self.config.despawn_distance_behind;
        let rest = self.config.rest_pose();

        for (slot, car) in self.pool.iter_active_mut() {
            let offset = car.vehicle.position().z - player_z;
            if offset > ahead || offset < -behind {
                car.vehicle.reset_to(rest);
                self.despawned.push(slot);
            }
        }
        for slot in &self.despawned {
            self.pool.release(*slot);
            log::debug!("Traffic slot {} parked", slot);
        }
    }

    fn try_spawn(&mut self, now: f64, player_z: f32) -> Option<SlotId> {
        if now - self.last_spawn_time < self.config.spawn_cooldown as f64 {
            return None;
        }
        // Pool exhaustion is expected throttling
        let slot = self.pool.acquire_first()?;
        let position = Vec3::new(
            self.config.lane_x,
            self.config.lane_y,
            player_z + self.config.spawn_distance_ahead,
        );
        let car = self.pool.get_mut(slot)?;
        car.vehicle.reset_to(Pose::at(position));
        self.last_spawn_time = now;
        log::debug!("Traffic slot {} spawned at z={:.1}", slot, position.z);
        Some(slot)
    }

    /// Physics step for every active car
    pub fn tick(&mut self, dt: f32, ctx: &mut TickContext<'_>) {
        let throttle = Vec2::new(0.0, self.config.cruise_throttle);
        let lane = &self.lane;
        for (_, car) in self.pool.iter_active_mut() {
            let mut lane_ctx = TickContext {
                spatial: lane,
                audio: &mut *ctx.audio,
                rng: &mut *ctx.rng,
                gravity: ctx.gravity,
            };
            car.vehicle.set_input(throttle);
            car.vehicle.tick(dt, &mut lane_ctx);
        }
    }
}
