//! Endless road streaming
//!
//! A fixed ring of road sections is laid out ahead of the player. Sections
//! that fall behind are handed back to the pool and a fresh one is placed a
//! full ring length further along, so the road never ends and never allocates.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::pool::{Pool, SlotId};
use crate::consts::{SECTION_LENGTH, SECTION_POOL_SIZE, SECTION_RING_SIZE};
use crate::error::{ConfigError, SimError, ensure};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    /// Pooled sections (must be at least `ring_size`)
    pub pool_size: usize,
    /// Sections active at once
    pub ring_size: usize,
    pub section_length: f32,
    pub road_x: f32,
    pub road_y: f32,
    /// Number of section prefab variants (0 = none assigned, streamer disabled)
    pub prefab_count: usize,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            pool_size: SECTION_POOL_SIZE,
            ring_size: SECTION_RING_SIZE,
            section_length: SECTION_LENGTH,
            road_x: 0.0,
            road_y: 0.0,
            prefab_count: 3,
        }
    }
}

impl StreamerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(self.ring_size > 0, "streamer.ring_size", "must be at least 1")?;
        ensure(
            self.pool_size >= self.ring_size,
            "streamer.pool_size",
            "must be at least ring_size",
        )?;
        ensure(
            self.section_length > 0.0 && self.section_length.is_finite(),
            "streamer.section_length",
            "must be positive",
        )
    }

    /// Distance covered by the whole ring
    pub fn ring_length(&self) -> f32 {
        self.section_length * self.ring_size as f32
    }
}

/// One pooled road section
#[derive(Debug, Clone, PartialEq)]
pub struct RoadSection {
    pub position: Vec3,
    /// Prefab variant, fixed when the pool is filled
    pub variant: usize,
}

#[derive(Debug, Clone)]
pub struct WorldStreamer {
    config: StreamerConfig,
    enabled: bool,
    pool: Pool<RoadSection>,
    /// Ring entries, each a slot in `pool`
    ring: Vec<SlotId>,
    /// Slots placed by the last `init`/`update`, reused between calls
    placed: Vec<SlotId>,
}

impl WorldStreamer {
    pub fn new(config: StreamerConfig) -> Self {
        let enabled = config.prefab_count > 0;
        if !enabled {
            log::error!("No road section variants configured; world streaming disabled");
        }
        let variants = config.prefab_count.max(1);
        let pool = Pool::new(config.pool_size, |id| RoadSection {
            position: Vec3::new(config.road_x, config.road_y, 0.0),
            variant: id % variants,
        });
        Self {
            ring: Vec::with_capacity(config.ring_size),
            placed: Vec::with_capacity(config.ring_size),
            config,
            enabled,
            pool,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn config(&self) -> &StreamerConfig {
        &self.config
    }

    /// Lay out the initial ring from the origin. Any previous layout is dropped.
    pub fn init(&mut self) -> Result<(), SimError> {
        self.pool.release_all();
        self.ring.clear();
        self.placed.clear();
        if !self.enabled {
            return Ok(());
        }

        for i in 0..self.config.ring_size {
            let z = i as f32 * self.config.section_length;
            let slot = match self.place(z) {
                Ok(slot) => slot,
                Err(e) => {
                    // No half-laid ring
                    self.pool.release_all();
                    self.ring.clear();
                    self.placed.clear();
                    return Err(e);
                }
            };
            self.ring.push(slot);
            self.placed.push(slot);
        }
        log::info!(
            "Road ring laid: {} sections of {}",
            self.config.ring_size,
            self.config.section_length
        );
        Ok(())
    }

    /// Recycle every section more than one section length behind `player_z`.
    /// Returns how many placements happened.
    pub fn update(&mut self, player_z: f32) -> Result<usize, SimError> {
        self.placed.clear();
        if !self.enabled {
            return Ok(0);
        }

        let length = self.config.section_length;
        let hop = self.config.ring_length();
        for i in 0..self.ring.len() {
            // A section can be several ring lengths behind after a teleport
            loop {
                let old_slot = self.ring[i];
                let old_z = self.section_z(old_slot);
                if old_z - player_z >= -length {
                    break;
                }
                // Release first so a pool exactly ring-sized can recycle
                self.pool.release(old_slot);
                let new_slot = match self.place(old_z + hop) {
                    Ok(slot) => slot,
                    Err(e) => {
                        self.pool.claim(old_slot);
                        return Err(e);
                    }
                };
                self.ring[i] = new_slot;
                self.placed.push(new_slot);
                log::trace!("Section {} -> slot {} at z={}", old_slot, new_slot, old_z + hop);
            }
        }
        Ok(self.placed.len())
    }

    fn section_z(&self, slot: SlotId) -> f32 {
        self.pool.get(slot).map_or(0.0, |s| s.position.z)
    }

    fn place(&mut self, z: f32) -> Result<SlotId, SimError> {
        let exhausted = SimError::SectionPoolExhausted {
            pool_size: self.config.pool_size,
            ring_size: self.config.ring_size,
        };
        let slot = self.pool.acquire().ok_or_else(|| exhausted.clone())?;
        let section = self.pool.get_mut(slot).ok_or(exhausted)?;
        section.position = Vec3::new(self.config.road_x, self.config.road_y, z);
        Ok(slot)
    }

    /// Sections placed by the most recent `init`/`update`
    pub fn placed(&self) -> impl Iterator<Item = &RoadSection> {
        self.placed.iter().filter_map(|slot| self.pool.get(*slot))
    }

    /// Active sections in ring order
    pub fn sections(&self) -> impl Iterator<Item = &RoadSection> {
        self.ring.iter().filter_map(|slot| self.pool.get(*slot))
    }

    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    /// Exactly `ring_size` active sections on distinct, gap-free slots
    pub fn ring_is_contiguous(&self) -> bool {
        if self.ring.len() != self.config.ring_size || self.active_count() != self.ring.len() {
            return false;
        }
        let mut zs: Vec<f32> = self.sections().map(|s| s.position.z).collect();
        zs.sort_by(f32::total_cmp);
        zs.windows(2)
            .all(|w| ((w[1] - w[0]) - self.config.section_length).abs() < 1e-3)
    }

    /// Far end of the road
    pub fn furthest_z(&self) -> Option<f32> {
        self.sections().map(|s| s.position.z).reduce(f32::max)
    }
}
