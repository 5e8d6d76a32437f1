//! Collectible coins
//!
//! Coins spin in place and award one point when the player's collector
//! trigger touches them. Collection is one-shot; the field drops collected
//! coins and any the player has left behind.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::score::ScoreSink;
use crate::error::{ConfigError, ensure};

/// Tag of a trigger volume overlapping a coin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColliderTag {
    /// The dedicated pickup volume in front of the player car
    CoinCollector,
    /// The player car's body collider
    PlayerBody,
    Traffic,
    Untagged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinConfig {
    /// Spin rate (degrees per second)
    pub rotate_speed: f32,
    /// Coins laid along each newly placed road section (0 disables coins)
    pub coins_per_section: usize,
    /// Height of a coin above the road surface
    pub hover_height: f32,
    /// Lateral position of the coin line
    pub lane_x: f32,
    /// Collector trigger radius around the player
    pub collect_radius: f32,
    /// Uncollected coins this far behind the player are removed
    pub cull_distance_behind: f32,
}

impl Default for CoinConfig {
    fn default() -> Self {
        Self {
            rotate_speed: 100.0,
            coins_per_section: 3,
            hover_height: 1.0,
            lane_x: 0.0,
            collect_radius: 1.5,
            cull_distance_behind: 30.0,
        }
    }
}

impl CoinConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(self.collect_radius > 0.0, "coins.collect_radius", "must be positive")?;
        ensure(
            self.cull_distance_behind >= 0.0,
            "coins.cull_distance_behind",
            "must not be negative",
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coin {
    pub position: Vec3,
    /// Current spin around world up (degrees, wrapped to [0, 360))
    pub spin: f32,
    rotate_speed: f32,
    collected: bool,
}

impl Coin {
    pub fn new(position: Vec3, rotate_speed: f32) -> Self {
        Self {
            position,
            spin: 0.0,
            rotate_speed,
            collected: false,
        }
    }

    pub fn is_collected(&self) -> bool {
        self.collected
    }

    /// Cosmetic spin
    pub fn update(&mut self, dt: f32) {
        self.spin = (self.spin + self.rotate_speed * dt).rem_euclid(360.0);
    }

    /// Returns true if this contact collected the coin
    pub fn on_trigger_enter(&mut self, tag: ColliderTag, sink: &mut dyn ScoreSink) -> bool {
        if self.collected || tag != ColliderTag::CoinCollector {
            return false;
        }
        self.collected = true;
        sink.add_score(1);
        true
    }
}

/// Live coins in the world
#[derive(Debug, Clone)]
pub struct CoinField {
    config: CoinConfig,
    coins: Vec<Coin>,
}

impl CoinField {
    pub fn new(config: CoinConfig, capacity: usize) -> Self {
        Self {
            coins: Vec::with_capacity(capacity),
            config,
        }
    }

    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    pub fn clear(&mut self) {
        self.coins.clear();
    }

    /// Lay evenly spaced coins along a section starting at `section_z`
    pub fn populate_section(&mut self, section_z: f32, section_length: f32, road_y: f32) {
        let count = self.config.coins_per_section;
        if count == 0 {
            return;
        }
        let spacing = section_length / count as f32;
        for i in 0..count {
            let z = section_z + spacing * (i as f32 + 0.5);
            let position = Vec3::new(self.config.lane_x, road_y + self.config.hover_height, z);
            self.coins.push(Coin::new(position, self.config.rotate_speed));
        }
    }

    pub fn update(&mut self, dt: f32) {
        for coin in &mut self.coins {
            coin.update(dt);
        }
    }

    /// Fire the collector trigger against every overlapping coin, then drop
    /// the collected ones. Returns how many were collected.
    pub fn collect(&mut self, collector: Vec3, sink: &mut dyn ScoreSink) -> usize {
        let radius_sq = self.config.collect_radius * self.config.collect_radius;
        let mut collected = 0;
        for coin in &mut self.coins {
            if coin.position.distance_squared(collector) <= radius_sq
                && coin.on_trigger_enter(ColliderTag::CoinCollector, sink)
            {
                collected += 1;
            }
        }
        self.coins.retain(|c| !c.is_collected());
        collected
    }

    /// Remove coins the player has passed. Returns how many were removed.
    pub fn cull_behind(&mut self, player_z: f32) -> usize {
        let before = self.coins.len();
        let limit = player_z - self.config.cull_distance_behind;
        self.coins.retain(|c| c.position.z >= limit);
        before - self.coins.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::score::Score;

    #[test]
    fn test_only_collector_tag_collects() {
        let mut score = Score::new();
        let mut coin = Coin::new(Vec3::ZERO, 100.0);
        for tag in [ColliderTag::PlayerBody, ColliderTag::Traffic, ColliderTag::Untagged] {
            assert!(!coin.on_trigger_enter(tag, &mut score));
        }
        assert_eq!(score.value(), 0);
        assert!(!coin.is_collected());

        assert!(coin.on_trigger_enter(ColliderTag::CoinCollector, &mut score));
        assert_eq!(score.value(), 1);
    }

    #[test]
    fn test_double_trigger_counts_once() {
        let mut score = Score::new();
        let mut coin = Coin::new(Vec3::ZERO, 100.0);
        coin.on_trigger_enter(ColliderTag::CoinCollector, &mut score);
        assert!(!coin.on_trigger_enter(ColliderTag::CoinCollector, &mut score));
        assert_eq!(score.value(), 1);
    }

    #[test]
    fn test_spin_wraps() {
        let mut coin = Coin::new(Vec3::ZERO, 100.0);
        for _ in 0..200 {
            coin.update(0.02);
        }
        // 4 seconds at 100°/s = 400° -> 40°
        assert!((coin.spin - 40.0).abs() < 0.01);
    }

    #[test]
    fn test_field_collects_and_culls() {
        let mut field = CoinField::new(CoinConfig::default(), 8);
        field.populate_section(0.0, 26.0, 0.0);
        assert_eq!(field.len(), 3);

        let mut score = Score::new();
        let first = field.coins()[0].position;
        assert_eq!(field.collect(first, &mut score), 1);
        assert_eq!(score.value(), 1);
        assert_eq!(field.len(), 2);

        // Passed everything without picking it up
        assert_eq!(field.cull_behind(100.0), 2);
        assert!(field.is_empty());
        assert_eq!(score.value(), 1);
    }
}
