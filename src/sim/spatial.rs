//! Spatial queries against the world
//!
//! The physics engine owns the real colliders; the core only asks two
//! questions of it: "what does this ray hit" and "how high is the ground here".

use glam::Vec3;

/// Collision layer bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const GROUND: LayerMask = LayerMask(1 << 0);
    pub const VEHICLES: LayerMask = LayerMask(1 << 1);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    #[inline]
    pub fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }
}

/// A raycast hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

/// Engine-provided spatial collaborator
pub trait Spatial {
    /// Cast a ray; `direction` need not be normalized
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: LayerMask)
    -> Option<RayHit>;

    /// Ground surface height below (x, z), if there is ground there
    fn ground_height(&self, x: f32, z: f32) -> Option<f32>;
}

/// Infinite horizontal road plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatGround {
    pub height: f32,
}

impl FlatGround {
    pub fn new(height: f32) -> Self {
        Self { height }
    }
}

/// Origins this far below the surface still count as touching it
const SURFACE_TOLERANCE: f32 = 1e-3;

impl Spatial for FlatGround {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit> {
        if !mask.intersects(LayerMask::GROUND) {
            return None;
        }
        let dir = direction.normalize_or_zero();
        if dir.y.abs() <= f32::EPSILON {
            return None;
        }

        let above = origin.y - self.height;
        if above.abs() <= SURFACE_TOLERANCE {
            return Some(RayHit {
                point: Vec3::new(origin.x, self.height, origin.z),
                normal: Vec3::Y,
                distance: 0.0,
            });
        }

        let t = -above / dir.y;
        if t < 0.0 || t > max_distance {
            return None;
        }
        Some(RayHit {
            point: origin + dir * t,
            normal: if above > 0.0 { Vec3::Y } else { Vec3::NEG_Y },
            distance: t,
        })
    }

    fn ground_height(&self, _x: f32, _z: f32) -> Option<f32> {
        Some(self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downward_probe_hits_within_range() {
        let ground = FlatGround::new(0.0);
        let hit = ground
            .raycast(Vec3::new(1.0, 0.3, 5.0), Vec3::NEG_Y, 0.5, LayerMask::GROUND)
            .unwrap();
        assert!((hit.distance - 0.3).abs() < 1e-6);
        assert_eq!(hit.normal, Vec3::Y);

        assert!(
            ground
                .raycast(Vec3::new(0.0, 0.8, 0.0), Vec3::NEG_Y, 0.5, LayerMask::GROUND)
                .is_none()
        );
    }

    #[test]
    fn test_probe_from_surface_hits() {
        let ground = FlatGround::new(-1.4);
        let hit = ground.raycast(Vec3::new(0.0, -1.4, 0.0), Vec3::NEG_Y, 0.5, LayerMask::GROUND);
        assert_eq!(hit.map(|h| h.distance), Some(0.0));
    }

    #[test]
    fn test_mask_and_parallel_rays_miss() {
        let ground = FlatGround::new(0.0);
        assert!(
            ground
                .raycast(Vec3::Y * 0.1, Vec3::NEG_Y, 1.0, LayerMask::VEHICLES)
                .is_none()
        );
        assert!(ground.raycast(Vec3::Y, Vec3::Z, 100.0, LayerMask::ALL).is_none());
    }
}
