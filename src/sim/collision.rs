//! Collision events and vehicle-vs-vehicle contact detection
//!
//! Events arrive from the physics collaborator (or from `vehicle_contact` in
//! headless hosts) and are consumed once by the crash state machine.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Who a vehicle is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleRole {
    Player,
    Traffic,
}

/// What a vehicle collided with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionParticipantKind {
    Player,
    Traffic,
    /// Untagged scenery: road, terrain, barriers without a role
    Terrain,
    /// Tagged obstacle placed on purpose
    Obstacle,
}

impl From<VehicleRole> for CollisionParticipantKind {
    fn from(role: VehicleRole) -> Self {
        match role {
            VehicleRole::Player => CollisionParticipantKind::Player,
            VehicleRole::Traffic => CollisionParticipantKind::Traffic,
        }
    }
}

/// Impacts that never crash a vehicle, indexed `[role][partner]`.
/// Partner order: Player, Traffic, Terrain, Obstacle.
const IGNORED_IMPACTS: [[bool; 4]; 2] = [
    // Player crashes on anything hard enough
    [false, false, false, false],
    // Traffic shrugs off scenery and other traffic
    [false, true, true, false],
];

/// Whether a vehicle with `role` ignores impacts from `other`
#[inline]
pub fn ignores_impact(role: VehicleRole, other: CollisionParticipantKind) -> bool {
    let row = match role {
        VehicleRole::Player => 0,
        VehicleRole::Traffic => 1,
    };
    let col = match other {
        CollisionParticipantKind::Player => 0,
        CollisionParticipantKind::Traffic => 1,
        CollisionParticipantKind::Terrain => 2,
        CollisionParticipantKind::Obstacle => 3,
    };
    IGNORED_IMPACTS[row][col]
}

/// One collision, as reported to one of the participants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub other: CollisionParticipantKind,
    /// Impulse magnitude of the impact
    pub impulse: f32,
    /// Contact normal, pointing away from the other participant
    pub normal: Vec3,
}

impl CollisionEvent {
    pub fn new(other: CollisionParticipantKind, impulse: f32, normal: Vec3) -> Self {
        Self {
            other,
            impulse,
            normal,
        }
    }

    /// Impulse if usable (finite and non-negative)
    pub fn valid_impulse(&self) -> Option<f32> {
        (self.impulse.is_finite() && self.impulse >= 0.0).then_some(self.impulse)
    }

    /// Normalized contact normal, `None` when zero-length or non-finite
    pub fn unit_normal(&self) -> Option<Vec3> {
        if !self.normal.is_finite() || self.normal.length_squared() < 1e-8 {
            return None;
        }
        Some(self.normal.normalize())
    }
}

/// Reflect a vector off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect(v: Vec3, normal: Vec3) -> Vec3 {
    v - 2.0 * v.dot(normal) * normal
}

/// Contact between two vehicle bodies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Normal pointing from `b` to `a` (horizontal)
    pub normal: Vec3,
    /// Overlap depth along the normal
    pub penetration: f32,
    /// Impulse magnitude needed to stop the closing motion
    pub impulse: f32,
}

/// Kinematic snapshot for contact tests
#[derive(Debug, Clone, Copy)]
pub struct ContactBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub mass: f32,
}

/// Check two vehicles (horizontal circles of `radius`) for a closing contact.
///
/// Returns `None` when they don't overlap or are already separating, so each
/// impact is reported once rather than every tick they touch.
pub fn vehicle_contact(a: ContactBody, b: ContactBody, radius: f32) -> Option<Contact> {
    let delta = a.position - b.position;
    let flat = Vec3::new(delta.x, 0.0, delta.z);
    let dist = flat.length();
    let reach = radius * 2.0;
    if dist >= reach {
        return None;
    }

    // Stacked exactly on top of each other: push along the track axis
    let normal = if dist > 1e-4 { flat / dist } else { Vec3::Z };
    let closing = -(a.velocity - b.velocity).dot(normal);
    if closing <= 0.0 {
        return None;
    }

    let reduced_mass = (a.mass * b.mass) / (a.mass + b.mass);
    Some(Contact {
        normal,
        penetration: reach - dist,
        impulse: closing * reduced_mass,
    })
}
