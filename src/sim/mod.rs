//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by pool slot)
//! - Engine services (raycasts, audio) only through the `Spatial` and `AudioSink` seams

pub mod body;
pub mod clock;
pub mod coin;
pub mod collision;
pub mod crash;
pub mod pool;
pub mod score;
pub mod spatial;
pub mod state;
pub mod streamer;
pub mod tick;
pub mod traffic;
pub mod vehicle;
pub mod wheels;

pub use body::{Body, ForceMode, Pose};
pub use clock::{ClockSettings, Scheduler, Tick};
pub use coin::{Coin, CoinConfig, CoinField, ColliderTag};
pub use collision::{CollisionEvent, CollisionParticipantKind, VehicleRole, vehicle_contact};
pub use crash::{CrashImpulse, CrashMachine, CrashState, ImpactIgnored};
pub use pool::{Pool, SlotId};
pub use score::{Score, ScoreSink};
pub use spatial::{FlatGround, LayerMask, RayHit, Spatial};
pub use state::{GameEvent, RunStats, Session, VehicleId};
pub use streamer::{RoadSection, StreamerConfig, WorldStreamer};
pub use tick::{TickInput, frame, periodic_tick, physics_tick};
pub use traffic::{TrafficCar, TrafficConfig, TrafficSpawner};
pub use vehicle::{Actuation, TickContext, VehicleDynamics};
pub use wheels::WheelCommands;
