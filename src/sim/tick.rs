//! Frame and tick entry points
//!
//! `frame` is what a host calls once per rendered frame. It feeds the frame
//! delta to the scheduler and runs every due physics and periodic tick in
//! time order.

use glam::{Vec2, Vec3};

use super::clock::Tick;
use super::collision::{CollisionEvent, CollisionParticipantKind, ContactBody, vehicle_contact};
use super::state::{GameEvent, Session, VehicleId};
use super::vehicle::{TickContext, VehicleDynamics};
use crate::audio::AudioSink;
use crate::error::SimError;

/// Input commands for one frame
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Steering (x) and throttle (y), clamped to unit length by the vehicle
    pub axis: Vec2,
    /// Jump (one-shot)
    pub jump: bool,
    /// Brake button (held)
    pub brake: bool,
    /// Restart the run (one-shot)
    pub restart: bool,
}

/// Advance the session by one external frame of `frame_dt` seconds
pub fn frame<A: AudioSink>(
    session: &mut Session<A>,
    input: &TickInput,
    frame_dt: f32,
) -> Result<(), SimError> {
    session.events.clear();

    if input.restart {
        session.restart()?;
    }

    session.scheduler.begin_frame(frame_dt);
    let mut input = input.clone();
    while let Some(tick) = session.scheduler.next_tick() {
        match tick {
            Tick::Physics(dt) => {
                physics_tick(session, &input, dt);
                // Jump and restart fire once per frame
                input.jump = false;
                input.restart = false;
            }
            Tick::Periodic { now } => periodic_tick(session, now)?,
        }
    }
    Ok(())
}

/// One fixed physics step: vehicles, contacts, coins
pub fn physics_tick<A: AudioSink>(session: &mut Session<A>, input: &TickInput, dt: f32) {
    session.stats.physics_ticks += 1;

    let player = &mut session.player;
    player.set_input(input.axis);
    player.set_braking(input.brake);
    if input.jump {
        player.request_jump();
    }

    let mut ctx = TickContext {
        spatial: session.spatial.as_ref(),
        audio: &mut session.audio,
        rng: &mut session.rng,
        gravity: session.settings.gravity,
    };

    let actuation = player.tick(dt, &mut ctx);
    if actuation.jumped {
        session.events.push(GameEvent::Jumped);
        session.stats.jumps += 1;
    }
    if actuation.recovered {
        session.events.push(GameEvent::Recovered {
            vehicle: VehicleId::Player,
        });
    }

    session.traffic.tick(dt, &mut ctx);

    // Player vs traffic
    let radius = session.settings.traffic.collision_radius;
    for slot in 0..session.settings.traffic.pool_size {
        if !session.traffic.is_active(slot) {
            continue;
        }
        let Some(car) = session.traffic.car_mut(slot) else {
            continue;
        };
        let other = &mut car.vehicle;
        let Some(contact) = vehicle_contact(contact_body(player), contact_body(other), radius)
        else {
            continue;
        };

        // Stop the closing motion before either side reacts
        let push = contact.normal * contact.impulse;
        let player_mass = player.body().mass;
        let other_mass = other.body().mass;
        player.body_mut().linear_velocity += push / player_mass;
        other.body_mut().linear_velocity -= push / other_mass;

        let hit_player = CollisionEvent::new(
            CollisionParticipantKind::Traffic,
            contact.impulse,
            contact.normal,
        );
        if player.on_collision(&hit_player, &mut ctx).is_ok() {
            session.events.push(GameEvent::Crashed {
                vehicle: VehicleId::Player,
                impulse: contact.impulse,
            });
            session.stats.crashes += 1;
        }

        let hit_traffic = CollisionEvent::new(
            CollisionParticipantKind::Player,
            contact.impulse,
            -contact.normal,
        );
        if other.on_collision(&hit_traffic, &mut ctx).is_ok() {
            session.events.push(GameEvent::Crashed {
                vehicle: VehicleId::Traffic(slot),
                impulse: contact.impulse,
            });
        }
    }

    // Coins
    session.coins.update(dt);
    let collector = player.position() + Vec3::Y * session.settings.coins.hover_height;
    let collected = session.coins.collect(collector, &mut session.score);
    for _ in 0..collected {
        session.events.push(GameEvent::CoinCollected {
            score: session.score.value(),
        });
        session.stats.coins += 1;
    }
}

fn contact_body(vehicle: &VehicleDynamics) -> ContactBody {
    let body = vehicle.body();
    ContactBody {
        position: body.position,
        velocity: body.linear_velocity,
        mass: body.mass,
    }
}

/// Periodic bookkeeping: road recycling, traffic, coin culling
pub fn periodic_tick<A: AudioSink>(session: &mut Session<A>, now: f64) -> Result<(), SimError> {
    session.stats.periodic_ticks += 1;
    let player_z = session.player.position().z;

    if let Err(e) = session.streamer.update(player_z) {
        log::error!("World streaming failed: {}", e);
        return Err(e);
    }
    session.populate_placed_sections();

    if let Some(slot) = session.traffic.update(now, player_z) {
        let z = session
            .traffic
            .car(slot)
            .map_or(0.0, |car| car.vehicle.position().z);
        session.events.push(GameEvent::TrafficSpawned { slot, z });
        session.stats.traffic_spawned += 1;
    }
    for &slot in session.traffic.despawned() {
        session.events.push(GameEvent::TrafficDespawned { slot });
    }

    session.coins.cull_behind(player_z);
    Ok(())
}
