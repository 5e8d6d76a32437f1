//! Session state
//!
//! The session owns every simulated entity plus the collaborators they talk
//! to. It is deterministic for a given seed, settings and input sequence.

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::body::Pose;
use super::clock::Scheduler;
use super::coin::CoinField;
use super::collision::VehicleRole;
use super::pool::SlotId;
use super::score::Score;
use super::spatial::{FlatGround, Spatial};
use super::streamer::WorldStreamer;
use super::traffic::TrafficSpawner;
use super::vehicle::VehicleDynamics;
use crate::audio::{AudioSink, Mixer, SilentAudio};
use crate::error::{ConfigError, SimError};
use crate::settings::Settings;

/// Which vehicle an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VehicleId {
    Player,
    Traffic(SlotId),
}

/// Notable things that happened during a frame (for UI/effects hosts)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum GameEvent {
    Crashed { vehicle: VehicleId, impulse: f32 },
    Recovered { vehicle: VehicleId },
    Jumped,
    SectionPlaced { z: f32, variant: usize },
    TrafficSpawned { slot: SlotId, z: f32 },
    TrafficDespawned { slot: SlotId },
    CoinCollected { score: i32 },
    Restarted,
}

/// Running totals for the current run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub physics_ticks: u64,
    pub periodic_ticks: u64,
    pub crashes: u32,
    pub jumps: u32,
    pub coins: u32,
    pub sections_placed: u32,
    pub traffic_spawned: u32,
}

pub struct Session<A: AudioSink = SilentAudio> {
    pub(crate) settings: Settings,
    pub(crate) seed: u64,
    pub(crate) rng: Pcg32,
    pub(crate) scheduler: Scheduler,
    pub(crate) player: VehicleDynamics,
    pub(crate) streamer: WorldStreamer,
    pub(crate) traffic: TrafficSpawner,
    pub(crate) coins: CoinField,
    pub(crate) score: Score,
    pub(crate) spatial: Box<dyn Spatial>,
    pub(crate) audio: Mixer<A>,
    pub(crate) events: Vec<GameEvent>,
    pub(crate) stats: RunStats,
}

impl Session<SilentAudio> {
    /// Headless session on a flat road with no sound
    pub fn new(settings: Settings, seed: u64) -> Result<Self, ConfigError> {
        let ground = FlatGround::new(settings.streamer.road_y);
        Self::with_collaborators(settings, seed, Box::new(ground), SilentAudio)
    }
}

impl<A: AudioSink> Session<A> {
    pub fn with_collaborators(
        settings: Settings,
        seed: u64,
        spatial: Box<dyn Spatial>,
        audio: A,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;

        let mut mixer = Mixer::new(audio, settings.audio.master_volume);
        mixer.set_muted(settings.audio.muted);

        let coin_capacity = settings.streamer.ring_size * settings.coins.coins_per_section * 2;
        let mut session = Self {
            rng: Pcg32::seed_from_u64(seed),
            scheduler: Scheduler::new(settings.clock.clone()),
            player: VehicleDynamics::new(VehicleRole::Player, settings.player.clone()),
            streamer: WorldStreamer::new(settings.streamer.clone()),
            traffic: TrafficSpawner::new(settings.traffic.clone(), settings.traffic_vehicle.clone()),
            coins: CoinField::new(settings.coins.clone(), coin_capacity),
            score: Score::new(),
            spatial,
            audio: mixer,
            events: Vec::with_capacity(64),
            stats: RunStats::default(),
            seed,
            settings,
        };

        session
            .reset_world()
            .map_err(|e| ConfigError::invalid("streamer.pool_size", e.to_string()))?;
        log::info!(
            "Session started (seed {}, {:?} actuation)",
            seed,
            session.settings.player.actuator
        );
        Ok(session)
    }

    /// Start the run over with the same seed
    pub fn restart(&mut self) -> Result<(), SimError> {
        self.reset_world()?;
        self.events.push(GameEvent::Restarted);
        log::info!("Session restarted");
        Ok(())
    }

    fn reset_world(&mut self) -> Result<(), SimError> {
        self.rng = Pcg32::seed_from_u64(self.seed);
        self.scheduler.reset();
        self.score.reset();
        self.stats = RunStats::default();

        self.player.stop_audio(&mut self.audio);
        self.player.reset_to(self.start_pose());
        self.player.start_audio(&mut self.audio);

        self.traffic.reset();
        self.coins.clear();
        self.streamer.init()?;
        self.populate_placed_sections();
        Ok(())
    }

    /// Lay coins on freshly placed sections and log them
    pub(crate) fn populate_placed_sections(&mut self) {
        let length = self.settings.streamer.section_length;
        for section in self.streamer.placed() {
            self.coins
                .populate_section(section.position.z, length, section.position.y);
            self.events.push(GameEvent::SectionPlaced {
                z: section.position.z,
                variant: section.variant,
            });
            self.stats.sections_placed += 1;
        }
    }

    pub fn start_pose(&self) -> Pose {
        let s = &self.settings.streamer;
        Pose::at(Vec3::new(s.road_x, s.road_y, 0.0))
    }

    // === Accessors ===

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn player(&self) -> &VehicleDynamics {
        &self.player
    }

    pub fn streamer(&self) -> &WorldStreamer {
        &self.streamer
    }

    pub fn traffic(&self) -> &TrafficSpawner {
        &self.traffic
    }

    pub fn coins(&self) -> &CoinField {
        &self.coins
    }

    pub fn score(&self) -> i32 {
        self.score.value()
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Events from the most recent frame
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn audio(&self) -> &Mixer<A> {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut Mixer<A> {
        &mut self.audio
    }

    /// Distance driven along the road
    pub fn distance(&self) -> f32 {
        self.player.position().z - self.start_pose().position.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_lays_road() {
        let session = Session::new(Settings::default(), 7).unwrap();
        assert!(session.streamer().ring_is_contiguous());
        assert_eq!(session.coins().len(), 30);
        assert_eq!(session.stats().sections_placed, 10);
        assert_eq!(session.score(), 0);
        assert_eq!(session.player().position(), Vec3::ZERO);
    }

    #[test]
    fn test_invalid_settings_fail_fast() {
        let mut settings = Settings::default();
        settings.player.mass = -1.0;
        assert!(matches!(
            Session::new(settings, 1),
            Err(ConfigError::Invalid {
                field: "vehicle.mass",
                ..
            })
        ));
    }

    #[test]
    fn test_missing_variants_keep_session_running() {
        let mut settings = Settings::default();
        settings.streamer.prefab_count = 0;
        settings.traffic.prefab_count = 0;
        let session = Session::new(settings, 1).unwrap();
        assert!(!session.streamer().enabled());
        assert!(!session.traffic().enabled());
        assert!(session.coins().is_empty());
    }
}
