//! Session settings
//!
//! Everything tunable about a run, loaded once from JSON before the session
//! starts. Missing fields fall back to the defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::GRAVITY;
use crate::error::{ConfigError, ensure};
use crate::sim::clock::ClockSettings;
use crate::sim::coin::CoinConfig;
use crate::sim::streamer::StreamerConfig;
use crate::sim::traffic::TrafficConfig;
use crate::tuning::VehicleTuning;

/// Player car handling presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DrivePreset {
    /// Direct forces on the body
    #[default]
    Arcade,
    /// Torque through four wheels
    Wheeled,
}

impl DrivePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrivePreset::Arcade => "Arcade",
            DrivePreset::Wheeled => "Wheeled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "arcade" | "force" => Some(DrivePreset::Arcade),
            "wheeled" | "wheels" => Some(DrivePreset::Wheeled),
            _ => None,
        }
    }

    /// Player tuning for this preset
    pub fn tuning(&self) -> VehicleTuning {
        match self {
            DrivePreset::Arcade => VehicleTuning::default(),
            DrivePreset::Wheeled => VehicleTuning::wheeled(),
        }
    }
}

/// Output volume in front of the audio collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    pub muted: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            master_volume: 0.8,
            muted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub clock: ClockSettings,
    /// Gravity along world up (m/s²)
    pub gravity: f32,

    // === Vehicles ===
    pub player: VehicleTuning,
    pub traffic_vehicle: VehicleTuning,

    // === World ===
    pub streamer: StreamerConfig,
    pub traffic: TrafficConfig,
    pub coins: CoinConfig,

    pub audio: AudioSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            clock: ClockSettings::default(),
            gravity: GRAVITY,
            player: VehicleTuning::default(),
            traffic_vehicle: VehicleTuning::default(),
            streamer: StreamerConfig::default(),
            traffic: TrafficConfig::default(),
            coins: CoinConfig::default(),
            audio: AudioSettings::default(),
        }
    }
}

impl Settings {
    /// Default settings with the player tuned by `preset`
    pub fn from_preset(preset: DrivePreset) -> Self {
        Self {
            player: preset.tuning(),
            ..Self::default()
        }
    }

    /// Parse and validate
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate a settings file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation can't run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clock.validate()?;
        ensure(self.gravity.is_finite(), "gravity", "must be finite")?;
        self.player.validate()?;
        self.traffic_vehicle.validate()?;
        self.streamer.validate()?;
        self.traffic.validate()?;
        self.coins.validate()?;
        ensure(
            (0.0..=1.0).contains(&self.audio.master_volume),
            "audio.master_volume",
            "must be within [0, 1]",
        )
    }
}
