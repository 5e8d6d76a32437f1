//! Audio collaborator interface and car audio logic
//!
//! The core never mixes sound itself. It issues fire-and-forget requests
//! (play/stop/pitch/volume on named cues) to an `AudioSink` supplied by the host.

use crate::lerp_clamped;
use crate::tuning::CarAudioTuning;

/// Named sound cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    /// Looping engine hum, pitch follows speed
    Engine,
    /// Reversing beep
    Reverse,
    /// Looping tyre skid
    Skid,
    /// Brake squeal
    Brake,
    /// Impact
    Crash,
    /// Jump whoosh
    Jump,
}

impl Cue {
    pub const COUNT: usize = 6;
    pub const ALL: [Cue; Cue::COUNT] = [
        Cue::Engine,
        Cue::Reverse,
        Cue::Skid,
        Cue::Brake,
        Cue::Crash,
        Cue::Jump,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Host-side audio collaborator
pub trait AudioSink {
    fn play(&mut self, cue: Cue);
    fn stop(&mut self, cue: Cue);
    fn set_pitch(&mut self, cue: Cue, pitch: f32);
    fn set_volume(&mut self, cue: Cue, volume: f32);
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn play(&mut self, cue: Cue) {
        (**self).play(cue);
    }

    fn stop(&mut self, cue: Cue) {
        (**self).stop(cue);
    }

    fn set_pitch(&mut self, cue: Cue, pitch: f32) {
        (**self).set_pitch(cue, pitch);
    }

    fn set_volume(&mut self, cue: Cue, volume: f32) {
        (**self).set_volume(cue, volume);
    }
}

/// Discards every request
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAudio;

impl AudioSink for SilentAudio {
    fn play(&mut self, _cue: Cue) {}
    fn stop(&mut self, _cue: Cue) {}
    fn set_pitch(&mut self, _cue: Cue, _pitch: f32) {}
    fn set_volume(&mut self, _cue: Cue, _volume: f32) {}
}

/// Logs play/stop requests at debug level (pitch and volume at trace)
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAudio;

impl AudioSink for LogAudio {
    fn play(&mut self, cue: Cue) {
        log::debug!("audio: play {:?}", cue);
    }

    fn stop(&mut self, cue: Cue) {
        log::debug!("audio: stop {:?}", cue);
    }

    fn set_pitch(&mut self, cue: Cue, pitch: f32) {
        log::trace!("audio: {:?} pitch {:.2}", cue, pitch);
    }

    fn set_volume(&mut self, cue: Cue, volume: f32) {
        log::trace!("audio: {:?} volume {:.2}", cue, volume);
    }
}

/// One request as seen by `CueRecorder`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioRequest {
    Play(Cue),
    Stop(Cue),
    Pitch(Cue, f32),
    Volume(Cue, f32),
}

/// Records every request in order
#[derive(Debug, Default, Clone)]
pub struct CueRecorder {
    pub requests: Vec<AudioRequest>,
}

impl CueRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of play requests for `cue`
    pub fn plays(&self, cue: Cue) -> usize {
        self.requests
            .iter()
            .filter(|r| matches!(r, AudioRequest::Play(c) if *c == cue))
            .count()
    }

    /// Number of stop requests for `cue`
    pub fn stops(&self, cue: Cue) -> usize {
        self.requests
            .iter()
            .filter(|r| matches!(r, AudioRequest::Stop(c) if *c == cue))
            .count()
    }

    /// Most recent volume sent for `cue`
    pub fn last_volume(&self, cue: Cue) -> Option<f32> {
        self.requests.iter().rev().find_map(|r| match r {
            AudioRequest::Volume(c, v) if *c == cue => Some(*v),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.requests.clear();
    }
}

impl AudioSink for CueRecorder {
    fn play(&mut self, cue: Cue) {
        self.requests.push(AudioRequest::Play(cue));
    }

    fn stop(&mut self, cue: Cue) {
        self.requests.push(AudioRequest::Stop(cue));
    }

    fn set_pitch(&mut self, cue: Cue, pitch: f32) {
        self.requests.push(AudioRequest::Pitch(cue, pitch));
    }

    fn set_volume(&mut self, cue: Cue, volume: f32) {
        self.requests.push(AudioRequest::Volume(cue, volume));
    }
}

/// Master volume and mute in front of another sink.
///
/// Muting only scales volume to zero; every play/stop still reaches the inner
/// sink, so loops tracked by `CarAudio` stay in step with what is playing.
#[derive(Debug, Clone)]
pub struct Mixer<S> {
    inner: S,
    master_volume: f32,
    muted: bool,
    /// Last volume requested per cue, before master scaling
    volumes: [f32; Cue::COUNT],
}

impl<S: AudioSink> Mixer<S> {
    pub fn new(inner: S, master_volume: f32) -> Self {
        Self {
            inner,
            master_volume: master_volume.clamp(0.0, 1.0),
            muted: false,
            volumes: [1.0; Cue::COUNT],
        }
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
        self.apply_volumes();
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.apply_volumes();
    }

    fn effective_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.master_volume }
    }

    fn apply_volumes(&mut self) {
        let scale = self.effective_volume();
        for cue in Cue::ALL {
            self.inner.set_volume(cue, self.volumes[cue.index()] * scale);
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: AudioSink> AudioSink for Mixer<S> {
    fn play(&mut self, cue: Cue) {
        // One-shots may never have had a volume set
        let vol = self.volumes[cue.index()] * self.effective_volume();
        self.inner.set_volume(cue, vol);
        self.inner.play(cue);
    }

    fn stop(&mut self, cue: Cue) {
        self.inner.stop(cue);
    }

    fn set_pitch(&mut self, cue: Cue, pitch: f32) {
        self.inner.set_pitch(cue, pitch);
    }

    fn set_volume(&mut self, cue: Cue, volume: f32) {
        self.volumes[cue.index()] = volume;
        let vol = volume * self.effective_volume();
        self.inner.set_volume(cue, vol);
    }
}

/// What the drivetrain did this tick, as far as sound is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveMode {
    Accelerating,
    Braking,
    Reversing,
    #[default]
    Coasting,
}

/// Snapshot handed to `CarAudio::update` once per physics tick
#[derive(Debug, Clone, Copy)]
pub struct AudioFrame {
    pub mode: DriveMode,
    pub throttle: f32,
    /// Velocity along the vehicle's forward axis
    pub forward_speed: f32,
    /// Total speed
    pub speed: f32,
    pub dt: f32,
}

/// Engine/skid/brake/reverse cue state for one vehicle.
///
/// The sink never reports back, so which loops are playing is tracked here.
#[derive(Debug, Clone)]
pub struct CarAudio {
    tuning: CarAudioTuning,
    max_forward_velocity: f32,
    engine_playing: bool,
    reverse_playing: bool,
    skid_playing: bool,
    brake_playing: bool,
    engine_volume: f32,
    skid_volume: f32,
    brake_volume: f32,
}

impl CarAudio {
    pub fn new(tuning: CarAudioTuning, max_forward_velocity: f32) -> Self {
        let engine_volume = tuning.engine_volume;
        Self {
            tuning,
            max_forward_velocity,
            engine_playing: false,
            reverse_playing: false,
            skid_playing: false,
            brake_playing: false,
            engine_volume,
            skid_volume: 0.0,
            brake_volume: 1.0,
        }
    }

    /// Start the engine loop
    pub fn start(&mut self, sink: &mut dyn AudioSink) {
        self.engine_volume = self.tuning.engine_volume;
        sink.set_volume(Cue::Engine, self.engine_volume);
        sink.play(Cue::Engine);
        self.engine_playing = true;
    }

    /// Stop every looping cue (session restart)
    pub fn stop_all(&mut self, sink: &mut dyn AudioSink) {
        for (playing, cue) in [
            (&mut self.engine_playing, Cue::Engine),
            (&mut self.reverse_playing, Cue::Reverse),
            (&mut self.skid_playing, Cue::Skid),
            (&mut self.brake_playing, Cue::Brake),
        ] {
            if *playing {
                sink.stop(cue);
                *playing = false;
            }
        }
        self.skid_volume = 0.0;
        self.brake_volume = 1.0;
    }

    pub fn is_playing(&self, cue: Cue) -> bool {
        match cue {
            Cue::Engine => self.engine_playing,
            Cue::Reverse => self.reverse_playing,
            Cue::Skid => self.skid_playing,
            Cue::Brake => self.brake_playing,
            Cue::Crash | Cue::Jump => false,
        }
    }

    /// Per-tick update while driving normally
    pub fn update(&mut self, frame: &AudioFrame, sink: &mut dyn AudioSink) {
        match frame.mode {
            DriveMode::Accelerating => self.stop_reverse(sink),
            DriveMode::Braking => {
                if frame.speed > self.tuning.brake_sound_threshold && !self.brake_playing {
                    self.brake_volume = 1.0;
                    sink.set_volume(Cue::Brake, self.brake_volume);
                    sink.play(Cue::Brake);
                    self.brake_playing = true;
                }
                self.stop_reverse(sink);
            }
            DriveMode::Reversing => {
                if !self.reverse_playing {
                    sink.play(Cue::Reverse);
                    self.reverse_playing = true;
                }
                self.stop_brake(sink);
            }
            DriveMode::Coasting => {
                self.stop_brake(sink);
                self.stop_reverse(sink);
            }
        }

        let speed_ratio = frame.forward_speed / self.max_forward_velocity;
        if self.engine_playing {
            let pitch = lerp_clamped(self.tuning.min_pitch, self.tuning.max_pitch, speed_ratio);
            sink.set_pitch(Cue::Engine, pitch);
        }

        if frame.throttle < 0.0 && speed_ratio > self.tuning.skid_speed_ratio {
            if !self.skid_playing {
                sink.play(Cue::Skid);
                self.skid_playing = true;
            }
            self.skid_volume = lerp_clamped(self.skid_volume, 1.0, frame.dt * 10.0);
            sink.set_volume(Cue::Skid, self.skid_volume);
        } else if self.skid_playing {
            self.skid_volume = lerp_clamped(self.skid_volume, 0.0, frame.dt * 30.0);
            sink.set_volume(Cue::Skid, self.skid_volume);
        }

        if frame.throttle >= 0.0 {
            self.stop_brake(sink);
        }
    }

    /// Fade loops toward silence while crashed
    pub fn fade_out(&mut self, dt: f32, sink: &mut dyn AudioSink) {
        let t = dt * 10.0;
        if self.engine_playing {
            self.engine_volume = lerp_clamped(self.engine_volume, 0.0, t);
            sink.set_volume(Cue::Engine, self.engine_volume);
        }
        if self.skid_playing {
            self.skid_volume = lerp_clamped(self.skid_volume, 0.0, t);
            sink.set_volume(Cue::Skid, self.skid_volume);
        }
        if self.brake_playing {
            self.brake_volume = lerp_clamped(self.brake_volume, 0.0, t);
            sink.set_volume(Cue::Brake, self.brake_volume);
        }
    }

    pub fn on_crash(&mut self, impulse: f32, sink: &mut dyn AudioSink) {
        if impulse > self.tuning.crash_sound_threshold {
            sink.play(Cue::Crash);
        }
    }

    /// Bring the engine back to full volume
    pub fn on_recover(&mut self, sink: &mut dyn AudioSink) {
        self.engine_volume = self.tuning.engine_volume;
        sink.set_volume(Cue::Engine, self.engine_volume);
    }

    pub fn on_jump(&mut self, sink: &mut dyn AudioSink) {
        sink.play(Cue::Jump);
    }

    fn stop_brake(&mut self, sink: &mut dyn AudioSink) {
        if self.brake_playing {
            sink.stop(Cue::Brake);
            self.brake_playing = false;
        }
    }

    fn stop_reverse(&mut self, sink: &mut dyn AudioSink) {
        if self.reverse_playing {
            sink.stop(Cue::Reverse);
            self.reverse_playing = false;
        }
    }
}
