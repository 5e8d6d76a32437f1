//! Endless Drive headless runner
//!
//! Drives a scripted player through a session at a fixed frame rate and
//! prints a run summary. Useful for tuning and for checking determinism.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser};
use glam::Vec2;

use endless_drive::Settings;
use endless_drive::audio::LogAudio;
use endless_drive::settings::DrivePreset;
use endless_drive::sim::{FlatGround, GameEvent, Session, TickInput, VehicleId, frame};

#[derive(Parser, Debug)]
#[command(name = "endless-drive", version, about = "Run a scripted endless-drive session headless")]
struct Opts {
    /// Settings JSON (defaults are used for anything it leaves out)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated seconds to run
    #[arg(long, default_value_t = 60.0)]
    seconds: f32,

    /// RNG seed (default: from the clock)
    #[arg(long)]
    seed: Option<u64>,

    /// External frame rate fed to the scheduler
    #[arg(long, default_value_t = 60.0)]
    fps: f32,

    /// Player handling: arcade or wheeled (ignored with --config)
    #[arg(long, default_value = "arcade")]
    model: String,

    /// Print the effective settings as JSON and exit
    #[arg(long, action = ArgAction::SetTrue)]
    print_config: bool,
}

/// Scripted driver: flat out, a gentle weave, a hop every few seconds
struct Autopilot {
    elapsed: f32,
    next_jump: f32,
}

impl Autopilot {
    const JUMP_INTERVAL: f32 = 4.0;

    fn new() -> Self {
        Self {
            elapsed: 0.0,
            next_jump: Self::JUMP_INTERVAL,
        }
    }

    fn input(&mut self, dt: f32) -> TickInput {
        self.elapsed += dt;
        let jump = self.elapsed >= self.next_jump;
        if jump {
            self.next_jump += Self::JUMP_INTERVAL;
        }
        TickInput {
            axis: Vec2::new((self.elapsed * 0.7).sin() * 0.3, 1.0),
            jump,
            ..Default::default()
        }
    }
}

fn load_settings(opts: &Opts) -> Result<Settings> {
    match &opts.config {
        Some(path) => Settings::load(path).with_context(|| format!("load {}", path.display())),
        None => {
            let preset = DrivePreset::from_str(&opts.model)
                .ok_or_else(|| anyhow!("unknown --model {:?} (arcade, wheeled)", opts.model))?;
            Ok(Settings::from_preset(preset))
        }
    }
}

fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::Crashed {
            vehicle: VehicleId::Player,
            impulse,
        } => log::info!("Player crashed (impulse {:.1})", impulse),
        GameEvent::Recovered {
            vehicle: VehicleId::Player,
        } => log::info!("Player recovered"),
        GameEvent::CoinCollected { score } => log::debug!("Coin! score {}", score),
        other => log::trace!("{:?}", other),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let opts = Opts::parse();

    let settings = load_settings(&opts)?;
    if opts.print_config {
        println!("{}", settings.to_json()?);
        return Ok(());
    }
    if !(opts.fps > 0.0) || !(opts.seconds >= 0.0) {
        return Err(anyhow!("--fps must be positive and --seconds non-negative"));
    }

    let seed = opts.seed.unwrap_or_else(clock_seed);
    let ground = FlatGround::new(settings.streamer.road_y);
    let mut session = Session::with_collaborators(settings, seed, Box::new(ground), LogAudio)
        .context("start session")?;
    log::info!("Endless Drive starting (seed {})", seed);

    let dt = 1.0 / opts.fps;
    let frames = (opts.seconds * opts.fps).round() as u64;
    let mut autopilot = Autopilot::new();
    for _ in 0..frames {
        let input = autopilot.input(dt);
        frame(&mut session, &input, dt).context("simulation step")?;
        for event in session.events() {
            log_event(event);
        }
    }

    let stats = session.stats();
    println!("Seed:      {}", session.seed());
    println!("Distance:  {:.1} m", session.distance());
    println!("Score:     {}", session.score());
    println!("Crashes:   {}", stats.crashes);
    println!("Jumps:     {}", stats.jumps);
    println!("Sections:  {}", stats.sections_placed);
    println!("Traffic:   {} spawned, {} active", stats.traffic_spawned, session.traffic().active_count());
    println!("Ticks:     {} physics, {} periodic", stats.physics_ticks, stats.periodic_ticks);
    println!("Dropped:   {} steps", session.scheduler().dropped_steps());
    Ok(())
}
