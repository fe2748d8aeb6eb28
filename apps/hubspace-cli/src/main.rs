use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use hubspace_common::ParticipantId;
use hubspace_input::{InputLatch, MoveKey};
use hubspace_kernel::{Clock, ManualClock, Session};
use hubspace_presence::{
    JsonLinesSink, PresenceDispatcher, PresenceError, PresenceRecord, PresenceRoom, PresenceSink,
    avatar_color,
};
use hubspace_scene::SceneRegistry;
use hubspace_studio::{Transport, Trigger};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hubspace-cli", about = "CLI tool for hubspace operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and built-in scene info
    Info,
    /// Load and validate a scene file (or the built-in scenes)
    Validate {
        /// JSON or YAML scene file
        #[arg(long)]
        scenes: Option<PathBuf>,
        /// Print the validated registry as JSON
        #[arg(long)]
        print: bool,
    },
    /// Drive a headless session at a fixed timestep
    Walk {
        /// Held keys, comma separated (w, a, s, d)
        #[arg(short, long, default_value = "w")]
        keys: String,
        /// Facing, radians about +Y
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        yaw: f32,
        /// Simulated duration
        #[arg(long, default_value = "2")]
        seconds: f32,
        /// Frames per second
        #[arg(long, default_value = "60")]
        fps: u32,
        /// JSON or YAML scene file
        #[arg(long)]
        scenes: Option<PathBuf>,
    },
    /// Print a generated pattern and the triggers it plays
    Studio {
        /// RNG seed for the pattern and lead notes
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Number of sixteenth-note steps to play
        #[arg(long, default_value = "32")]
        steps: u64,
    },
}

/// Prints every record and mirrors it into a room.
struct Tee<W: std::io::Write> {
    lines: JsonLinesSink<W>,
    room: PresenceRoom,
}

impl<W: std::io::Write> PresenceSink for Tee<W> {
    fn emit(&mut self, record: &PresenceRecord) -> Result<(), PresenceError> {
        self.room.emit(record)?;
        self.lines.emit(record)
    }
}

fn load_registry(path: Option<&PathBuf>) -> anyhow::Result<SceneRegistry> {
    match path {
        Some(p) => SceneRegistry::load(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(SceneRegistry::builtin()?),
    }
}

fn parse_keys(list: &str) -> anyhow::Result<Vec<MoveKey>> {
    let mut keys = Vec::new();
    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        let key = match (chars.next(), chars.next()) {
            (Some(c), None) => MoveKey::from_letter(c),
            _ => MoveKey::from_code(part),
        };
        match key {
            Some(k) => keys.push(k),
            None => bail!("unknown key {part:?}; use w, a, s, d"),
        }
    }
    Ok(keys)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info => {
            println!("hubspace-cli v{}", env!("CARGO_PKG_VERSION"));
            let registry = SceneRegistry::builtin()?;
            let p = registry.params();
            println!(
                "params: speed={} eye_height={} trigger_radius={} broadcast_interval_ms={}",
                p.speed, p.eye_height, p.trigger_radius, p.broadcast_interval_ms
            );
            println!(
                "built-in scenes: {} (start: {} at {})",
                registry.len(),
                registry.start_scene(),
                registry.start_position()
            );
            println!("studio: {} BPM, {} steps", Transport::DEFAULT_BPM, hubspace_studio::STEPS);
        }
        Commands::Validate { scenes, print } => {
            let registry = load_registry(scenes.as_ref())?;
            if print {
                println!("{}", registry.to_json_pretty()?);
                return Ok(());
            }
            println!(
                "OK: {} scene(s), start {} at {}",
                registry.len(),
                registry.start_scene(),
                registry.start_position()
            );
            for (id, scene) in registry.scenes() {
                println!(
                    "  {id}: {} obstacle(s), {} portal(s), ground {}",
                    scene.obstacles.len(),
                    scene.portals.len(),
                    scene.ground_color
                );
                for portal in &scene.portals {
                    println!(
                        "    portal at {} -> {} at {}",
                        portal.position, portal.target_scene, portal.enter_position
                    );
                }
            }
        }
        Commands::Walk {
            keys,
            yaw,
            seconds,
            fps,
            scenes,
        } => {
            if fps == 0 {
                bail!("fps must be positive");
            }
            if !seconds.is_finite() || seconds < 0.0 {
                bail!("seconds must be a non-negative number");
            }
            let registry = Arc::new(load_registry(scenes.as_ref())?);
            let mut session = Session::new(Arc::clone(&registry))?.recording();

            let latch = InputLatch::new();
            for key in parse_keys(&keys)? {
                latch.press(key);
            }

            let me = ParticipantId::new();
            let room = PresenceRoom::new();
            let sink = Tee {
                lines: JsonLinesSink::new(std::io::stdout()),
                room: room.clone(),
            };
            let dispatcher = PresenceDispatcher::spawn(me, sink);

            let clock = ManualClock::new(0);
            let frames = (seconds * fps as f32).round() as u64;
            let dt = 1.0 / fps as f32;
            tracing::info!(%me, frames, fps, "walk started");
            let mut log = Vec::new();
            for frame in 1..=frames {
                clock.set(frame * 1000 / fps as u64);
                let outcome = session.tick(&latch.snapshot(), yaw, dt, clock.now_ms());
                dispatcher.dispatch(&outcome);
                log.extend(session.drain_events());
            }
            let stats = dispatcher.shutdown();
            tracing::info!(scene = %session.scene(), events = log.len(), "walk finished");

            let replayed = Session::replay(Arc::clone(&registry), &log)?;
            println!(
                "Final: scene={}, position={}, state={:?}, ticks={}",
                session.scene(),
                session.position(),
                session.state(),
                session.ticks()
            );
            println!(
                "Presence: sent={}, failed={}, dropped={}, color={}",
                stats.sent,
                stats.failed,
                stats.dropped,
                avatar_color(&me)
            );
            println!(
                "Room: {} participant(s) in {}",
                room.participants_in(session.scene(), None).len(),
                session.scene()
            );
            println!(
                "Replay: hash={:#x} {}",
                session.state_hash(),
                if replayed.state_hash() == session.state_hash() {
                    "OK"
                } else {
                    "MISMATCH"
                }
            );
        }
        Commands::Studio { seed, steps } => {
            let mut transport = Transport::new(seed);
            println!("Pattern: {}", transport.pattern());
            transport.start();

            let half_step = transport.step_secs() / 2.0;
            let mut played = Vec::new();
            played.extend(transport.advance(0.0));
            while (played.len() as u64) < steps {
                played.extend(transport.advance(half_step));
            }
            played.truncate(steps as usize);
            transport.stop();

            for event in played {
                let notes: Vec<String> = event
                    .triggers
                    .iter()
                    .map(|t| match t {
                        Trigger::Kick => "kick".to_string(),
                        Trigger::Lead { midi } => format!("lead:{midi}"),
                    })
                    .collect();
                println!("{:>4} {:>7.3}s {}", event.step, event.at_secs, notes.join(" "));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_accept_letters_and_codes() {
        let keys = parse_keys("w, d,ArrowLeft").unwrap();
        assert_eq!(keys, [MoveKey::Forward, MoveKey::Right, MoveKey::Left]);
        assert!(parse_keys("").unwrap().is_empty());
        assert!(parse_keys("w,q").is_err());
    }
}
