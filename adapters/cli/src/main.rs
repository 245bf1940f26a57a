#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line driver that plays Slot Volley levels with a bot.

mod autoplay;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use slot_volley_core::LevelOutcome;
use slot_volley_session::{EndPolicy, LevelCatalog, Session, SessionConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use autoplay::Autoplay;

/// Command-line arguments accepted by the driver.
#[derive(Debug, Parser)]
#[command(name = "slot-volley", about = "Plays Slot Volley levels headlessly")]
struct CliArgs {
    /// Directory holding `*.toml` level files.
    #[arg(long, value_name = "DIR", default_value = "levels")]
    levels: PathBuf,
    /// Index of the first level to play.
    #[arg(long, default_value_t = 0)]
    start: usize,
    /// Number of levels to play.
    #[arg(long, default_value_t = 1)]
    count: usize,
    /// Simulated frame length in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 16, value_parser = clap::value_parser!(u64).range(1..))]
    dt_ms: u64,
    /// Simulated seconds after which a level is abandoned.
    #[arg(long, value_name = "SECS", default_value_t = 120)]
    time_limit: u64,
    /// Minimum delay between two bot placements, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 250)]
    place_interval_ms: u64,
    /// Optional TOML file overriding session timings.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// What happens after the last level.
    #[arg(long, value_enum, default_value_t = EndArg::Random)]
    on_end: EndArg,
    /// Seed for the random end-of-list policy.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EndArg {
    Random,
    Loop,
    Clamp,
}

impl From<EndArg> for EndPolicy {
    fn from(value: EndArg) -> Self {
        match value {
            EndArg::Random => EndPolicy::Random,
            EndArg::Loop => EndPolicy::Loop,
            EndArg::Clamp => EndPolicy::Clamp,
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read session config {}", path.display()))?;
    SessionConfig::from_toml(&contents)
        .with_context(|| format!("failed to parse session config {}", path.display()))
}

/// Entry point for the Slot Volley command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = CliArgs::parse();

    let config = load_config(args.config.as_ref())?;
    let mut catalog = LevelCatalog::from_dir(&args.levels, args.on_end.into(), args.seed)
        .with_context(|| format!("failed to load levels from {}", args.levels.display()))?;
    if catalog.is_empty() {
        bail!("no level files found in {}", args.levels.display());
    }
    let _ = catalog.select(args.start);

    let dt = Duration::from_millis(args.dt_ms);
    let limit = Duration::from_secs(args.time_limit);
    let mut session = Session::new(config);
    let mut wins = 0;

    for _ in 0..args.count {
        let Some(entry) = catalog.current().cloned() else {
            break;
        };
        session
            .load_level(&entry.spec)
            .with_context(|| format!("level {} is invalid", entry.name))?;

        let mut bot = Autoplay::new(Duration::from_millis(args.place_interval_ms));
        while session.outcome().is_none() && session.elapsed() < limit {
            let _ = bot.act(&mut session, dt);
            session.tick(dt);
        }

        let elapsed = session.elapsed().as_secs_f32();
        match session.outcome() {
            Some(LevelOutcome::Won) => {
                wins += 1;
                info!(level = %entry.name, elapsed, "level won");
            }
            Some(LevelOutcome::Failed) => {
                info!(
                    level = %entry.name,
                    elapsed,
                    remaining = session.remaining_targets(),
                    "level failed"
                );
            }
            None => warn!(level = %entry.name, elapsed, "time limit reached"),
        }
        println!(
            "{}: {} ({}/{} targets left, {elapsed:.2}s)",
            entry.name,
            match session.outcome() {
                Some(LevelOutcome::Won) => "won",
                Some(LevelOutcome::Failed) => "failed",
                None => "timed out",
            },
            session.remaining_targets(),
            session.total_targets(),
        );
        let _ = catalog.next();
    }

    println!("{wins}/{} levels won", args.count);
    Ok(())
}
