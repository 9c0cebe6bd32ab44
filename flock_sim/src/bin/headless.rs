use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use flock_sim::{Flock, FlockConfig, PointMass, PointMassFactory};
use glam::Vec3;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs a flock without a window: one scripted player circles the arena as a
/// repulsor and catches any agent that comes within reach.
#[derive(Parser, Debug)]
#[command(author, version, about = "Headless flock simulation")]
struct Args {
    /// JSON flock configuration; missing keys use the defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of ticks to run
    #[arg(long, default_value_t = 600)]
    ticks: u32,
    /// Fixed tick length in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,
    #[arg(long, default_value_t = 1337)]
    seed: u64,
    /// Override the number of small agents
    #[arg(long)]
    small: Option<usize>,
    /// Override the number of big agents
    #[arg(long)]
    big: Option<usize>,
    /// Radius of the scripted player's orbit around the arena centre
    #[arg(long, default_value_t = 40.0)]
    orbit: f32,
    /// Agents closer than this to the player are caught and disabled
    #[arg(long, default_value_t = 2.0)]
    catch_radius: f32,
    /// Write the final agent states here as JSON
    #[arg(long)]
    dump: Option<PathBuf>,
}

fn player_position(t: f32, orbit: f32) -> Vec3 {
    let angle = t * 0.5;
    Vec3::new(angle.cos() * orbit, 15.0, angle.sin() * orbit)
}

fn catch_near(flock: &mut Flock<PointMass>, player: Vec3, radius: f32) -> Result<usize> {
    let caught: Vec<usize> = flock
        .agents()
        .iter()
        .enumerate()
        .filter(|(_, agent)| agent.is_enabled() && agent.position().distance(player) < radius)
        .map(|(i, _)| i)
        .collect();
    for &i in &caught {
        flock.disable(i)?;
    }
    Ok(caught.len())
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let mut config = match &args.config {
        Some(path) => FlockConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => FlockConfig::default(),
    };
    if let Some(small) = args.small {
        config.population.small = small;
    }
    if let Some(big) = args.big {
        config.population.big = big;
    }

    let mut flock = Flock::initialise(config, &mut PointMassFactory, args.seed)?;

    let mut clamped = 0;
    let mut candidates = 0;
    let mut caught = 0;
    let mut time = 0.0;

    for tick in 0..args.ticks {
        let player = player_position(time, args.orbit);
        let stats = flock.tick(args.dt, &[player]);
        for body in flock.active_bodies_mut() {
            body.advance(args.dt);
        }
        caught += catch_near(&mut flock, player, args.catch_radius)?;

        clamped += stats.clamped;
        candidates += stats.neighbor_candidates;
        time += args.dt;

        if tick % 120 == 0 {
            info!(tick, active = stats.processed, caught, "progress");
        }
    }

    let active = flock.enabled_count();
    let mean_speed = if active > 0 {
        flock
            .agents()
            .iter()
            .filter(|agent| agent.is_enabled())
            .map(|agent| agent.velocity().length())
            .sum::<f32>()
            / active as f32
    } else {
        0.0
    };

    println!("ticks: {}", args.ticks);
    println!("agents: {} active / {} total", active, flock.len());
    println!("caught: {}", caught);
    println!("mean speed: {:.2}", mean_speed);
    println!(
        "neighbor candidates per tick: {:.1}",
        candidates as f32 / args.ticks.max(1) as f32
    );
    println!("speed clamps: {}", clamped);

    if let Some(path) = &args.dump {
        let json = serde_json::to_string_pretty(&flock.snapshot())?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "snapshot written");
    }

    Ok(())
}
