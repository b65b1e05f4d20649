use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tessera_core::config::AppConfig;
use tessera_core::init_logging;
use tessera_lib::model::persistence;
use tessera_lib::World;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Custom config file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Number of updates to run
    #[arg(short, long, default_value_t = 1000)]
    updates: u64,

    /// Seed override for a reproducible run
    #[arg(short, long)]
    seed: Option<u64>,

    /// Write a lattice snapshot here when the run ends (`.rkyv` for a binary
    /// archive, JSON otherwise)
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "config not found, using defaults");
        return Ok(AppConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    AppConfig::from_toml(&content)
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if args.seed.is_some() {
        config.world.seed = args.seed;
    }

    let mut world = World::new(config)?;
    world.inject_ancestor()?;

    for _ in 0..args.updates {
        world.update()?;
        if world.census().occupied == 0 {
            tracing::warn!(update = world.update_count(), "population died out");
            break;
        }
    }

    let census = world.census();
    tracing::info!(
        updates = world.update_count(),
        organisms = census.occupied,
        genotypes = world.registry.living(),
        births = world.metrics.births(),
        instructions = world.metrics.instructions(),
        "run finished"
    );

    if let Some(path) = args.snapshot {
        let snapshot = world.snapshot();
        if path.extension().is_some_and(|e| e == "rkyv") {
            persistence::save_rkyv(&snapshot, &path)
        } else {
            persistence::save_json(&snapshot, &path)
        }
        .with_context(|| format!("writing {}", path.display()))?;
        println!("Snapshot written to {}", path.display());
    }

    Ok(())
}
