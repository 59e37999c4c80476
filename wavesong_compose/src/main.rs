// wavesong CLI entry point.
//
// Composes one piece, logs its section plan, and optionally writes the full
// plan as JSON.
//
// Usage:
//   cargo run -p wavesong_compose -- [--seed N] [--config FILE] [--json FILE] [--pretty]
//
// Set RUST_LOG=debug to see per-section planning decisions.

use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};
use wavesong_compose::composer::StructureComposer;
use wavesong_compose::config::ComposerConfig;
use wavesong_compose::error::ComposeError;
use wavesong_compose::render::{JsonRenderer, write_rendered};

#[derive(Parser)]
#[command(name = "compose")]
#[command(about = "Generate a chord progression and section plan for a piece")]
struct Cli {
    /// Seed for reproducible output (defaults to the system clock)
    #[arg(long)]
    seed: Option<u64>,

    /// JSON file overriding composer ranges
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the composed piece as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let seed = match cli.seed {
        Some(s) => s,
        None => clock_seed()?,
    };
    let config = match &cli.config {
        Some(path) => ComposerConfig::load(path).map_err(ComposeError::from)?,
        None => ComposerConfig::default(),
    };

    info!("wavesong v{}, seed {seed}", env!("CARGO_PKG_VERSION"));
    let mut composer = StructureComposer::new(seed, config)?;
    let piece = composer.compose()?;
    for line in piece.summary().lines() {
        info!("{line}");
    }

    if let Some(path) = &cli.json {
        write_rendered(&JsonRenderer { pretty: cli.pretty }, &piece, path)?;
        info!("wrote {}", path.display());
    }
    Ok(())
}

fn clock_seed() -> Result<u64, ComposeError> {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH)?;
    Ok(elapsed.as_nanos() as u64)
}
