//! Multi-rank metric simulation
//!
//! Runs a data-parallel training loop on synthetic data with one thread per
//! rank. Every mini-batch is evaluated by each configured metric, the
//! per-rank sums are all-reduced, and the training statistics are
//! checkpointed after each training phase. At the end every rank restores
//! the checkpoint into fresh copies of its metrics and checks that the
//! restored statistics match.
//!
//! ## Usage
//!
//! ```bash
//! # Run with the default configuration
//! cargo run --bin simulate
//!
//! # Load a configuration file and override the number of ranks
//! cargo run --bin simulate -- --config simulation.json --num-ranks 4
//!
//! # Continue accumulating from the last checkpoint
//! cargo run --bin simulate -- --resume
//! ```
//!
//! Set `RUST_LOG=debug` to log every mini-batch evaluation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dist_metrics_demos::{common::BACKEND_NAME, run_simulation, SimulationConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override number of ranks
    #[arg(long)]
    num_ranks: Option<usize>,

    /// Override number of epochs
    #[arg(long)]
    num_epochs: Option<usize>,

    /// Override per-rank batch size
    #[arg(long)]
    batch_size: Option<usize>,

    /// Override checkpoint path
    #[arg(long)]
    checkpoint_path: Option<PathBuf>,

    /// Restore metric statistics before the first epoch
    #[arg(long)]
    resume: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
        serde_json::from_str::<SimulationConfig>(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?
    } else {
        SimulationConfig::default()
    };

    // Apply command line overrides
    if let Some(num_ranks) = args.num_ranks {
        config.num_ranks = num_ranks;
    }
    if let Some(num_epochs) = args.num_epochs {
        config.num_epochs = num_epochs;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(checkpoint_path) = args.checkpoint_path {
        config.checkpoint_path = checkpoint_path;
    }

    config.validate()?;

    tracing::info!(
        backend = BACKEND_NAME,
        ranks = config.num_ranks,
        epochs = config.num_epochs,
        resume = args.resume,
        "starting simulation"
    );

    let summaries = run_simulation(&config, args.resume)?;

    println!("Final statistics ({} ranks):", config.num_ranks);
    for summary in &summaries {
        println!(
            "  {:<28} train {:>10.4}{} ({} samples)  valid {:>10.4}{}",
            summary.name,
            summary.train_mean,
            summary.unit,
            summary.train_samples,
            summary.valid_mean,
            summary.unit
        );
    }

    Ok(())
}
