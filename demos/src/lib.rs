//! dist-metrics demos
//!
//! ## Available Examples
//!
//! - `simulate`: multi-rank training loop on synthetic data that evaluates
//!   metrics every mini-batch, checkpoints them, and restores them
//!
//! ## Usage
//!
//! ```bash
//! # Run with the default configuration
//! cargo run --bin simulate
//!
//! # Four ranks, resuming from the last checkpoint
//! cargo run --bin simulate -- --num-ranks 4 --resume
//! ```

pub mod common;
pub mod config;
pub mod simulation;

pub use common::{rank_device, SelectedBackend, SelectedDevice, BACKEND_NAME};
pub use config::SimulationConfig;
pub use simulation::{run_simulation, MetricSummary};
