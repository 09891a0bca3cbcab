//! Configuration for the demos.

use std::path::PathBuf;

use anyhow::{ensure, Result};
use dist_metrics::{MetricConfig, MetricKind};
use serde::{Deserialize, Serialize};

/// Configuration for the multi-rank simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of data-parallel ranks.
    pub num_ranks: usize,
    /// Number of epochs to run.
    pub num_epochs: usize,
    /// Training mini-batches per epoch.
    pub train_batches: usize,
    /// Validation mini-batches per epoch.
    pub valid_batches: usize,
    /// Samples per rank in each mini-batch.
    pub batch_size: usize,
    /// Number of classes of the synthetic task.
    pub num_classes: usize,
    /// Standard deviation of the prediction noise.
    pub noise: f64,
    /// Directory holding the metric checkpoint.
    pub checkpoint_path: PathBuf,
    /// Metrics evaluated on every mini-batch.
    pub metrics: Vec<MetricConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_ranks: 2,
            num_epochs: 3,
            train_batches: 8,
            valid_batches: 2,
            batch_size: 16,
            num_classes: 10,
            noise: 0.4,
            checkpoint_path: PathBuf::from("checkpoints/metrics"),
            metrics: vec![
                MetricConfig::new(MetricKind::CategoricalAccuracy),
                MetricConfig::new(MetricKind::TopKCategoricalAccuracy(3)),
                MetricConfig::new(MetricKind::MeanSquaredError),
            ],
        }
    }
}

impl SimulationConfig {
    /// Validates the configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.num_ranks > 0, "Number of ranks must be greater than 0");
        ensure!(self.num_epochs > 0, "Number of epochs must be greater than 0");
        ensure!(
            self.train_batches > 0,
            "Training batches per epoch must be greater than 0"
        );
        ensure!(
            self.valid_batches > 0,
            "Validation batches per epoch must be greater than 0"
        );
        ensure!(self.batch_size > 0, "Batch size must be greater than 0");
        ensure!(self.num_classes > 0, "Number of classes must be greater than 0");
        ensure!(self.noise >= 0.0, "Noise must not be negative");
        ensure!(!self.metrics.is_empty(), "At least one metric is required");
        for metric in &self.metrics {
            metric.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_json() {
        let config = SimulationConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: SimulationConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.num_ranks, config.num_ranks);
        assert_eq!(parsed.metrics.len(), 3);
        assert_eq!(
            parsed.metrics[1].kind,
            MetricKind::TopKCategoricalAccuracy(3)
        );
        assert!(parsed.metrics.iter().all(|m| m.validate().is_ok()));
    }

    #[test]
    fn test_validate_rejects_empty_loops() {
        assert!(SimulationConfig::default().validate().is_ok());

        let config = SimulationConfig {
            num_epochs: 0,
            ..SimulationConfig::default()
        };
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("epochs"), "{message}");

        let config = SimulationConfig {
            train_batches: 0,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SimulationConfig {
            valid_batches: 0,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_checks_metric_configs() {
        let config = SimulationConfig {
            metrics: vec![MetricConfig::new(MetricKind::TopKCategoricalAccuracy(0))],
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
