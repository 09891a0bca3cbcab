//! Data-parallel training loop with one thread per rank.
//!
//! Every rank must run the same sequence of collectives. Metric evaluation
//! and the shared restore keep the group in step when one rank fails, but
//! a rank that panics leaves its peers blocked.

use std::{sync::Arc, thread};

use anyhow::{bail, ensure, Context, Result};
use dist_metrics::{
    CollectiveGroup, Communicator, ExecutionMode, FilePersist, LayerGraph, LayerId, Metric,
    MetricResult,
};

use crate::{
    common::{build_graph, group_devices, synthetic_batch, SelectedBackend, SelectedDevice},
    config::SimulationConfig,
};

/// Final statistics of one metric as seen by one rank.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSummary {
    pub name: String,
    pub unit: String,
    pub train_mean: f64,
    pub train_samples: u64,
    pub valid_mean: f64,
}

/// Runs every rank to completion and returns the statistics they agree on.
///
/// With `resume`, the metrics are restored from `config.checkpoint_path`
/// and the first epoch keeps accumulating into the restored statistics.
pub fn run_simulation(config: &SimulationConfig, resume: bool) -> Result<Vec<MetricSummary>> {
    config.validate()?;
    std::fs::create_dir_all(&config.checkpoint_path).with_context(|| {
        format!(
            "Failed to create checkpoint directory at {}",
            config.checkpoint_path.display()
        )
    })?;

    let config = Arc::new(config.clone());
    let handles = CollectiveGroup::new(config.num_ranks)
        .into_iter()
        .zip(group_devices(config.num_ranks))
        .map(|(member, device)| {
            let config = Arc::clone(&config);
            thread::Builder::new()
                .name(format!("rank-{}", member.rank()))
                .spawn(move || run_rank(Arc::new(member), &device, &config, resume))
        })
        .collect::<std::io::Result<Vec<_>>>()
        .context("Failed to spawn rank threads")?;

    let mut summaries = Vec::with_capacity(handles.len());
    for (rank, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(summary) => summaries.push(summary.with_context(|| format!("rank {rank} failed"))?),
            Err(_) => bail!("rank {rank} panicked"),
        }
    }

    let mut summaries = summaries.into_iter();
    let root = summaries.next().context("no rank produced statistics")?;
    for (rank, summary) in summaries.enumerate() {
        ensure!(
            summary == root,
            "rank {} disagrees with rank 0: {summary:?}",
            rank + 1
        );
    }
    Ok(root)
}

fn run_rank(
    comm: Arc<dyn Communicator>,
    device: &SelectedDevice,
    config: &SimulationConfig,
    resume: bool,
) -> Result<Vec<MetricSummary>> {
    let (mut graph, target) = build_graph::<SelectedBackend>();

    let mut metrics = config
        .metrics
        .iter()
        .map(|metric| metric.init(Arc::clone(&comm)))
        .collect::<MetricResult<Vec<Metric<SelectedBackend>>>>()?;
    for metric in &mut metrics {
        metric.setup(&graph)?;
    }

    let mut persist = FilePersist::new(&config.checkpoint_path);
    if resume {
        for metric in &mut metrics {
            metric
                .load_from_checkpoint_shared(&mut persist)
                .with_context(|| format!("Failed to restore {}", metric.name()))?;
        }
    }

    for epoch in 1..=config.num_epochs {
        // A resumed run keeps accumulating into the restored epoch.
        if epoch > 1 || !resume {
            metrics.iter_mut().for_each(Metric::reset_statistics);
        }

        run_phase(
            &mut graph,
            target,
            &mut metrics,
            ExecutionMode::Training,
            config.train_batches,
            config,
            device,
        )?;
        for metric in &metrics {
            metric.save_to_checkpoint_shared(&mut persist)?;
        }
        run_phase(
            &mut graph,
            target,
            &mut metrics,
            ExecutionMode::Validation,
            config.valid_batches,
            config,
            device,
        )?;

        if comm.is_root() {
            for metric in &metrics {
                tracing::info!(
                    epoch,
                    metric = %metric.name(),
                    train = metric.get_mean_value(ExecutionMode::Training).ok(),
                    valid = metric.get_mean_value(ExecutionMode::Validation).ok(),
                    unit = %metric.get_unit(),
                    "epoch finished"
                );
            }
        }
    }

    // The last checkpoint holds exactly the final training statistics.
    for metric in &metrics {
        let mut restored = metric.copy();
        restored.reset_statistics();
        restored.load_from_checkpoint_shared(&mut persist)?;
        ensure!(
            restored.statistics(ExecutionMode::Training)
                == metric.statistics(ExecutionMode::Training),
            "restored statistics of {} differ from the live metric",
            metric.name()
        );
    }

    metrics.iter().map(summarize).collect()
}

fn run_phase(
    graph: &mut LayerGraph<SelectedBackend>,
    target: LayerId,
    metrics: &mut [Metric<SelectedBackend>],
    mode: ExecutionMode,
    num_batches: usize,
    config: &SimulationConfig,
    device: &SelectedDevice,
) -> Result<()> {
    for step in 0..num_batches {
        let batch = synthetic_batch(config.batch_size, config.num_classes, config.noise, device);
        graph.set_target_batch(target, mode, batch)?;
        for metric in metrics.iter_mut() {
            let value = metric.evaluate(&*graph, mode)?;
            tracing::debug!(%mode, step, metric = %metric.name(), value, "mini-batch evaluated");
        }
    }
    graph.clear_mode(mode);
    Ok(())
}

fn summarize(metric: &Metric<SelectedBackend>) -> Result<MetricSummary> {
    Ok(MetricSummary {
        name: metric.name(),
        unit: metric.get_unit(),
        train_mean: metric.get_mean_value(ExecutionMode::Training)?,
        train_samples: metric.get_statistics_num_samples(ExecutionMode::Training),
        valid_mean: metric.get_mean_value(ExecutionMode::Validation)?,
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use tempfile::tempdir;

    fn small_config(dir: &Path) -> SimulationConfig {
        SimulationConfig {
            num_ranks: 2,
            num_epochs: 2,
            train_batches: 3,
            valid_batches: 1,
            batch_size: 4,
            num_classes: 5,
            noise: 0.3,
            checkpoint_path: dir.join("metrics"),
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_run_checkpoints_last_training_epoch() {
        let dir = tempdir().unwrap();
        let config = small_config(dir.path());

        let summaries = run_simulation(&config, false).unwrap();

        assert_eq!(summaries.len(), config.metrics.len());
        for summary in &summaries {
            // 3 batches of 4 samples on each of 2 ranks.
            assert_eq!(summary.train_samples, 24);
        }
        let accuracy = &summaries[0];
        assert_eq!(accuracy.unit, "%");
        assert!((0.0..=100.0).contains(&accuracy.train_mean));
        assert!(config
            .checkpoint_path
            .join("categorical_accuracy.modes.bin")
            .exists());
    }

    #[test]
    fn test_resume_accumulates_into_restored_epoch() {
        let dir = tempdir().unwrap();
        let mut config = small_config(dir.path());
        run_simulation(&config, false).unwrap();

        config.num_epochs = 1;
        let summaries = run_simulation(&config, true).unwrap();

        for summary in &summaries {
            assert_eq!(summary.train_samples, 48);
        }
    }

    #[test]
    fn test_resume_without_checkpoint_fails_every_rank() {
        let dir = tempdir().unwrap();
        let config = small_config(dir.path());

        assert!(run_simulation(&config, true).is_err());
    }
}
