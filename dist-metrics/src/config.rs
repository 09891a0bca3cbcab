use std::sync::Arc;

use burn::{config::Config, tensor::backend::Backend};

use crate::{
    comm::Communicator,
    error::{MetricError, MetricResult},
    metric::{Metric, MetricCompute},
    metrics::{
        CategoricalAccuracy, MeanAbsoluteError, MeanSquaredError, TopKCategoricalAccuracyConfig,
    },
};

#[derive(Config, Debug, PartialEq)]
pub enum MetricKind {
    CategoricalAccuracy,
    TopKCategoricalAccuracy(usize),
    MeanSquaredError,
    MeanAbsoluteError,
}

impl MetricKind {
    fn build<B: Backend>(&self) -> MetricResult<Box<dyn MetricCompute<B>>> {
        let compute: Box<dyn MetricCompute<B>> = match self {
            MetricKind::CategoricalAccuracy => Box::new(CategoricalAccuracy::new()),
            MetricKind::TopKCategoricalAccuracy(k) => {
                Box::new(TopKCategoricalAccuracyConfig::new().with_k(*k).init()?)
            }
            MetricKind::MeanSquaredError => Box::new(MeanSquaredError::new()),
            MetricKind::MeanAbsoluteError => Box::new(MeanAbsoluteError::new()),
        };
        Ok(compute)
    }
}

#[derive(Config, Debug)]
pub struct MetricConfig {
    pub kind: MetricKind,
    /// Key prefix for checkpoint records; derived from the metric name when unset.
    #[config(default = "None")]
    pub checkpoint_prefix: Option<String>,
}

impl MetricConfig {
    /// Validates the configuration for logical consistency.
    pub fn validate(&self) -> MetricResult<()> {
        if let MetricKind::TopKCategoricalAccuracy(0) = self.kind {
            return Err(MetricError::InvalidConfiguration {
                reason: "top-k accuracy requires k >= 1".to_string(),
            });
        }

        if let Some(prefix) = &self.checkpoint_prefix {
            if prefix.is_empty() {
                return Err(MetricError::InvalidConfiguration {
                    reason: "checkpoint_prefix must not be empty".to_string(),
                });
            }
            if prefix.contains(['/', '\\']) {
                return Err(MetricError::InvalidConfiguration {
                    reason: format!(
                        "checkpoint_prefix '{prefix}' must not contain path separators"
                    ),
                });
            }
        }

        Ok(())
    }

    /// Builds a metric sharing `comm` with the rest of the training run.
    pub fn init<B: Backend>(&self, comm: Arc<dyn Communicator>) -> MetricResult<Metric<B>> {
        self.validate()?;
        let metric = Metric::new(comm, self.kind.build()?);
        Ok(match &self.checkpoint_prefix {
            Some(prefix) => metric.with_checkpoint_prefix(prefix.clone()),
            None => metric,
        })
    }
}
