//! Top-k categorical accuracy, in percent.

use burn::{
    config::Config,
    tensor::{backend::Backend, ElementConversion, Tensor},
};

use crate::{
    error::{MetricError, MetricResult},
    metric::MetricCompute,
};

#[derive(Config, Debug)]
pub struct TopKCategoricalAccuracyConfig {
    /// Number of highest-scoring classes that may contain the label.
    #[config(default = 5)]
    pub k: usize,
}

impl TopKCategoricalAccuracyConfig {
    pub fn init(&self) -> MetricResult<TopKCategoricalAccuracy> {
        if self.k == 0 {
            return Err(MetricError::InvalidConfiguration {
                reason: "top-k accuracy requires k >= 1".to_string(),
            });
        }
        Ok(TopKCategoricalAccuracy { k: self.k })
    }
}

/// Percentage of samples whose labelled class is among the `k`
/// highest-scoring classes.
#[derive(Debug, Clone, Copy)]
pub struct TopKCategoricalAccuracy {
    k: usize,
}

impl TopKCategoricalAccuracy {
    pub const fn k(&self) -> usize {
        self.k
    }
}

impl<B: Backend> MetricCompute<B> for TopKCategoricalAccuracy {
    fn name(&self) -> String {
        format!("top-{} categorical accuracy", self.k)
    }

    fn unit(&self) -> String {
        "%".to_string()
    }

    fn evaluate_compute(
        &mut self,
        prediction: &Tensor<B, 2>,
        ground_truth: &Tensor<B, 2>,
    ) -> f64 {
        calculate_top_k_accuracy_sum(prediction.clone(), ground_truth.clone(), self.k)
    }

    fn boxed_clone(&self) -> Box<dyn MetricCompute<B>> {
        Box::new(*self)
    }
}

/// 100 for every row where fewer than `k` classes score strictly higher
/// than the labelled class, summed over rows. Ties count in the label's
/// favour.
pub fn calculate_top_k_accuracy_sum<B: Backend>(
    prediction: Tensor<B, 2>,
    ground_truth: Tensor<B, 2>,
    k: usize,
) -> f64 {
    let [_, classes] = prediction.dims();
    let labels = ground_truth.argmax(1);
    let label_scores = prediction.clone().gather(1, labels).repeat_dim(1, classes);
    let higher = prediction.greater(label_scores).int().sum_dim(1);
    let hits = higher
        .lower_elem(k as i64)
        .int()
        .sum()
        .into_scalar()
        .elem::<f64>();
    hits * 100.0
}
