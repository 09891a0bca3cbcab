//! Categorical accuracy, in percent.

use burn::tensor::{backend::Backend, ElementConversion, Tensor};

use crate::metric::MetricCompute;

/// Percentage of samples whose highest-scoring class is the labelled class.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoricalAccuracy;

impl CategoricalAccuracy {
    pub const fn new() -> Self {
        Self
    }
}

impl<B: Backend> MetricCompute<B> for CategoricalAccuracy {
    fn name(&self) -> String {
        "categorical accuracy".to_string()
    }

    fn unit(&self) -> String {
        "%".to_string()
    }

    fn evaluate_compute(
        &mut self,
        prediction: &Tensor<B, 2>,
        ground_truth: &Tensor<B, 2>,
    ) -> f64 {
        calculate_categorical_accuracy_sum(prediction.clone(), ground_truth.clone())
    }

    fn boxed_clone(&self) -> Box<dyn MetricCompute<B>> {
        Box::new(*self)
    }
}

/// 100 for every row whose prediction argmax matches the one-hot label,
/// summed over rows.
pub fn calculate_categorical_accuracy_sum<B: Backend>(
    prediction: Tensor<B, 2>,
    ground_truth: Tensor<B, 2>,
) -> f64 {
    let predicted = prediction.argmax(1);
    let expected = ground_truth.argmax(1);
    let correct = predicted
        .equal(expected)
        .int()
        .sum()
        .into_scalar()
        .elem::<f64>();
    correct * 100.0
}
