//! Mean squared error.

use burn::tensor::{backend::Backend, ElementConversion, Tensor};

use crate::metric::MetricCompute;

/// Per-sample mean of squared differences.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanSquaredError;

impl MeanSquaredError {
    pub const fn new() -> Self {
        Self
    }
}

impl<B: Backend> MetricCompute<B> for MeanSquaredError {
    fn name(&self) -> String {
        "mean squared error".to_string()
    }

    fn evaluate_compute(
        &mut self,
        prediction: &Tensor<B, 2>,
        ground_truth: &Tensor<B, 2>,
    ) -> f64 {
        calculate_mse_sum(prediction.clone(), ground_truth.clone())
    }

    fn boxed_clone(&self) -> Box<dyn MetricCompute<B>> {
        Box::new(*self)
    }
}

/// Sum over rows of the row-wise mean squared error.
pub fn calculate_mse_sum<B: Backend>(prediction: Tensor<B, 2>, ground_truth: Tensor<B, 2>) -> f64 {
    let [_, features] = prediction.dims();
    if features == 0 {
        return 0.0;
    }
    let diff = prediction - ground_truth;
    let squared = (diff.clone() * diff).sum().into_scalar().elem::<f64>();
    squared / features as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_mse_sum() {
        let device = Default::default();
        let prediction = Tensor::<TestBackend, 2>::from_floats([[1.0, 2.0], [0.0, 0.0]], &device);
        let ground_truth = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0], [3.0, 1.0]], &device);

        // Row means: 4/2 = 2 and (9 + 1)/2 = 5.
        let mut metric = MeanSquaredError::new();
        assert_eq!(metric.evaluate_compute(&prediction, &ground_truth), 7.0);
    }
}
