//! Mean absolute error.

use burn::tensor::{backend::Backend, ElementConversion, Tensor};

use crate::metric::MetricCompute;

/// Per-sample mean of absolute differences.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanAbsoluteError;

impl MeanAbsoluteError {
    pub const fn new() -> Self {
        Self
    }
}

impl<B: Backend> MetricCompute<B> for MeanAbsoluteError {
    fn name(&self) -> String {
        "mean absolute error".to_string()
    }

    fn evaluate_compute(
        &mut self,
        prediction: &Tensor<B, 2>,
        ground_truth: &Tensor<B, 2>,
    ) -> f64 {
        calculate_mae_sum(prediction.clone(), ground_truth.clone())
    }

    fn boxed_clone(&self) -> Box<dyn MetricCompute<B>> {
        Box::new(*self)
    }
}

/// Sum over rows of the row-wise mean absolute error.
pub fn calculate_mae_sum<B: Backend>(prediction: Tensor<B, 2>, ground_truth: Tensor<B, 2>) -> f64 {
    let [_, features] = prediction.dims();
    if features == 0 {
        return 0.0;
    }
    let abs_error = (prediction - ground_truth).abs().sum();
    abs_error.into_scalar().elem::<f64>() / features as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_mae_sum() {
        let device = Default::default();
        let prediction = Tensor::<TestBackend, 2>::from_floats([[1.0, -2.0], [0.5, 0.5]], &device);
        let ground_truth = Tensor::<TestBackend, 2>::from_floats([[0.0, 0.0], [0.0, 1.5]], &device);

        // Row means: 3/2 = 1.5 and 1.5/2 = 0.75.
        let mut metric = MeanAbsoluteError::new();
        assert_eq!(metric.evaluate_compute(&prediction, &ground_truth), 2.25);
        assert!(MetricCompute::<TestBackend>::unit(&metric).is_empty());
    }
}
