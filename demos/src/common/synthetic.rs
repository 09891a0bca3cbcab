//! Synthetic classification data standing in for a model's forward pass.

use burn::{
    prelude::*,
    tensor::{backend::Backend, Distribution},
};
use dist_metrics::{LayerGraph, LayerId, LayerRole, TargetBatch};

/// Minimal `input -> fc -> target` graph; returns the graph and its target.
pub fn build_graph<B: Backend>() -> (LayerGraph<B>, LayerId) {
    let mut graph = LayerGraph::new();
    let input = graph.add_layer("input", LayerRole::Input, &[]);
    let fc = graph.add_layer("fc", LayerRole::Prediction, &[input]);
    let target = graph.add_layer("target", LayerRole::Target, &[fc]);
    (graph, target)
}

/// One-hot labels with predictions equal to the labels plus Gaussian noise.
///
/// Larger `noise` lowers accuracy and raises the error metrics.
pub fn synthetic_batch<B: Backend>(
    batch_size: usize,
    num_classes: usize,
    noise: f64,
    device: &B::Device,
) -> TargetBatch<B> {
    let logits = Tensor::<B, 2>::random(
        [batch_size, num_classes],
        Distribution::Uniform(0.0, 1.0),
        device,
    );
    let row_max = logits.clone().max_dim(1).repeat_dim(1, num_classes);
    let ground_truth = logits.equal(row_max).float();
    let prediction = ground_truth.clone()
        + Tensor::random(
            [batch_size, num_classes],
            Distribution::Normal(0.0, noise),
            device,
        );
    TargetBatch::new(prediction, ground_truth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{rank_device, SelectedBackend};
    use burn::tensor::ElementConversion;

    #[test]
    fn test_ground_truth_is_one_hot() {
        let device = rank_device(0);
        let batch = synthetic_batch::<SelectedBackend>(8, 4, 0.1, &device);

        assert_eq!(batch.prediction.dims(), [8, 4]);
        assert_eq!(batch.num_samples(), 8);
        let ones = batch.ground_truth.sum().into_scalar().elem::<f32>();
        assert_eq!(ones, 8.0);
    }
}
