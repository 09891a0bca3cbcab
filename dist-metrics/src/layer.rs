//! Model layer graph as seen by metrics.
//!
//! Metrics never own layers. They hold [`LayerId`] handles into the model's
//! layer registry and look the layers up again through [`ModelGraph`] on
//! every evaluation, so the model must outlive every metric bound to it.

use std::{collections::HashMap, fmt};

use burn::tensor::{backend::Backend, Tensor};

use crate::{
    error::{MetricError, MetricResult},
    mode::ExecutionMode,
};

/// Handle to a layer in a model's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(usize);

impl LayerId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Role a layer plays in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerRole {
    Input,
    Hidden,
    Prediction,
    /// Supplies ground truth and receives the predictions to score.
    Target,
}

impl fmt::Display for LayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LayerRole::Input => "input",
            LayerRole::Hidden => "hidden",
            LayerRole::Prediction => "prediction",
            LayerRole::Target => "target",
        };
        f.write_str(name)
    }
}

/// The rank-local shard of the current mini-batch at a target layer.
///
/// Both tensors are `[samples, features]`.
#[derive(Debug, Clone)]
pub struct TargetBatch<B: Backend> {
    pub prediction: Tensor<B, 2>,
    pub ground_truth: Tensor<B, 2>,
}

impl<B: Backend> TargetBatch<B> {
    pub const fn new(prediction: Tensor<B, 2>, ground_truth: Tensor<B, 2>) -> Self {
        Self {
            prediction,
            ground_truth,
        }
    }

    /// Number of samples in the local shard.
    pub fn num_samples(&self) -> usize {
        self.prediction.dims()[0]
    }
}

/// Read-only view of a model's layer graph.
pub trait ModelGraph<B: Backend> {
    /// Every layer, in registration order.
    fn layer_ids(&self) -> Vec<LayerId>;

    fn layer_name(&self, id: LayerId) -> Option<&str>;

    fn layer_role(&self, id: LayerId) -> Option<LayerRole>;

    /// Layers feeding into `id`.
    fn layer_parents(&self, id: LayerId) -> Vec<LayerId>;

    /// Current mini-batch at target layer `id` for `mode`, if the model is
    /// running that mode.
    fn target_batch(&self, id: LayerId, mode: ExecutionMode) -> Option<TargetBatch<B>>;

    /// First layer with the given role.
    fn find_layer(&self, role: LayerRole) -> Option<LayerId> {
        self.layer_ids()
            .into_iter()
            .find(|id| self.layer_role(*id) == Some(role))
    }
}

#[derive(Debug)]
struct LayerNode<B: Backend> {
    name: String,
    role: LayerRole,
    parents: Vec<LayerId>,
    batches: HashMap<ExecutionMode, TargetBatch<B>>,
}

/// Registry of layers with the mini-batch currently held by each target.
#[derive(Debug)]
pub struct LayerGraph<B: Backend> {
    layers: Vec<LayerNode<B>>,
}

impl<B: Backend> Default for LayerGraph<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> LayerGraph<B> {
    pub const fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Register a layer and return its handle.
    pub fn add_layer(
        &mut self,
        name: impl Into<String>,
        role: LayerRole,
        parents: &[LayerId],
    ) -> LayerId {
        let id = LayerId::new(self.layers.len());
        self.layers.push(LayerNode {
            name: name.into(),
            role,
            parents: parents.to_vec(),
            batches: HashMap::new(),
        });
        id
    }

    /// Store the mini-batch a target layer holds for `mode`.
    pub fn set_target_batch(
        &mut self,
        id: LayerId,
        mode: ExecutionMode,
        batch: TargetBatch<B>,
    ) -> MetricResult<()> {
        let node = self
            .layers
            .get_mut(id.index())
            .ok_or_else(|| MetricError::InvalidLayerPointers {
                reason: format!("{id} is not registered"),
            })?;
        if node.role != LayerRole::Target {
            return Err(MetricError::InvalidLayerPointers {
                reason: format!("{id} ('{}') is a {} layer, not a target", node.name, node.role),
            });
        }
        node.batches.insert(mode, batch);
        Ok(())
    }

    /// Drop every batch held for `mode`.
    pub fn clear_mode(&mut self, mode: ExecutionMode) {
        for node in &mut self.layers {
            node.batches.remove(&mode);
        }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl<B: Backend> ModelGraph<B> for LayerGraph<B> {
    fn layer_ids(&self) -> Vec<LayerId> {
        (0..self.layers.len()).map(LayerId::new).collect()
    }

    fn layer_name(&self, id: LayerId) -> Option<&str> {
        self.layers.get(id.index()).map(|node| node.name.as_str())
    }

    fn layer_role(&self, id: LayerId) -> Option<LayerRole> {
        self.layers.get(id.index()).map(|node| node.role)
    }

    fn layer_parents(&self, id: LayerId) -> Vec<LayerId> {
        self.layers
            .get(id.index())
            .map(|node| node.parents.clone())
            .unwrap_or_default()
    }

    fn target_batch(&self, id: LayerId, mode: ExecutionMode) -> Option<TargetBatch<B>> {
        self.layers
            .get(id.index())
            .and_then(|node| node.batches.get(&mode))
            .cloned()
    }
}
