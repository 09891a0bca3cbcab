//! Concrete metric computations.
//!
//! Every computation returns the sum of per-sample values over the local
//! shard of a mini-batch; [`crate::Metric`] turns the reduced sums into means.
//! Predictions and ground truth are `[samples, features]` tensors. For the
//! categorical metrics the ground truth is one-hot.

// Module declarations
pub mod categorical_accuracy;
pub mod mae;
pub mod mse;
pub mod top_k;

pub use categorical_accuracy::*;
pub use mae::*;
pub use mse::*;
pub use top_k::*;
