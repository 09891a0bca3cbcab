//! Per-mode metric statistics for data-parallel training with Burn.
//!
//! A [`Metric`] evaluates one mini-batch at a time: the concrete
//! [`MetricCompute`] sums per-sample values over the local shard, the sum and
//! sample count are all-reduced across the [`Communicator`] group, and the
//! global values are accumulated into the [`MetricStatistics`] of the
//! current [`ExecutionMode`]. Statistics survive restarts through
//! [`Metric::save_to_checkpoint_shared`] and
//! [`Metric::load_from_checkpoint_shared`].
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dist_metrics::{ExecutionMode, MetricConfig, MetricKind, SingleProcess};
//!
//! let mut accuracy = MetricConfig::new(MetricKind::CategoricalAccuracy)
//!     .init::<B>(Arc::new(SingleProcess))?;
//! accuracy.setup(&model)?;
//! let batch_accuracy = accuracy.evaluate(&model, ExecutionMode::Training)?;
//! let epoch_accuracy = accuracy.get_mean_value(ExecutionMode::Training)?;
//! ```

mod comm;
mod config;
mod error;
mod layer;
mod metric;
pub mod metrics;
mod mode;
mod persist;
mod statistics;


pub use comm::{CollectiveGroup, Communicator, GroupMember, SingleProcess};
pub use config::{MetricConfig, MetricKind};
pub use error::{MetricError, MetricResult};
pub use layer::{LayerGraph, LayerId, LayerRole, ModelGraph, TargetBatch};
pub use metric::{default_checkpoint_prefix, Metric, MetricCompute};
pub use mode::ExecutionMode;
pub use persist::{FilePersist, MemoryPersist, Persist};
pub use statistics::{record_key, MetricStatistics, PackedStatistics};
