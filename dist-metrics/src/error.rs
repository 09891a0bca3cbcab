use std::path::PathBuf;

use thiserror::Error;

use crate::mode::ExecutionMode;

/// The error type for `dist-metrics` operations.
///
/// Configuration errors (`MissingLayer`, `TargetLayerNotSet`,
/// `InvalidLayerPointers`) indicate a wiring mistake in the training driver
/// and are expected to abort the run. Checkpoint errors are non-fatal; the
/// caller decides whether to continue without persistence.
#[derive(Error, Debug)]
pub enum MetricError {
    /// Error for when a metric is evaluated before a target layer is bound.
    #[error("Metric '{metric}' has no target layer; call setup first")]
    TargetLayerNotSet {
        /// The name of the metric.
        metric: String,
    },

    /// Error for when the model has no layer with the requested role.
    #[error("Metric '{metric}' could not find a {role} layer in the model")]
    MissingLayer {
        /// The name of the metric.
        metric: String,
        /// The role that could not be resolved.
        role: String,
    },

    /// Error for when a list of layer handles cannot be bound to a metric.
    #[error("Invalid layer pointers: {reason}")]
    InvalidLayerPointers {
        /// Why the layer list was rejected.
        reason: String,
    },

    /// Error for when the model has no target data for an execution mode.
    #[error("Metric '{metric}' has no target data for mode {mode}")]
    ModeUnavailable {
        /// The name of the metric.
        metric: String,
        /// The requested execution mode.
        mode: ExecutionMode,
    },

    /// Error for when prediction and ground truth do not line up.
    #[error("Invalid input tensor shape: expected {expected}, got {actual}")]
    InvalidTensorShape {
        /// The expected tensor shape.
        expected: String,
        /// The actual tensor shape.
        actual: String,
    },

    /// Error for when every rank contributed an empty shard.
    #[error("Metric '{metric}' evaluated an empty mini-batch in mode {mode}")]
    EmptyMiniBatch {
        /// The name of the metric.
        metric: String,
        /// The execution mode being evaluated.
        mode: ExecutionMode,
    },

    /// Error for when another rank failed to evaluate its shard of the
    /// mini-batch.
    #[error("Metric '{metric}' failed on {failed_ranks} peer rank(s) in mode {mode}")]
    PeerEvaluationFailed {
        /// The name of the metric.
        metric: String,
        /// The execution mode being evaluated.
        mode: ExecutionMode,
        /// How many ranks reported a local failure.
        failed_ranks: u64,
    },

    /// Error for when a mean is requested with no recorded samples.
    #[error("No samples recorded{}", describe_mode(.mode))]
    EmptyStatistics {
        /// The execution mode that was queried.
        mode: Option<ExecutionMode>,
    },

    /// Error for when a collective operation cannot complete.
    #[error("Collective operation failed: {reason}")]
    Collective {
        /// A description of the failure.
        reason: String,
    },

    /// Error for when reading or writing a checkpoint record fails.
    #[error("Checkpoint I/O failed for {path}")]
    CheckpointIo {
        /// The file backing the checkpoint record.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Error for when a checkpoint record does not exist.
    #[error("Checkpoint record not found: {name}")]
    CheckpointMissing {
        /// The record key.
        name: String,
    },

    /// Error for when a checkpoint record cannot be decoded.
    #[error("Corrupt checkpoint record {name}: {reason}")]
    CheckpointCorrupt {
        /// The record key.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Error for when the root rank failed to read a shared checkpoint.
    #[error("Shared checkpoint for metric '{metric}' could not be restored on the root rank")]
    CheckpointUnavailable {
        /// The name of the metric.
        metric: String,
    },

    /// Error for when an invalid metric configuration is provided.
    #[error("Invalid metric configuration: {reason}")]
    InvalidConfiguration {
        /// The reason why the configuration is invalid.
        reason: String,
    },
}

/// A specialized `Result` type for `dist-metrics` operations.
pub type MetricResult<T> = Result<T, MetricError>;

fn describe_mode(mode: &Option<ExecutionMode>) -> String {
    mode.map(|mode| format!(" for mode {mode}")).unwrap_or_default()
}
