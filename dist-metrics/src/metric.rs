//! Mode-keyed metric evaluation with cross-rank reduction.
//!
//! A [`Metric`] owns one [`MetricStatistics`] per execution mode that has
//! been evaluated. Concrete metrics only supply a [`MetricCompute`]; the
//! engine takes care of reducing per-batch sums across the data-parallel
//! group, accumulating them, and checkpointing the result.
//!
//! `evaluate` and `load_from_checkpoint_shared` are collective calls: every
//! rank of the group must make them the same number of times, in the same
//! order. Checkpointing must not overlap with evaluation on the same metric.

use std::{collections::BTreeMap, fmt, sync::Arc};

use burn::tensor::{backend::Backend, Tensor};

use crate::{
    comm::Communicator,
    error::{MetricError, MetricResult},
    layer::{LayerId, LayerRole, ModelGraph},
    mode::ExecutionMode,
    persist::Persist,
    statistics::{MetricStatistics, PackedStatistics},
};

/// The computation that distinguishes one metric from another.
pub trait MetricCompute<B: Backend>: Send + fmt::Debug {
    /// Display name of the metric.
    fn name(&self) -> String;

    /// Display unit, e.g. `"%"`. Empty by default.
    fn unit(&self) -> String {
        String::new()
    }

    /// Sum of per-sample metric values over the local shard.
    ///
    /// This must be a sum, not a mean: averaging happens after the
    /// cross-rank reduction.
    fn evaluate_compute(
        &mut self,
        prediction: &Tensor<B, 2>,
        ground_truth: &Tensor<B, 2>,
    ) -> f64;

    /// Clone into a new boxed computation.
    fn boxed_clone(&self) -> Box<dyn MetricCompute<B>>;
}

/// A metric with per-mode running statistics.
#[derive(Debug)]
pub struct Metric<B: Backend> {
    comm: Arc<dyn Communicator>,
    compute: Box<dyn MetricCompute<B>>,
    target_layer: Option<LayerId>,
    layers: Vec<LayerId>,
    checkpoint_prefix: String,
    statistics: BTreeMap<ExecutionMode, MetricStatistics>,
}

impl<B: Backend> Metric<B> {
    pub fn new(comm: Arc<dyn Communicator>, compute: Box<dyn MetricCompute<B>>) -> Self {
        let checkpoint_prefix = default_checkpoint_prefix(&compute.name());
        Self {
            comm,
            compute,
            target_layer: None,
            layers: Vec::new(),
            checkpoint_prefix,
            statistics: BTreeMap::new(),
        }
    }

    /// Override the key prefix used for checkpoint records.
    pub fn with_checkpoint_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.checkpoint_prefix = prefix.into();
        self
    }

    /// Independent copy sharing the communicator and layer handles.
    pub fn copy(&self) -> Self {
        Self {
            comm: Arc::clone(&self.comm),
            compute: self.compute.boxed_clone(),
            target_layer: self.target_layer,
            layers: self.layers.clone(),
            checkpoint_prefix: self.checkpoint_prefix.clone(),
            statistics: self.statistics.clone(),
        }
    }

    pub fn name(&self) -> String {
        self.compute.name()
    }

    pub fn get_unit(&self) -> String {
        self.compute.unit()
    }

    pub fn checkpoint_prefix(&self) -> &str {
        &self.checkpoint_prefix
    }

    pub fn comm(&self) -> &dyn Communicator {
        self.comm.as_ref()
    }

    /// Bind the target layer and the layers feeding it.
    ///
    /// A model without a target layer is a configuration error.
    pub fn setup<M: ModelGraph<B>>(&mut self, model: &M) -> MetricResult<()> {
        let target = model
            .find_layer(LayerRole::Target)
            .ok_or_else(|| MetricError::MissingLayer {
                metric: self.name(),
                role: LayerRole::Target.to_string(),
            })?;
        let mut layers = vec![target];
        layers.extend(model.layer_parents(target));
        self.set_layer_pointers(model, layers)
    }

    pub fn set_target_layer(&mut self, target: LayerId) {
        self.target_layer = Some(target);
    }

    pub fn get_target_layer(&self) -> MetricResult<LayerId> {
        self.target_layer
            .ok_or_else(|| MetricError::TargetLayerNotSet { metric: self.name() })
    }

    /// Layers this metric reads from; the target layer comes first.
    pub fn get_layer_pointers(&self) -> Vec<LayerId> {
        self.layers.clone()
    }

    /// Rebind layer handles, e.g. after the model graph was copied.
    ///
    /// The first handle must name a target layer of `model`.
    pub fn set_layer_pointers<M: ModelGraph<B>>(
        &mut self,
        model: &M,
        layers: Vec<LayerId>,
    ) -> MetricResult<()> {
        let Some(&target) = layers.first() else {
            return Err(MetricError::InvalidLayerPointers {
                reason: format!("metric '{}' expects at least one layer", self.name()),
            });
        };
        match model.layer_role(target) {
            Some(LayerRole::Target) => {}
            Some(role) => {
                return Err(MetricError::InvalidLayerPointers {
                    reason: format!("{target} is a {role} layer, not a target"),
                })
            }
            None => {
                return Err(MetricError::InvalidLayerPointers {
                    reason: format!("{target} is not part of the model"),
                })
            }
        }
        if let Some(unknown) = layers.iter().find(|id| model.layer_role(**id).is_none()) {
            return Err(MetricError::InvalidLayerPointers {
                reason: format!("{unknown} is not part of the model"),
            });
        }
        self.target_layer = Some(target);
        self.layers = layers;
        Ok(())
    }

    /// Evaluate the current mini-batch for `mode`.
    ///
    /// Returns the mean over this mini-batch across every rank and adds the
    /// global sum and sample count to the statistics for `mode`.
    pub fn evaluate<M: ModelGraph<B>>(
        &mut self,
        model: &M,
        mode: ExecutionMode,
    ) -> MetricResult<f64> {
        // Every rank joins the all-reduce, including ranks whose local
        // evaluation failed; the failure count travels with the sums.
        let local = self.evaluate_local(model, mode);
        let (local_sum, local_count, local_failed) = match &local {
            Ok((sum, count)) => (*sum, *count as f64, 0.0),
            Err(_) => (0.0, 0.0, 1.0),
        };

        let mut reduced = [local_sum, local_count, local_failed];
        self.comm.all_reduce_sum(&mut reduced)?;
        let [global_sum, global_count, failed_ranks] = reduced;

        local?;
        if failed_ranks > 0.0 {
            return Err(MetricError::PeerEvaluationFailed {
                metric: self.name(),
                mode,
                failed_ranks: failed_ranks as u64,
            });
        }

        if global_count < 1.0 {
            return Err(MetricError::EmptyMiniBatch {
                metric: self.name(),
                mode,
            });
        }

        self.statistics
            .entry(mode)
            .or_default()
            .add_value(global_sum, global_count as u64);

        let value = global_sum / global_count;
        tracing::debug!(
            metric = %self.name(),
            %mode,
            rank = self.comm.rank(),
            global_sum,
            global_count,
            value,
            "evaluated mini-batch"
        );
        Ok(value)
    }

    /// Sum and sample count of the local shard for `mode`.
    fn evaluate_local<M: ModelGraph<B>>(
        &mut self,
        model: &M,
        mode: ExecutionMode,
    ) -> MetricResult<(f64, usize)> {
        let target = self.get_target_layer()?;
        let batch = model
            .target_batch(target, mode)
            .ok_or_else(|| MetricError::ModeUnavailable {
                metric: self.name(),
                mode,
            })?;

        let prediction_dims = batch.prediction.dims();
        let ground_truth_dims = batch.ground_truth.dims();
        if prediction_dims != ground_truth_dims {
            return Err(MetricError::InvalidTensorShape {
                expected: format!("{prediction_dims:?}"),
                actual: format!("{ground_truth_dims:?}"),
            });
        }

        let local_count = prediction_dims[0];
        if local_count == 0 {
            return Ok((0.0, 0));
        }
        let local_sum = self
            .compute
            .evaluate_compute(&batch.prediction, &batch.ground_truth);
        Ok((local_sum, local_count))
    }

    /// Clear the statistics of every mode.
    pub fn reset_statistics(&mut self) {
        self.statistics.clear();
    }

    /// Clear the statistics of one mode.
    pub fn reset_statistics_mode(&mut self, mode: ExecutionMode) {
        self.statistics.remove(&mode);
    }

    /// Sample-weighted mean since the last reset of `mode`.
    pub fn get_mean_value(&self, mode: ExecutionMode) -> MetricResult<f64> {
        self.statistics
            .get(&mode)
            .ok_or(MetricError::EmptyStatistics { mode: Some(mode) })?
            .get_mean()
            .map_err(|_| MetricError::EmptyStatistics { mode: Some(mode) })
    }

    /// Number of samples recorded for `mode`; zero if never evaluated.
    pub fn get_statistics_num_samples(&self, mode: ExecutionMode) -> u64 {
        self.statistics
            .get(&mode)
            .map_or(0, MetricStatistics::get_num_samples)
    }

    pub fn statistics(&self, mode: ExecutionMode) -> Option<&MetricStatistics> {
        self.statistics.get(&mode)
    }

    /// Modes with recorded statistics.
    pub fn modes(&self) -> impl Iterator<Item = ExecutionMode> + '_ {
        self.statistics.keys().copied()
    }

    // --- Checkpointing ---

    fn modes_key(&self) -> String {
        format!("{}.modes", self.checkpoint_prefix)
    }

    /// Write every mode's statistics. Only the root rank writes.
    pub fn save_to_checkpoint_shared(&self, persist: &mut dyn Persist) -> MetricResult<()> {
        if !self.comm.is_root() {
            return Ok(());
        }
        let mask = self.modes().fold(0u64, |mask, mode| mask | mode.bit());
        persist.write_u64(&self.modes_key(), mask)?;
        for (mode, statistics) in &self.statistics {
            statistics.pack_scalars(persist, &self.checkpoint_prefix, *mode)?;
        }
        tracing::info!(
            metric = %self.name(),
            prefix = %self.checkpoint_prefix,
            modes = self.statistics.len(),
            "saved metric statistics"
        );
        Ok(())
    }

    /// Restore statistics written by [`Metric::save_to_checkpoint_shared`].
    ///
    /// The root rank reads the checkpoint and broadcasts it to the group.
    /// On success every rank holds exactly the modes present at save time.
    /// On failure the statistics are left untouched.
    pub fn load_from_checkpoint_shared(&mut self, persist: &mut dyn Persist) -> MetricResult<()> {
        let mut payload = Vec::new();
        let mut root_error = None;
        if self.comm.is_root() {
            match self.read_checkpoint(persist) {
                Ok(records) => payload = encode_records(&records),
                Err(err) => {
                    payload.push(RESTORE_FAILED);
                    root_error = Some(err);
                }
            }
        }

        if self.comm.size() > 1 {
            self.comm.broadcast(0, &mut payload)?;
        }

        if let Some(err) = root_error {
            return Err(err);
        }
        let Some(records) = decode_records(&payload)? else {
            tracing::warn!(
                metric = %self.name(),
                rank = self.comm.rank(),
                "root rank failed to read shared checkpoint"
            );
            return Err(MetricError::CheckpointUnavailable { metric: self.name() });
        };

        self.statistics = records
            .into_iter()
            .map(|(mode, header)| (mode, MetricStatistics::from(header)))
            .collect();
        tracing::info!(
            metric = %self.name(),
            rank = self.comm.rank(),
            modes = self.statistics.len(),
            "restored metric statistics"
        );
        Ok(())
    }

    fn read_checkpoint(
        &self,
        persist: &mut dyn Persist,
    ) -> MetricResult<ModeRecords> {
        let mask = persist.read_u64(&self.modes_key())?;
        if mask & !ALL_MODES_MASK != 0 {
            return Err(MetricError::CheckpointCorrupt {
                name: self.modes_key(),
                reason: format!("unknown mode bits in {mask:#x}"),
            });
        }
        ExecutionMode::from_mask(mask)
            .map(|mode| {
                MetricStatistics::unpack_scalars(persist, &self.checkpoint_prefix, mode)
                    .map(|header| (mode, header))
            })
            .collect()
    }
}

impl<B: Backend> Clone for Metric<B> {
    fn clone(&self) -> Self {
        self.copy()
    }
}

/// Checkpoint prefix derived from a display name, e.g.
/// `"top-5 categorical accuracy"` becomes `"top_5_categorical_accuracy"`.
pub fn default_checkpoint_prefix(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

const ALL_MODES_MASK: u64 = 0b1111;
const RESTORE_OK: u8 = 1;
const RESTORE_FAILED: u8 = 0;

// Broadcast payload: status byte, mode mask (u64 LE), then one packed
// record per mode in mask order.
fn encode_records(records: &[(ExecutionMode, PackedStatistics)]) -> Vec<u8> {
    let mask = records.iter().fold(0u64, |mask, (mode, _)| mask | mode.bit());
    let mut payload = Vec::with_capacity(9 + records.len() * PackedStatistics::SIZE);
    payload.push(RESTORE_OK);
    payload.extend_from_slice(&mask.to_le_bytes());
    for (_, header) in records {
        payload.extend_from_slice(&header.to_bytes());
    }
    payload
}

type ModeRecords = Vec<(ExecutionMode, PackedStatistics)>;

fn decode_records(payload: &[u8]) -> MetricResult<Option<ModeRecords>> {
    let corrupt = |reason: String| MetricError::CheckpointCorrupt {
        name: "restore broadcast".to_string(),
        reason,
    };
    match payload.first() {
        Some(&RESTORE_FAILED) => return Ok(None),
        Some(&RESTORE_OK) => {}
        other => return Err(corrupt(format!("unexpected status {other:?}"))),
    }
    let mask_bytes: [u8; 8] = payload
        .get(1..9)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| corrupt("truncated mode mask".to_string()))?;
    let mask = u64::from_le_bytes(mask_bytes);
    let modes: Vec<_> = ExecutionMode::from_mask(mask).collect();
    let body = &payload[9..];
    if body.len() != modes.len() * PackedStatistics::SIZE {
        return Err(corrupt(format!(
            "expected {} records, found {} bytes",
            modes.len(),
            body.len()
        )));
    }
    modes
        .into_iter()
        .zip(body.chunks_exact(PackedStatistics::SIZE))
        .map(|(mode, chunk)| PackedStatistics::from_bytes(chunk).map(|header| (mode, header)))
        .collect::<MetricResult<Vec<_>>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        comm::SingleProcess,
        layer::{LayerGraph, TargetBatch},
        persist::MemoryPersist,
    };
    use burn::{backend::NdArray, tensor::TensorData};

    type TestBackend = NdArray<f32>;

    /// Sums the first prediction column of every sample.
    #[derive(Debug, Clone)]
    struct ColumnSum;

    impl<B: Backend> MetricCompute<B> for ColumnSum {
        fn name(&self) -> String {
            "column sum".to_string()
        }

        fn evaluate_compute(&mut self, prediction: &Tensor<B, 2>, _: &Tensor<B, 2>) -> f64 {
            use burn::tensor::ElementConversion;
            let rows = prediction.dims()[0];
            prediction
                .clone()
                .slice([0..rows, 0..1])
                .sum()
                .into_scalar()
                .elem::<f64>()
        }

        fn boxed_clone(&self) -> Box<dyn MetricCompute<B>> {
            Box::new(self.clone())
        }
    }

    fn graph_with_target() -> (LayerGraph<TestBackend>, LayerId) {
        let mut graph = LayerGraph::new();
        let fc = graph.add_layer("fc", LayerRole::Prediction, &[]);
        let target = graph.add_layer("target", LayerRole::Target, &[fc]);
        (graph, target)
    }

    fn feed(
        graph: &mut LayerGraph<TestBackend>,
        target: LayerId,
        mode: ExecutionMode,
        values: &[f32],
    ) {
        let device = Default::default();
        let prediction = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(values.to_vec(), [values.len(), 1]),
            &device,
        );
        let ground_truth = Tensor::zeros([values.len(), 1], &device);
        graph
            .set_target_batch(target, mode, TargetBatch::new(prediction, ground_truth))
            .unwrap();
    }

    fn new_metric() -> Metric<TestBackend> {
        Metric::new(Arc::new(SingleProcess), Box::new(ColumnSum))
    }

    #[test]
    fn test_evaluate_returns_batch_mean_and_accumulates() {
        let (mut graph, target) = graph_with_target();
        let mut metric = new_metric();
        metric.setup(&graph).unwrap();

        feed(&mut graph, target, ExecutionMode::Training, &[1.0, 3.0]);
        assert_eq!(metric.evaluate(&graph, ExecutionMode::Training).unwrap(), 2.0);

        feed(&mut graph, target, ExecutionMode::Training, &[2.0, 2.0, 2.0, 3.0]);
        let value = metric.evaluate(&graph, ExecutionMode::Training).unwrap();
        assert_eq!(value, 2.25);

        assert_eq!(metric.get_statistics_num_samples(ExecutionMode::Training), 6);
        let mean = metric.get_mean_value(ExecutionMode::Training).unwrap();
        assert!((mean - 13.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_setup_binds_target_and_parents() {
        let (graph, target) = graph_with_target();
        let mut metric = new_metric();
        metric.setup(&graph).unwrap();

        assert_eq!(metric.get_target_layer().unwrap(), target);
        assert_eq!(metric.get_layer_pointers(), vec![target, LayerId::new(0)]);
    }

    #[test]
    fn test_setup_without_target_fails() {
        let mut graph = LayerGraph::<TestBackend>::new();
        graph.add_layer("fc", LayerRole::Prediction, &[]);
        let mut metric = new_metric();

        match metric.setup(&graph) {
            Err(MetricError::MissingLayer { role, .. }) => assert_eq!(role, "target"),
            other => panic!("Expected MissingLayer error, got {other:?}"),
        }
    }

    #[test]
    fn test_evaluate_before_setup_fails() {
        let (graph, _) = graph_with_target();
        let mut metric = new_metric();
        assert!(matches!(
            metric.evaluate(&graph, ExecutionMode::Training),
            Err(MetricError::TargetLayerNotSet { .. })
        ));
    }

    #[test]
    fn test_evaluate_unavailable_mode_fails() {
        let (mut graph, target) = graph_with_target();
        let mut metric = new_metric();
        metric.setup(&graph).unwrap();
        feed(&mut graph, target, ExecutionMode::Training, &[1.0]);

        assert!(matches!(
            metric.evaluate(&graph, ExecutionMode::Testing),
            Err(MetricError::ModeUnavailable {
                mode: ExecutionMode::Testing,
                ..
            })
        ));
        assert_eq!(metric.get_statistics_num_samples(ExecutionMode::Testing), 0);
    }

    #[test]
    fn test_evaluate_shape_mismatch_fails() {
        let device = Default::default();
        let (mut graph, target) = graph_with_target();
        let mut metric = new_metric();
        metric.setup(&graph).unwrap();
        graph
            .set_target_batch(
                target,
                ExecutionMode::Training,
                TargetBatch::new(
                    Tensor::zeros([2, 3], &device),
                    Tensor::zeros([2, 4], &device),
                ),
            )
            .unwrap();

        assert!(matches!(
            metric.evaluate(&graph, ExecutionMode::Training),
            Err(MetricError::InvalidTensorShape { .. })
        ));
    }

    #[test]
    fn test_empty_mini_batch_records_nothing() {
        let (mut graph, target) = graph_with_target();
        let mut metric = new_metric();
        metric.setup(&graph).unwrap();
        feed(&mut graph, target, ExecutionMode::Validation, &[]);

        assert!(matches!(
            metric.evaluate(&graph, ExecutionMode::Validation),
            Err(MetricError::EmptyMiniBatch { .. })
        ));
        assert!(metric.statistics(ExecutionMode::Validation).is_none());
    }

    #[test]
    fn test_set_layer_pointers_rejects_non_target() {
        let (graph, target) = graph_with_target();
        let mut metric = new_metric();

        assert!(metric.set_layer_pointers(&graph, vec![]).is_err());
        assert!(metric
            .set_layer_pointers(&graph, vec![LayerId::new(0)])
            .is_err());
        assert!(metric
            .set_layer_pointers(&graph, vec![target, LayerId::new(42)])
            .is_err());
        metric.set_layer_pointers(&graph, vec![target]).unwrap();
        assert_eq!(metric.get_target_layer().unwrap(), target);
    }

    #[test]
    fn test_reset_one_mode_leaves_others() {
        let (mut graph, target) = graph_with_target();
        let mut metric = new_metric();
        metric.setup(&graph).unwrap();

        feed(&mut graph, target, ExecutionMode::Training, &[1.0, 2.0]);
        feed(&mut graph, target, ExecutionMode::Validation, &[10.0]);
        metric.evaluate(&graph, ExecutionMode::Training).unwrap();
        metric.evaluate(&graph, ExecutionMode::Validation).unwrap();

        metric.reset_statistics_mode(ExecutionMode::Training);
        assert!(matches!(
            metric.get_mean_value(ExecutionMode::Training),
            Err(MetricError::EmptyStatistics {
                mode: Some(ExecutionMode::Training)
            })
        ));
        assert_eq!(metric.get_statistics_num_samples(ExecutionMode::Training), 0);
        assert_eq!(metric.get_mean_value(ExecutionMode::Validation).unwrap(), 10.0);

        metric.reset_statistics();
        assert!(metric.get_mean_value(ExecutionMode::Validation).is_err());
        assert_eq!(metric.modes().count(), 0);
    }

    #[test]
    fn test_copy_accumulates_independently() {
        let (mut graph, target) = graph_with_target();
        let mut original = new_metric();
        original.setup(&graph).unwrap();
        feed(&mut graph, target, ExecutionMode::Training, &[4.0]);
        original.evaluate(&graph, ExecutionMode::Training).unwrap();

        let mut copy = original.copy();
        assert_eq!(copy.get_mean_value(ExecutionMode::Training).unwrap(), 4.0);
        assert_eq!(copy.get_target_layer().unwrap(), target);
        assert_eq!(copy.name(), "column sum");

        feed(&mut graph, target, ExecutionMode::Training, &[0.0]);
        original.evaluate(&graph, ExecutionMode::Training).unwrap();
        assert_eq!(original.get_mean_value(ExecutionMode::Training).unwrap(), 2.0);
        assert_eq!(copy.get_mean_value(ExecutionMode::Training).unwrap(), 4.0);

        copy.reset_statistics();
        assert_eq!(original.get_statistics_num_samples(ExecutionMode::Training), 2);
    }

    #[test]
    fn test_checkpoint_round_trip_restores_exact_state() {
        let (mut graph, target) = graph_with_target();
        let mut metric = new_metric();
        metric.setup(&graph).unwrap();
        feed(&mut graph, target, ExecutionMode::Training, &[0.1, 0.2, 0.3]);
        feed(&mut graph, target, ExecutionMode::Testing, &[-5.0]);
        metric.evaluate(&graph, ExecutionMode::Training).unwrap();
        metric.evaluate(&graph, ExecutionMode::Testing).unwrap();

        let mut persist = MemoryPersist::new();
        metric.save_to_checkpoint_shared(&mut persist).unwrap();
        assert_eq!(persist.len(), 5);

        let mut restored = new_metric();
        feed(&mut graph, target, ExecutionMode::Validation, &[9.0]);
        restored.setup(&graph).unwrap();
        restored.evaluate(&graph, ExecutionMode::Validation).unwrap();
        restored.load_from_checkpoint_shared(&mut persist).unwrap();

        for mode in [ExecutionMode::Training, ExecutionMode::Testing] {
            let expected = metric.statistics(mode).unwrap();
            let actual = restored.statistics(mode).unwrap();
            assert_eq!(actual.get_sum().to_bits(), expected.get_sum().to_bits());
            assert_eq!(actual.get_num_samples(), expected.get_num_samples());
        }
        // Modes absent at save time are absent after restore.
        assert!(restored.statistics(ExecutionMode::Validation).is_none());

        // Accumulation resumes from the restored state.
        restored.evaluate(&graph, ExecutionMode::Testing).unwrap();
        assert_eq!(restored.get_statistics_num_samples(ExecutionMode::Testing), 2);
    }

    #[test]
    fn test_load_missing_checkpoint_keeps_statistics() {
        let (mut graph, target) = graph_with_target();
        let mut metric = new_metric();
        metric.setup(&graph).unwrap();
        feed(&mut graph, target, ExecutionMode::Training, &[1.0]);
        metric.evaluate(&graph, ExecutionMode::Training).unwrap();

        let mut empty = MemoryPersist::new();
        assert!(matches!(
            metric.load_from_checkpoint_shared(&mut empty),
            Err(MetricError::CheckpointMissing { .. })
        ));
        assert_eq!(metric.get_statistics_num_samples(ExecutionMode::Training), 1);
    }

    #[test]
    fn test_checkpoint_prefix() {
        assert_eq!(
            default_checkpoint_prefix("top-5 categorical accuracy"),
            "top_5_categorical_accuracy"
        );
        let metric = new_metric().with_checkpoint_prefix("acc");
        assert_eq!(metric.checkpoint_prefix(), "acc");
    }

    #[test]
    fn test_decode_rejects_truncated_payload() {
        let records = vec![(
            ExecutionMode::Training,
            PackedStatistics {
                sum: 1.0,
                num_samples: 1,
            },
        )];
        let payload = encode_records(&records);
        assert_eq!(decode_records(&payload).unwrap().unwrap(), records);
        assert!(decode_records(&payload[..payload.len() - 1]).is_err());
        assert!(decode_records(&[]).is_err());
        assert_eq!(decode_records(&[RESTORE_FAILED]).unwrap(), None);
    }
}
