//! Running metric statistics for a single execution mode.
//!
//! [`MetricStatistics`] keeps a running sum of metric values together with
//! the number of samples that contributed to it. Means are sample-weighted:
//! when mini-batch sizes differ, the mean is taken over sample values rather
//! than over per-batch means.

use serde::{Deserialize, Serialize};

use crate::{
    error::{MetricError, MetricResult},
    mode::ExecutionMode,
    persist::Persist,
};

/// Running sum and sample count of metric values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricStatistics {
    sum: f64,
    num_samples: u64,
}

impl MetricStatistics {
    /// Create zeroed statistics.
    pub const fn new() -> Self {
        Self {
            sum: 0.0,
            num_samples: 0,
        }
    }

    /// Add a metric value covering `num_samples` samples.
    ///
    /// `value` is the sum over those samples, not their mean.
    ///
    /// # Panics
    /// Panics if `num_samples` is zero.
    pub fn add_value(&mut self, value: f64, num_samples: u64) {
        assert!(
            num_samples >= 1,
            "metric statistics require at least one sample per update"
        );
        self.sum += value;
        self.num_samples += num_samples;
    }

    /// Add the value of a single sample.
    pub fn add_sample(&mut self, value: f64) {
        self.add_value(value, 1);
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: &Self) {
        self.sum += other.sum;
        self.num_samples += other.num_samples;
    }

    /// Sample-weighted mean of the recorded values.
    ///
    /// Fails with [`MetricError::EmptyStatistics`] when nothing has been
    /// recorded since construction or the last reset.
    pub fn get_mean(&self) -> MetricResult<f64> {
        if self.num_samples == 0 {
            return Err(MetricError::EmptyStatistics { mode: None });
        }
        Ok(self.sum / self.num_samples as f64)
    }

    pub const fn get_num_samples(&self) -> u64 {
        self.num_samples
    }

    pub const fn get_sum(&self) -> f64 {
        self.sum
    }

    pub const fn is_empty(&self) -> bool {
        self.num_samples == 0
    }

    /// Reset the statistics.
    pub const fn reset(&mut self) {
        self.sum = 0.0;
        self.num_samples = 0;
    }

    // --- Checkpointing ---

    /// Fixed-layout record of the current state.
    pub const fn header(&self) -> PackedStatistics {
        PackedStatistics {
            sum: self.sum,
            num_samples: self.num_samples,
        }
    }

    /// Write this accumulator's record for `mode` under `prefix`.
    pub fn pack_scalars(
        &self,
        persist: &mut dyn Persist,
        prefix: &str,
        mode: ExecutionMode,
    ) -> MetricResult<()> {
        persist.write_f64(&record_key(prefix, mode, SUM_FIELD), self.sum)?;
        persist.write_u64(
            &record_key(prefix, mode, NUM_SAMPLES_FIELD),
            self.num_samples,
        )
    }

    /// Read the record for `mode` under `prefix` without applying it.
    pub fn unpack_scalars(
        persist: &mut dyn Persist,
        prefix: &str,
        mode: ExecutionMode,
    ) -> MetricResult<PackedStatistics> {
        let sum = persist.read_f64(&record_key(prefix, mode, SUM_FIELD))?;
        let num_samples = persist.read_u64(&record_key(prefix, mode, NUM_SAMPLES_FIELD))?;
        Ok(PackedStatistics { sum, num_samples })
    }

    /// Restore state from a record.
    pub const fn unpack_header(&mut self, header: &PackedStatistics) {
        self.sum = header.sum;
        self.num_samples = header.num_samples;
    }
}

impl From<PackedStatistics> for MetricStatistics {
    fn from(header: PackedStatistics) -> Self {
        let mut statistics = Self::new();
        statistics.unpack_header(&header);
        statistics
    }
}

const SUM_FIELD: &str = "sum";
const NUM_SAMPLES_FIELD: &str = "num_samples";

/// Checkpoint key of one field of a mode's record.
pub fn record_key(prefix: &str, mode: ExecutionMode, field: &str) -> String {
    format!("{prefix}.{mode}.{field}")
}

/// Serialized form of [`MetricStatistics`], used in checkpoint files and
/// in the shared-restore broadcast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedStatistics {
    pub sum: f64,
    pub num_samples: u64,
}

impl PackedStatistics {
    /// Size of the encoded record in bytes.
    pub const SIZE: usize = 16;

    /// `sum` as little-endian IEEE-754 binary64, then `num_samples` as
    /// little-endian u64.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[..8].copy_from_slice(&self.sum.to_le_bytes());
        bytes[8..].copy_from_slice(&self.num_samples.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> MetricResult<Self> {
        if bytes.len() != Self::SIZE {
            return Err(MetricError::CheckpointCorrupt {
                name: "packed statistics".to_string(),
                reason: format!("expected {} bytes, found {}", Self::SIZE, bytes.len()),
            });
        }
        let mut sum = [0u8; 8];
        let mut num_samples = [0u8; 8];
        sum.copy_from_slice(&bytes[..8]);
        num_samples.copy_from_slice(&bytes[8..]);
        Ok(Self {
            sum: f64::from_le_bytes(sum),
            num_samples: u64::from_le_bytes(num_samples),
        })
    }
}
