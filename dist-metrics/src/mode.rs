//! Execution modes of the training lifecycle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A phase of the training lifecycle, each tracked with independent statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExecutionMode {
    Training,
    Validation,
    Testing,
    Prediction,
}

impl ExecutionMode {
    /// Every mode, in checkpoint order.
    pub const ALL: [ExecutionMode; 4] = [
        ExecutionMode::Training,
        ExecutionMode::Validation,
        ExecutionMode::Testing,
        ExecutionMode::Prediction,
    ];

    /// Stable identifier used in checkpoint keys.
    pub const fn as_str(self) -> &'static str {
        match self {
            ExecutionMode::Training => "training",
            ExecutionMode::Validation => "validation",
            ExecutionMode::Testing => "testing",
            ExecutionMode::Prediction => "prediction",
        }
    }

    /// Single-bit mask recording this mode in a checkpoint's mode set.
    pub const fn bit(self) -> u64 {
        match self {
            ExecutionMode::Training => 1 << 0,
            ExecutionMode::Validation => 1 << 1,
            ExecutionMode::Testing => 1 << 2,
            ExecutionMode::Prediction => 1 << 3,
        }
    }

    /// Modes whose bits are set in `mask`, in checkpoint order.
    pub fn from_mask(mask: u64) -> impl Iterator<Item = ExecutionMode> {
        Self::ALL.into_iter().filter(move |mode| mask & mode.bit() != 0)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
