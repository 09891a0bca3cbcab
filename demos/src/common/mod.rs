//! Common utilities for the demos.

pub mod backend;
pub mod synthetic;

// Re-export commonly used items
pub use backend::{group_devices, rank_device, SelectedBackend, SelectedDevice, BACKEND_NAME};
pub use synthetic::{build_graph, synthetic_batch};
