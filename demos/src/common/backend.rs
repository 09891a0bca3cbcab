//! Backend and per-rank device placement.
//!
//! The backend is fixed at compile time by feature flag. GPU backends put
//! rank `r` on device `r`; the CPU backend runs every rank on one device.

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "cuda")] {
        pub type SelectedBackend = burn::backend::Cuda;
        pub type SelectedDevice = burn::backend::cuda::CudaDevice;

        pub const BACKEND_NAME: &str = "cuda";

        pub fn rank_device(rank: usize) -> SelectedDevice {
            SelectedDevice::new(rank)
        }
    } else if #[cfg(feature = "wgpu")] {
        pub type SelectedBackend = burn::backend::Wgpu;
        pub type SelectedDevice = burn::backend::wgpu::WgpuDevice;

        pub const BACKEND_NAME: &str = "wgpu";

        pub fn rank_device(rank: usize) -> SelectedDevice {
            SelectedDevice::DiscreteGpu(rank)
        }
    } else {
        pub type SelectedBackend = burn::backend::NdArray;
        pub type SelectedDevice = burn::backend::ndarray::NdArrayDevice;

        pub const BACKEND_NAME: &str = "ndarray";

        pub fn rank_device(_rank: usize) -> SelectedDevice {
            SelectedDevice::Cpu
        }
    }
}

/// Device of every rank, indexed by rank.
pub fn group_devices(num_ranks: usize) -> Vec<SelectedDevice> {
    (0..num_ranks).map(rank_device).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_device_per_rank() {
        let devices = group_devices(3);
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0], rank_device(0));
    }

    #[cfg(not(any(feature = "cuda", feature = "wgpu")))]
    #[test]
    fn test_cpu_ranks_share_a_device() {
        assert_eq!(BACKEND_NAME, "ndarray");
        assert!(group_devices(4).iter().all(|device| *device == rank_device(0)));
    }
}
