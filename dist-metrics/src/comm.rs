//! Communication context for the data-parallel process group.
//!
//! Collectives are blocking and act as synchronization barriers: every rank
//! of the group must issue the same collectives in the same order, otherwise
//! the group deadlocks or reduces mismatched values. There is no timeout;
//! a hung peer hangs every peer.

use std::{
    fmt,
    sync::{Arc, Barrier},
};

use parking_lot::Mutex;

use crate::error::{MetricError, MetricResult};

/// Collective operations over the current data-parallel group.
pub trait Communicator: Send + Sync + fmt::Debug {
    /// Rank of this process within the group.
    fn rank(&self) -> usize;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Element-wise sum of `values` across every rank, written back in place.
    fn all_reduce_sum(&self, values: &mut [f64]) -> MetricResult<()>;

    /// Replace `payload` on every rank with the payload of `root`.
    fn broadcast(&self, root: usize, payload: &mut Vec<u8>) -> MetricResult<()>;

    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

/// A group with a single rank; collectives are the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcess;

impl Communicator for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce_sum(&self, _values: &mut [f64]) -> MetricResult<()> {
        Ok(())
    }

    fn broadcast(&self, root: usize, _payload: &mut Vec<u8>) -> MetricResult<()> {
        check_root(root, 1)
    }
}

fn check_root(root: usize, size: usize) -> MetricResult<()> {
    if root >= size {
        return Err(MetricError::Collective {
            reason: format!("broadcast root {root} is outside a group of {size} ranks"),
        });
    }
    Ok(())
}

struct GroupState {
    size: usize,
    barrier: Barrier,
    reduce_slots: Mutex<Vec<Vec<f64>>>,
    broadcast_slot: Mutex<Vec<u8>>,
}

/// In-process collective group whose ranks run on separate threads.
pub struct CollectiveGroup;

impl CollectiveGroup {
    /// Create `size` connected members, indexed by rank.
    ///
    /// # Panics
    /// Panics if `size` is zero.
    pub fn new(size: usize) -> Vec<GroupMember> {
        assert!(size > 0, "a collective group needs at least one rank");
        let state = Arc::new(GroupState {
            size,
            barrier: Barrier::new(size),
            reduce_slots: Mutex::new(vec![Vec::new(); size]),
            broadcast_slot: Mutex::new(Vec::new()),
        });
        (0..size)
            .map(|rank| GroupMember {
                rank,
                state: Arc::clone(&state),
            })
            .collect()
    }
}

/// One rank of a [`CollectiveGroup`].
pub struct GroupMember {
    rank: usize,
    state: Arc<GroupState>,
}

impl fmt::Debug for GroupMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupMember")
            .field("rank", &self.rank)
            .field("size", &self.state.size)
            .finish()
    }
}

impl GroupMember {
    fn reduce_contributions(&self, len: usize) -> MetricResult<Vec<f64>> {
        let slots = self.state.reduce_slots.lock();
        if let Some((rank, slot)) = slots.iter().enumerate().find(|(_, s)| s.len() != len) {
            return Err(MetricError::Collective {
                reason: format!(
                    "all-reduce length mismatch: rank {} sent {len} values, rank {rank} sent {}",
                    self.rank,
                    slot.len()
                ),
            });
        }
        let mut reduced = vec![0.0; len];
        for slot in slots.iter() {
            for (acc, value) in reduced.iter_mut().zip(slot) {
                *acc += value;
            }
        }
        Ok(reduced)
    }
}

impl Communicator for GroupMember {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.state.size
    }

    fn all_reduce_sum(&self, values: &mut [f64]) -> MetricResult<()> {
        tracing::trace!(rank = self.rank, len = values.len(), "all-reduce");
        self.state.reduce_slots.lock()[self.rank] = values.to_vec();
        self.state.barrier.wait();
        // Every rank sums the slots in rank order, so results agree bit-for-bit.
        let reduced = self.reduce_contributions(values.len());
        // Slots stay untouched until every rank has read them.
        self.state.barrier.wait();
        values.copy_from_slice(&reduced?);
        Ok(())
    }

    fn broadcast(&self, root: usize, payload: &mut Vec<u8>) -> MetricResult<()> {
        check_root(root, self.state.size)?;
        tracing::trace!(rank = self.rank, root, "broadcast");
        if self.rank == root {
            self.state.broadcast_slot.lock().clone_from(payload);
        }
        self.state.barrier.wait();
        if self.rank != root {
            payload.clone_from(&self.state.broadcast_slot.lock());
        }
        self.state.barrier.wait();
        Ok(())
    }
}
