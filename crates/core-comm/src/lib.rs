//! Message-passing seam: process groups, collective rendezvous, and the
//! collective-hint bag.
//!
//! The transfer engine never talks to a concrete message-passing library; it
//! holds an `Arc<dyn Communicator>` and requires only rank/size queries,
//! named duplication, and a barrier for collective rendezvous. Two
//! implementations ship here:
//!
//! - [`SelfComm`]: the single-process group (rank 0 of 1, barrier is a no-op).
//! - [`LocalGroup`]: an in-process group of N endpoints meeting at a shared
//!   `std::sync::Barrier`. One endpoint per thread simulates one rank per
//!   process; the multi-rank integration tests are built on it.
//!
//! An MPI-backed communicator implements the same trait outside this
//! workspace; the engine is indifferent.

use std::sync::{Arc, Barrier};

pub mod hints;
pub use hints::Hints;

/// A process group the engine can synchronize on. Collective operations in
/// the engine are invoked by every rank of the group with globally-consistent
/// arguments; `barrier` is the rendezvous primitive backing that contract.
pub trait Communicator: Send + Sync {
    /// This endpoint's rank in `[0, size)`.
    fn rank(&self) -> usize;

    /// Number of ranks in the group. Never zero for a live group.
    fn size(&self) -> usize;

    /// Group name, preserved across duplication.
    fn name(&self) -> &str;

    /// Block until every rank of the group has entered the same barrier.
    fn barrier(&self);

    /// Duplicate this endpoint under a new name. The duplicate addresses the
    /// same group; the engine duplicates the caller's communicator at handle
    /// initialization so its collective traffic is isolated by name.
    fn duplicate(&self, name: &str) -> Arc<dyn Communicator>;
}

/// The trivial single-process group.
#[derive(Debug, Clone)]
pub struct SelfComm {
    name: String,
}

impl SelfComm {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for SelfComm {
    fn default() -> Self {
        Self::new("self")
    }
}

impl Communicator for SelfComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn barrier(&self) {}

    fn duplicate(&self, name: &str) -> Arc<dyn Communicator> {
        Arc::new(Self::new(name))
    }
}

/// In-process group of `size` endpoints sharing one barrier. Endpoints are
/// handed out by [`LocalGroup::split`], one per participating thread.
pub struct LocalGroup;

impl LocalGroup {
    /// Create `size` endpoints for an in-process group named `name`.
    ///
    /// # Panics
    /// Panics when `size` is zero; a zero-rank group is not a group.
    pub fn split(size: usize, name: &str) -> Vec<Arc<LocalComm>> {
        assert!(size > 0, "a process group needs at least one rank");
        let barrier = Arc::new(Barrier::new(size));
        (0..size)
            .map(|rank| {
                Arc::new(LocalComm {
                    rank,
                    size,
                    name: name.to_string(),
                    barrier: barrier.clone(),
                })
            })
            .collect()
    }
}

/// One endpoint of a [`LocalGroup`].
pub struct LocalComm {
    rank: usize,
    size: usize,
    name: String,
    barrier: Arc<Barrier>,
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn barrier(&self) {
        self.barrier.wait();
    }

    fn duplicate(&self, name: &str) -> Arc<dyn Communicator> {
        // The duplicate shares the group's barrier: collective ordering is
        // total across the group, so one rendezvous object suffices.
        Arc::new(LocalComm {
            rank: self.rank,
            size: self.size,
            name: name.to_string(),
            barrier: self.barrier.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn self_comm_is_rank_zero_of_one() {
        let comm = SelfComm::default();
        assert_eq!(comm.rank(), 0);
        assert_eq!(comm.size(), 1);
        comm.barrier(); // must not block
        let dup = comm.duplicate("esio");
        assert_eq!(dup.name(), "esio");
        assert_eq!(dup.size(), 1);
    }

    #[test]
    fn split_hands_out_distinct_ranks() {
        let comms = LocalGroup::split(3, "g");
        let ranks: Vec<_> = comms.iter().map(|c| c.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
        assert!(comms.iter().all(|c| c.size() == 3));
    }

    #[test]
    fn barrier_synchronizes_the_group() {
        let comms = LocalGroup::split(4, "sync");
        let entered = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                let entered = entered.clone();
                std::thread::spawn(move || {
                    entered.fetch_add(1, Ordering::SeqCst);
                    comm.barrier();
                    // Past the barrier every rank must have checked in.
                    assert_eq!(entered.load(Ordering::SeqCst), 4);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn duplicate_preserves_group_shape() {
        let comms = LocalGroup::split(2, "orig");
        let dup = comms[1].duplicate("esio");
        assert_eq!(dup.rank(), 1);
        assert_eq!(dup.size(), 2);
        assert_eq!(dup.name(), "esio");
    }
}
