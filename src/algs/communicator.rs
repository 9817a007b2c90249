//! Thin façade over the process group the adapter runs in.
//!
//! The adapter follows a single-coordinator model: rank 0 talks to the coupling
//! service, every other rank only needs to stay in step with it. That takes two
//! collectives: a full barrier and a broadcast of the coordinator's session
//! state. Backends:
//! - [`NoComm`]: a serial run, both collectives are no-ops,
//! - [`LocalComm`]: several "ranks" as threads of one process (tests, tooling),
//! - `MpiComm`: a real MPI world (feature `mpi-support`).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};

/// Rank that performs all coupling-service calls.
pub const COORDINATOR_RANK: usize = 0;

/// Collective operations needed to keep ranks in lockstep.
pub trait Communicator {
    /// Rank of this process.
    fn rank(&self) -> usize;

    /// Number of processes in the group.
    fn size(&self) -> usize;

    /// Blocks until every rank has entered the barrier.
    fn barrier(&self);

    /// Replace `buf` on every rank with its contents on `root`.
    ///
    /// All ranks must call this with equally sized buffers, in the same order.
    fn broadcast(&self, root: usize, buf: &mut [u8]);

    /// Whether this rank is the coordinator.
    #[inline]
    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR_RANK
    }
}

/// Compile-time no-op comm for serial runs and unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn broadcast(&self, _root: usize, _buf: &mut [u8]) {}
}

// --- LocalComm: intra-process / multi-thread ---
type Key = (usize, usize, u64); // (src, dst, epoch)

#[derive(Debug, Default)]
struct BarrierState {
    arrived: usize,
    generation: u64,
}

#[derive(Debug)]
struct LocalShared {
    size: usize,
    mailbox: DashMap<Key, Bytes>,
    barrier: Mutex<BarrierState>,
    released: Condvar,
}

/// One rank of an in-process group; create the whole group with [`LocalComm::world`].
#[derive(Debug)]
pub struct LocalComm {
    rank: usize,
    epoch: AtomicU64,
    shared: Arc<LocalShared>,
}

impl LocalComm {
    /// Creates `size` connected ranks, index `i` being rank `i`.
    pub fn world(size: usize) -> Vec<LocalComm> {
        let shared = Arc::new(LocalShared {
            size,
            mailbox: DashMap::new(),
            barrier: Mutex::new(BarrierState::default()),
            released: Condvar::new(),
        });
        (0..size)
            .map(|rank| LocalComm {
                rank,
                epoch: AtomicU64::new(0),
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn barrier(&self) {
        let mut state = self.shared.barrier.lock();
        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.shared.size {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.shared.released.notify_all();
        } else {
            while state.generation == generation {
                self.shared.released.wait(&mut state);
            }
        }
    }

    fn broadcast(&self, root: usize, buf: &mut [u8]) {
        let epoch = self.epoch.fetch_add(1, Ordering::Relaxed);
        if self.rank == root {
            let payload = Bytes::copy_from_slice(buf);
            for peer in (0..self.shared.size).filter(|&p| p != root) {
                self.shared.mailbox.insert((root, peer, epoch), payload.clone());
            }
            return;
        }
        let key = (root, self.rank, epoch);
        loop {
            if let Some((_, bytes)) = self.shared.mailbox.remove(&key) {
                let n = buf.len().min(bytes.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                break;
            }
            std::thread::yield_now();
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::Communicator;
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::{Communicator as _, Root};

    /// World communicator of an MPI run.
    pub struct MpiComm {
        _universe: Universe,
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        /// Initializes MPI; returns `None` if it was already initialized.
        pub fn new() -> Option<Self> {
            let universe = mpi::initialize()?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Some(Self {
                _universe: universe,
                world,
                rank,
                size,
            })
        }
    }

    impl Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn barrier(&self) {
            self.world.barrier();
        }

        fn broadcast(&self, root: usize, buf: &mut [u8]) {
            self.world
                .process_at_rank(root as i32)
                .broadcast_into(buf);
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn no_comm_is_a_single_coordinator() {
        let c = NoComm;
        assert_eq!((c.rank(), c.size()), (0, 1));
        assert!(c.is_coordinator());
        let mut buf = [7u8; 2];
        c.broadcast(0, &mut buf);
        c.barrier();
        assert_eq!(buf, [7, 7]);
    }

    #[test]
    fn local_broadcast_reaches_every_rank() {
        let handles: Vec<_> = LocalComm::world(3)
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let mut buf = if comm.is_coordinator() { [1, 2, 3, 4] } else { [0; 4] };
                    comm.broadcast(0, &mut buf);
                    comm.barrier();
                    // second epoch must not see the first payload
                    let mut next = if comm.is_coordinator() { [9u8] } else { [0u8] };
                    comm.broadcast(0, &mut next);
                    (buf, next)
                })
            })
            .collect();
        for h in handles {
            let (buf, next) = h.join().expect("rank thread panicked");
            assert_eq!(buf, [1, 2, 3, 4]);
            assert_eq!(next, [9]);
        }
    }

    #[test]
    fn local_barrier_is_reusable() {
        let counter = Arc::new(AtomicU64::new(0));
        let handles: Vec<_> = LocalComm::world(4)
            .into_iter()
            .map(|comm| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for round in 1..=3u64 {
                        counter.fetch_add(1, Ordering::SeqCst);
                        comm.barrier();
                        assert!(counter.load(Ordering::SeqCst) >= round * 4);
                        comm.barrier();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("rank thread panicked");
        }
        assert_eq!(counter.load(Ordering::SeqCst), 12);
    }
}
