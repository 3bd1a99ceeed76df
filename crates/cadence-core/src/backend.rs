//! Execution backend selection.
//!
//! [`Backend`] is the runtime tag carried by particle data; [`Executor`]
//! is the matching compile-time strategy kernels are generic over, so
//! the per-particle and per-group loops are monomorphized for one
//! backend and never branch on it inside the loop.

use std::ops::Range;

use rayon::prelude::*;

/// Where particle fields live and where heavy phases execute.
///
/// Chosen once when a [`ParticleData`](crate::ParticleData) and its
/// propagator are constructed; never switched mid-run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    /// Fields are host-resident; kernels run serially on the calling thread.
    #[default]
    Host,
    /// Fields are resident in a separate device store that must be
    /// explicitly transferred to host memory before output. Kernels run
    /// data-parallel on the rayon pool.
    Accelerated,
}

impl Backend {
    /// Whether this backend keeps a device-resident field store.
    pub fn is_accelerated(self) -> bool {
        matches!(self, Self::Accelerated)
    }

    /// Short name for logging.
    pub fn name(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Accelerated => "accelerated",
        }
    }
}

/// Compile-time kernel execution strategy.
pub trait Executor: Send + Sync + 'static {
    /// The backend whose data this executor operates on.
    const BACKEND: Backend;

    /// Evaluate `f` for every index in `range`, returning results in
    /// index order.
    fn map_range<T, F>(range: Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;
}

/// Serial execution on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct Serial;

impl Executor for Serial {
    const BACKEND: Backend = Backend::Host;

    fn map_range<T, F>(range: Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        range.map(f).collect()
    }
}

/// Data-parallel execution on the rayon pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct Parallel;

impl Executor for Parallel {
    const BACKEND: Backend = Backend::Accelerated;

    fn map_range<T, F>(range: Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        range.into_par_iter().map(f).collect()
    }
}
