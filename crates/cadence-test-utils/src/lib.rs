//! Test utilities and fixtures for Cadence development.
//!
//! - [`run_ranks`]: run a closure once per rank on scoped threads.
//! - [`ParticleCloud`]: seeded particle sets and the analytic two-body
//!   configuration, loadable into [`ParticleData`](cadence_core::ParticleData).
//! - [`direct_sum`]: O(n²) reference gravity.
//! - [`RecordingComm`]: a communicator wrapper that logs every collective.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod recording;

use std::thread;

use cadence_comm::ThreadComm;

pub use fixtures::{direct_sum, DirectSum, ParticleCloud};
pub use recording::{CollectiveLog, RecordingComm};

/// Run `f` once per rank, each on its own scoped thread with a
/// [`ThreadComm`] endpoint, and return the results in rank order.
///
/// Panics in any rank propagate to the caller.
pub fn run_ranks<R: Send>(size: usize, f: impl Fn(ThreadComm) -> R + Sync) -> Vec<R> {
    let f = &f;
    thread::scope(|s| {
        let handles: Vec<_> = ThreadComm::group(size)
            .into_iter()
            .map(|comm| s.spawn(move || f(comm)))
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(r) => r,
                Err(payload) => std::panic::resume_unwind(payload),
            })
            .collect()
    })
}
