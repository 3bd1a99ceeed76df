//! A communicator wrapper that records which collectives were issued.

use std::sync::{Arc, Mutex};

use cadence_comm::{Communicator, ReduceOp, ReduceTarget, Reducible, Scalar};
use cadence_core::CollectiveError;

/// Shared, append-only log of collective names in issue order.
#[derive(Clone, Debug, Default)]
pub struct CollectiveLog(Arc<Mutex<Vec<&'static str>>>);

impl CollectiveLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, name: &'static str) {
        self.0.lock().unwrap().push(name);
    }

    /// Snapshot of the names recorded so far.
    pub fn entries(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Wraps a communicator and logs `barrier`, `all_gather` and each
/// `reduce` (named by operator) before delegating.
pub struct RecordingComm<C> {
    inner: C,
    log: CollectiveLog,
}

impl<C: Communicator> RecordingComm<C> {
    pub fn new(inner: C, log: CollectiveLog) -> Self {
        Self { inner, log }
    }
}

impl<C: Communicator> Communicator for RecordingComm<C> {
    fn rank(&self) -> usize {
        self.inner.rank()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn send_to(&self, dest: usize, msg: Vec<Scalar>) -> Result<(), CollectiveError> {
        self.inner.send_to(dest, msg)
    }

    fn recv_from(&self, source: usize) -> Result<Vec<Scalar>, CollectiveError> {
        self.inner.recv_from(source)
    }

    fn barrier(&self) -> Result<(), CollectiveError> {
        self.log.push("barrier");
        self.inner.barrier()
    }

    fn all_gather<T: Reducible>(&self, local: &[T]) -> Result<Vec<Vec<T>>, CollectiveError> {
        self.log.push("all_gather");
        self.inner.all_gather(local)
    }

    fn reduce<T: Reducible>(
        &self,
        values: &[T],
        op: ReduceOp,
        target: ReduceTarget,
    ) -> Result<Option<Vec<T>>, CollectiveError> {
        self.log.push(match op {
            ReduceOp::Sum => "reduce_sum",
            ReduceOp::Min => "reduce_min",
            ReduceOp::Max => "reduce_max",
        });
        self.inner.reduce(values, op, target)
    }
}
