//! Wall-clock phase timing.

use std::time::Instant;

use indexmap::IndexMap;
use tracing::trace;

/// Records the duration of consecutive named phases.
///
/// Each [`step`](PhaseTimer::step) closes the phase that began at the
/// previous step (or at [`start`](PhaseTimer::start)).
///
/// ```
/// use cadence_engine::PhaseTimer;
///
/// let mut timer = PhaseTimer::start();
/// timer.step("sync");
/// timer.step("gravity");
/// let (phases, _total) = timer.stop();
/// assert_eq!(phases.keys().copied().collect::<Vec<_>>(), ["sync", "gravity"]);
/// ```
#[derive(Debug)]
pub struct PhaseTimer {
    origin: Instant,
    mark: Instant,
    phases: IndexMap<&'static str, u64>,
}

impl PhaseTimer {
    /// Begin timing.
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            origin: now,
            mark: now,
            phases: IndexMap::new(),
        }
    }

    /// Close the current phase under `name` and begin the next.
    pub fn step(&mut self, name: &'static str) {
        let now = Instant::now();
        let us = now.duration_since(self.mark).as_micros() as u64;
        trace!(phase = name, us, "phase complete");
        *self.phases.entry(name).or_insert(0) += us;
        self.mark = now;
    }

    /// Finish timing, returning per-phase durations and the total, in
    /// microseconds.
    pub fn stop(self) -> (IndexMap<&'static str, u64>, u64) {
        (self.phases, self.origin.elapsed().as_micros() as u64)
    }
}
