//! Per-step timing and diagnostics.
//!
//! [`StepMetrics`] is returned from every
//! [`Propagator::step`](crate::Propagator::step) and retained as the
//! propagator's last metrics.

use indexmap::IndexMap;

/// Timing and reduced diagnostics for one macro-step.
///
/// Durations are in microseconds, keyed by phase name in execution order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepMetrics {
    /// Wall-clock time per phase.
    pub phase_us: IndexMap<&'static str, u64>,
    /// Wall-clock time for the whole step.
    pub total_us: u64,
    /// Owned particles this step.
    pub n_particles: usize,
    /// This rank's potential energy before reduction.
    pub egrav_local: f64,
    /// Global potential energy. `Some` on the root rank only.
    pub egrav_global: Option<f64>,
    /// This rank's traversal counters:
    /// `[p2p_local, p2p_max, m2p_local, m2p_max]`.
    pub stats: [u64; 4],
    /// Largest per-particle P2P count on any rank. `Some` on the root
    /// rank only.
    pub max_p2p_global: Option<u64>,
}

impl StepMetrics {
    /// Average P2P interactions per owned particle.
    pub fn p2p_per_particle(&self) -> u64 {
        self.stats[0].checked_div(self.n_particles as u64).unwrap_or(0)
    }

    /// Average M2P interactions per owned particle.
    pub fn m2p_per_particle(&self) -> u64 {
        self.stats[2].checked_div(self.n_particles as u64).unwrap_or(0)
    }
}
