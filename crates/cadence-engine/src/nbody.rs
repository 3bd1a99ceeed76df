//! Gravity-only propagator.

use cadence_comm::{Communicator, ReduceOp, ReduceTarget};
use cadence_core::{ConfigError, Field, FieldSet, ParticleData, StepError};
use cadence_domain::Domain;
use cadence_gravity::{AcceleratedMultipoleHolder, HostMultipoleHolder, MultipoleHolder};
use tracing::{debug, info};

use crate::config::PropagatorConfig;
use crate::metrics::StepMetrics;
use crate::propagator::Propagator;
use crate::timer::PhaseTimer;

/// Plain N-body propagator: gravitational interactions only.
///
/// Each [`step`](Propagator::step) runs, in order:
///
/// 1. domain sync of the conserved and dependent fields;
/// 2. resize to the halo-inclusive length and padding of the halo mass
///    slots with the mass of the first owned particle;
/// 3. zeroing of `ax, ay, az` over the owned range;
/// 4. upsweep, followed by a barrier;
/// 5. traversal;
/// 6. SUM of the potential energy and MAX of the per-particle P2P count
///    to the root rank;
/// 7. interaction diagnostics, logged on the root rank.
///
/// The multipole holder `H` fixes the backend for the propagator's
/// lifetime; data created for another backend is rejected.
#[derive(Debug)]
pub struct NbodyPropagator<H> {
    config: PropagatorConfig,
    conserved: FieldSet,
    holder: H,
    last_metrics: StepMetrics,
}

/// N-body propagator on the host backend.
pub type HostNbodyPropagator = NbodyPropagator<HostMultipoleHolder>;

/// N-body propagator on the accelerated backend.
pub type AcceleratedNbodyPropagator = NbodyPropagator<AcceleratedMultipoleHolder>;

impl<H: MultipoleHolder> NbodyPropagator<H> {
    /// Create a propagator after validating `config`.
    ///
    /// Only the positional fields are conserved; see
    /// [`with_conserved`](NbodyPropagator::with_conserved).
    pub fn new(config: PropagatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            conserved: FieldSet::positional(),
            holder: H::with_params(config.theta, config.leaf_size),
            last_metrics: StepMetrics::default(),
        })
    }

    /// Additionally conserve `fields` across steps (e.g. velocities).
    ///
    /// Fields this propagator uses as scratch cannot be conserved and
    /// are dropped from `fields`.
    pub fn with_conserved(mut self, fields: FieldSet) -> Self {
        let extra = fields.difference(&Self::scratch_fields());
        self.conserved = self.conserved.union(&extra);
        self
    }

    /// The propagator configuration.
    pub fn config(&self) -> &PropagatorConfig {
        &self.config
    }

    /// Metrics of the last successful step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// The multipole holder.
    pub fn holder(&self) -> &H {
        &self.holder
    }

    fn scratch_fields() -> FieldSet {
        FieldSet::of(&[Field::Ax, Field::Ay, Field::Az, Field::Du])
    }

    fn check_backend(data: &ParticleData) -> Result<(), StepError> {
        if data.backend() != H::BACKEND {
            return Err(StepError::BackendMismatch {
                expected: H::BACKEND,
                got: data.backend(),
            });
        }
        Ok(())
    }

    /// Fill the halo mass slots with the mass of the first owned particle
    /// so kernels never read uninitialized values there.
    fn pad_halo_mass(data: &mut ParticleData, first: usize, last: usize) -> Result<(), StepError> {
        let n = data.len();
        if first >= last {
            return Ok(());
        }
        data.transfer_to_host(first..first + 1, FieldSet::of(&[Field::M]))?;
        let boundary = data.host().column(Field::M)[first];
        data.fill(Field::M, 0..first, boundary)?;
        data.fill(Field::M, last..n, boundary)
    }
}

impl<H: MultipoleHolder, D: Domain> Propagator<D> for NbodyPropagator<H> {
    fn name(&self) -> &str {
        "nbody"
    }

    fn conserved_fields(&self) -> FieldSet {
        self.conserved
    }

    fn dependent_fields(&self) -> FieldSet {
        Self::scratch_fields()
    }

    fn activate_fields(&self, data: &mut ParticleData) {
        data.g = self.config.g;
        data.set_conserved(self.conserved);
        data.set_dependent(Self::scratch_fields());
    }

    fn sync(&mut self, domain: &mut D, data: &mut ParticleData) -> Result<(), StepError> {
        domain.sync(data, self.conserved, Self::scratch_fields())?;
        Ok(())
    }

    fn step(&mut self, domain: &mut D, data: &mut ParticleData) -> Result<StepMetrics, StepError> {
        Self::check_backend(data)?;
        let mut timer = PhaseTimer::start();

        self.sync(domain, data)?;
        timer.step("domain::sync");

        let n = domain.n_particles_with_halos();
        data.resize(n);
        data.check_lengths()?;
        let (first, last) = (domain.start_index(), domain.end_index());
        if first > last || last > n {
            return Err(StepError::InvalidOwnedRange { first, last, len: n });
        }
        Self::pad_halo_mass(data, first, last)?;
        for field in [Field::Ax, Field::Ay, Field::Az] {
            data.fill(field, first..last, 0.0)?;
        }

        self.holder.upsweep(data, domain)?;
        domain.comm().barrier()?;
        timer.step("upsweep");

        self.holder.traverse(data, domain)?;
        let egrav_local = data.egrav;
        let root = ReduceTarget::Root(self.config.root_rank);
        let egrav_global = domain
            .comm()
            .reduce(&[egrav_local], ReduceOp::Sum, root)?
            .map(|v| v[0]);
        if let Some(total) = egrav_global {
            data.egrav = total;
        }
        timer.step("gravity");

        let stats = self.holder.read_stats();
        let max_p2p_global = domain
            .comm()
            .reduce(&[stats[1]], ReduceOp::Max, root)?
            .map(|v| v[0]);

        let (phase_us, total_us) = timer.stop();
        let metrics = StepMetrics {
            phase_us,
            total_us,
            n_particles: last - first,
            egrav_local,
            egrav_global,
            stats,
            max_p2p_global,
        };

        if let Some(max_p2p_global) = max_p2p_global {
            info!(
                num_p2p = metrics.p2p_per_particle(),
                max_p2p = stats[1],
                num_m2p = metrics.m2p_per_particle(),
                max_m2p = stats[3],
                max_p2p_global,
                egrav = data.egrav,
                "gravity step"
            );
        }
        debug!(
            rank = domain.comm().rank(),
            first,
            last,
            total_us,
            "step complete"
        );
        self.last_metrics = metrics.clone();
        Ok(metrics)
    }

    fn prepare_output(
        &self,
        data: &mut ParticleData,
        first: usize,
        last: usize,
    ) -> Result<(), StepError> {
        data.transfer_to_host(first..last, self.conserved)
    }
}
