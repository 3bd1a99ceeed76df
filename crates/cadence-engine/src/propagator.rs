//! The [`Propagator`] trait.

use cadence_core::{FieldSet, ParticleData, StepError};
use cadence_domain::Domain;

use crate::metrics::StepMetrics;

/// Advances one rank's particles by one macro-step.
///
/// # Contract
///
/// - [`activate_fields`](Propagator::activate_fields) is called once,
///   before the first step, on freshly loaded particle data.
/// - [`step`](Propagator::step) is collective: every rank calls it once
///   per macro-step, and any error aborts the step on that rank. There is
///   no partial-step recovery.
/// - Between steps the particle data is in the layout the last
///   [`sync`](Propagator::sync) produced.
pub trait Propagator<D: Domain> {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Fields persisted and halo-exchanged every step, including the
    /// positional fields `x, y, z, h, m`.
    fn conserved_fields(&self) -> FieldSet;

    /// Scratch fields recomputed every step.
    fn dependent_fields(&self) -> FieldSet;

    /// Declare this propagator's fields on `data` and apply its constants.
    fn activate_fields(&self, data: &mut ParticleData);

    /// Synchronize the domain for this propagator's field sets.
    fn sync(&mut self, domain: &mut D, data: &mut ParticleData) -> Result<(), StepError>;

    /// Run one macro-step.
    fn step(&mut self, domain: &mut D, data: &mut ParticleData) -> Result<StepMetrics, StepError>;

    /// Make the conserved fields over `first..last` host-visible.
    fn prepare_output(
        &self,
        data: &mut ParticleData,
        first: usize,
        last: usize,
    ) -> Result<(), StepError>;
}
