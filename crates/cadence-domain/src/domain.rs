//! The [`Domain`] trait.

use cadence_comm::Communicator;
use cadence_core::{FieldSet, ParticleData, SyncError};

use crate::bbox::BoundingBox;

/// A rank's view of the particle decomposition.
///
/// # Contract
///
/// After a successful [`sync`](Domain::sync):
///
/// - every conserved field and the keys in the compute store have length
///   [`n_particles_with_halos`](Domain::n_particles_with_halos);
/// - `start_index() <= end_index() <= n_particles_with_halos()`, and the
///   owned particles occupy `start_index()..end_index()`;
/// - dependent fields have the same length; their contents are scratch.
///
/// `sync` is collective: every rank of the domain's communicator must
/// call it in the same step.
pub trait Domain {
    /// The communicator this domain's ranks coordinate through.
    type Comm: Communicator;

    /// This rank's communicator.
    fn comm(&self) -> &Self::Comm;

    /// Re-establish the owned range and exchange halos of `conserved`
    /// fields with peer ranks. The positional fields are always treated
    /// as conserved.
    fn sync(
        &mut self,
        data: &mut ParticleData,
        conserved: FieldSet,
        dependent: FieldSet,
    ) -> Result<(), SyncError>;

    /// First owned index.
    fn start_index(&self) -> usize;

    /// One past the last owned index.
    fn end_index(&self) -> usize;

    /// Number of owned particles.
    fn n_particles(&self) -> usize {
        self.end_index() - self.start_index()
    }

    /// Owned plus halo particles.
    fn n_particles_with_halos(&self) -> usize;

    /// The box containing every particle of the decomposition.
    fn bounding_box(&self) -> BoundingBox;
}
