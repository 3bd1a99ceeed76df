//! Single-rank domain with fixed halo padding.

use cadence_comm::{Communicator, SerialComm};
use cadence_core::{Field, FieldSet, ParticleData, SyncError};
use tracing::trace;

use crate::bbox::BoundingBox;
use crate::domain::Domain;
use crate::layout::{check_columns, relayout, HaloBlock, Layout};
use crate::sfc::keys_for;

/// A domain that owns every particle and reserves a fixed number of
/// halo slots on each side.
///
/// There are no peers to exchange with: halo slots are zero after
/// `sync`, and particle order is preserved. Useful for single-process
/// runs and for exercising the padding behaviour of propagators.
///
/// # Examples
///
/// ```
/// use cadence_core::{Backend, Field, FieldSet, ParticleData};
/// use cadence_domain::{Domain, LocalDomain};
///
/// let mut data = ParticleData::new(Backend::Host);
/// for field in FieldSet::positional().iter() {
///     data.load(field, vec![0.5; 15]);
/// }
/// let mut domain = LocalDomain::new(5, 3);
/// domain.sync(&mut data, FieldSet::empty(), FieldSet::empty()).unwrap();
/// assert_eq!((domain.start_index(), domain.end_index()), (5, 20));
/// assert_eq!(domain.n_particles_with_halos(), 23);
/// assert_eq!(data.len(), 23);
/// ```
#[derive(Debug)]
pub struct LocalDomain<C = SerialComm> {
    comm: C,
    left_halo: usize,
    right_halo: usize,
    layout: Option<Layout>,
    bbox: BoundingBox,
}

impl LocalDomain<SerialComm> {
    /// A single-rank domain with `left_halo` and `right_halo` padding slots.
    pub fn new(left_halo: usize, right_halo: usize) -> Self {
        Self::with_comm(SerialComm, left_halo, right_halo)
    }
}

impl<C: Communicator> LocalDomain<C> {
    /// Like [`new`](LocalDomain::new) but with a caller-supplied
    /// single-rank communicator.
    pub fn with_comm(comm: C, left_halo: usize, right_halo: usize) -> Self {
        Self {
            comm,
            left_halo,
            right_halo,
            layout: None,
            bbox: BoundingBox::unit(),
        }
    }
}

impl<C: Communicator> Domain for LocalDomain<C> {
    type Comm = C;

    fn comm(&self) -> &C {
        &self.comm
    }

    fn sync(
        &mut self,
        data: &mut ParticleData,
        conserved: FieldSet,
        dependent: FieldSet,
    ) -> Result<(), SyncError> {
        let conserved = conserved.union(&FieldSet::positional());
        let n = data.len();
        let owned = self.layout.map_or(0..n, |l| l.owned_in(n));
        let store = data.store();
        check_columns(store, conserved, n)?;

        let x = &store.column(Field::X)[owned.clone()];
        let y = &store.column(Field::Y)[owned.clone()];
        let z = &store.column(Field::Z)[owned.clone()];
        self.bbox = BoundingBox::from_points(x, y, z).unwrap_or_else(BoundingBox::unit);
        let keys = keys_for(x, y, z, &self.bbox);

        let order: Vec<usize> = owned.collect();
        let n_fields = conserved.len();
        let layout = relayout(
            data,
            conserved,
            dependent,
            &order,
            keys,
            HaloBlock::padding(self.left_halo, n_fields),
            HaloBlock::padding(self.right_halo, n_fields),
        );
        trace!(first = layout.first, last = layout.last, len = layout.len, "local domain synced");
        self.layout = Some(layout);
        Ok(())
    }

    fn start_index(&self) -> usize {
        self.layout.map_or(0, |l| l.first)
    }

    fn end_index(&self) -> usize {
        self.layout.map_or(0, |l| l.last)
    }

    fn n_particles_with_halos(&self) -> usize {
        self.layout.map_or(0, |l| l.len)
    }

    fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }
}
