//! Multi-rank domain ordered along a Morton curve.

use cadence_comm::{Communicator, ReduceOp, ReduceTarget};
use cadence_core::{CollectiveError, Field, FieldSet, ParticleData, SyncError};
use tracing::debug;

use crate::bbox::BoundingBox;
use crate::domain::Domain;
use crate::layout::{check_columns, relayout, HaloBlock, Layout};
use crate::sfc::keys_for;

/// A domain whose ranks are ordered along a Morton curve.
///
/// Each rank keeps the particles it was given (there is no migration
/// between ranks), sorts them by key, and on every `sync` receives up to
/// `halo_width` particles from each curve neighbour: the highest-keyed
/// particles of rank `r - 1` become the left halo of rank `r`, the
/// lowest-keyed particles of rank `r + 1` its right halo.
///
/// Keys are computed against the global bounding box, which is
/// min/max-reduced across ranks on every sync.
#[derive(Debug)]
pub struct SfcDomain<C> {
    comm: C,
    halo_width: usize,
    layout: Option<Layout>,
    bbox: BoundingBox,
}

impl<C: Communicator> SfcDomain<C> {
    /// Create a domain exchanging `halo_width` particles with each neighbour.
    pub fn new(comm: C, halo_width: usize) -> Self {
        Self {
            comm,
            halo_width,
            layout: None,
            bbox: BoundingBox::unit(),
        }
    }

    /// Particles received from (and sent to) each neighbour per sync.
    pub fn halo_width(&self) -> usize {
        self.halo_width
    }

    fn global_box(&self, x: &[f64], y: &[f64], z: &[f64]) -> Result<BoundingBox, CollectiveError> {
        let local = BoundingBox::from_points(x, y, z);
        let lo = local.map_or([f64::INFINITY; 3], |b| b.min);
        let hi = local.map_or([f64::NEG_INFINITY; 3], |b| b.max);
        let min = self.comm.reduce(&lo, ReduceOp::Min, ReduceTarget::All)?;
        let max = self.comm.reduce(&hi, ReduceOp::Max, ReduceTarget::All)?;
        Ok(match (min, max) {
            (Some(min), Some(max)) if min[0] <= max[0] => {
                BoundingBox::new([min[0], min[1], min[2]], [max[0], max[1], max[2]])
            }
            // No particles on any rank.
            _ => BoundingBox::unit(),
        })
    }

    fn exchange(
        &self,
        head: HaloBlock,
        tail: HaloBlock,
        n_fields: usize,
    ) -> Result<(HaloBlock, HaloBlock), SyncError> {
        let (rank, size) = (self.comm.rank(), self.comm.size());
        let has_left = rank > 0;
        let has_right = rank + 1 < size;

        if has_left {
            self.comm.send_to(rank - 1, head.encode())?;
        }
        if has_right {
            self.comm.send_to(rank + 1, tail.encode())?;
        }
        let left = if has_left {
            HaloBlock::decode(self.comm.recv_from(rank - 1)?, n_fields)?
        } else {
            HaloBlock::empty(n_fields)
        };
        let right = if has_right {
            HaloBlock::decode(self.comm.recv_from(rank + 1)?, n_fields)?
        } else {
            HaloBlock::empty(n_fields)
        };
        Ok((left, right))
    }
}

impl<C: Communicator> Domain for SfcDomain<C> {
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
        self.bbox = self.global_box(x, y, z)?;
        let keys = keys_for(x, y, z, &self.bbox);

        let mut local: Vec<usize> = (0..keys.len()).collect();
        local.sort_by_key(|&i| keys[i]);
        let sorted_keys: Vec<u64> = local.iter().map(|&i| keys[i]).collect();
        let order: Vec<usize> = local.iter().map(|&i| owned.start + i).collect();

        let n_owned = order.len();
        let width = self.halo_width.min(n_owned);
        let head = HaloBlock::gather(store, conserved, &sorted_keys[..width], &order[..width]);
        let tail = HaloBlock::gather(
            store,
            conserved,
            &sorted_keys[n_owned - width..],
            &order[n_owned - width..],
        );
        let n_fields = conserved.len();
        let (left, right) = self.exchange(head, tail, n_fields)?;

        let layout = relayout(data, conserved, dependent, &order, sorted_keys, left, right);
        debug!(
            rank = self.comm.rank(),
            first = layout.first,
            last = layout.last,
            len = layout.len,
            "sfc domain synced"
        );
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
