//! The multipole holder: per-step tree lifecycle and traversal.

use std::marker::PhantomData;
use std::ops::Range;

use cadence_comm::Communicator;
use cadence_core::{Backend, Executor, Field, Parallel, ParticleData, Serial, StepError};
use cadence_domain::Domain;
use tracing::debug;

use crate::octree::{Interaction, Octree, Target};

/// Builds and evaluates a gravity approximation once per macro-step.
///
/// # Contract
///
/// - [`upsweep`](MultipoleHolder::upsweep) is collective over the
///   domain's communicator and must be called on every rank.
/// - [`traverse`](MultipoleHolder::traverse) consumes the hierarchy the
///   preceding upsweep built. A second traverse without a new upsweep
///   fails with [`StepError::MissingUpsweep`]; moments are never reused
///   across steps.
/// - Traversal adds into `ax, ay, az` over the owned range and
///   overwrites [`ParticleData::egrav`] with the local potential energy.
pub trait MultipoleHolder: Send {
    /// The backend whose particle data this holder accepts.
    const BACKEND: Backend;

    /// Create a holder with opening angle `theta` and at most `leaf_size`
    /// particles per leaf.
    fn with_params(theta: f64, leaf_size: usize) -> Self;

    /// Build the hierarchy over the owned particles and exchange it with
    /// peer ranks.
    fn upsweep<D: Domain>(&mut self, data: &ParticleData, domain: &D) -> Result<(), StepError>;

    /// Evaluate acceleration and potential for every owned particle.
    fn traverse<D: Domain>(&mut self, data: &mut ParticleData, domain: &D)
        -> Result<(), StepError>;

    /// Interaction counters from the last traversal:
    /// `[p2p_local, p2p_max, m2p_local, m2p_max]`, where `*_local` sums
    /// over owned particles and `*_max` is the per-particle maximum.
    fn read_stats(&self) -> [u64; 4];
}

/// The local tree plus every peer's tree, in rank order.
#[derive(Debug)]
struct Forest {
    local: Octree,
    remote: Vec<Octree>,
}

/// Octree quadrupole gravity, traversed with executor `E`.
///
/// Each rank builds a tree over its owned particles only and the upsweep
/// `all_gather`s every rank's encoded tree, leaf particles included.
/// Halo slots never enter a tree, so halo contents cannot be counted
/// twice. The price is that every rank receives O(N_global) words per
/// step and holds the whole particle set during traversal.
#[derive(Debug)]
pub struct OctreeMultipoles<E> {
    theta: f64,
    leaf_size: usize,
    forest: Option<Forest>,
    stats: [u64; 4],
    _exec: PhantomData<E>,
}

/// Serial traversal over the host store.
pub type HostMultipoleHolder = OctreeMultipoles<Serial>;

/// Rayon-parallel traversal over the device store.
pub type AcceleratedMultipoleHolder = OctreeMultipoles<Parallel>;

impl<E: Executor> OctreeMultipoles<E> {
    /// Opening angle.
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Maximum particles per leaf.
    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Node count of the local tree, if an upsweep is pending traversal.
    pub fn local_nodes(&self) -> Option<usize> {
        self.forest.as_ref().map(|f| f.local.nodes().len())
    }

    fn check_backend(data: &ParticleData) -> Result<(), StepError> {
        if data.backend() != E::BACKEND {
            return Err(StepError::BackendMismatch {
                expected: E::BACKEND,
                got: data.backend(),
            });
        }
        Ok(())
    }

    fn owned_range<D: Domain>(data: &ParticleData, domain: &D) -> Result<Range<usize>, StepError> {
        let (first, last, len) = (domain.start_index(), domain.end_index(), data.len());
        if first > last || last > len {
            return Err(StepError::InvalidOwnedRange { first, last, len });
        }
        Ok(first..last)
    }

    /// Every column in `fields` must span the full particle array.
    fn check_columns(data: &ParticleData, fields: &[Field]) -> Result<(), StepError> {
        let expected = data.len();
        for &field in fields {
            let got = data.store().column(field).len();
            if got != expected {
                return Err(StepError::LengthMismatch {
                    field,
                    expected,
                    got,
                });
            }
        }
        Ok(())
    }
}

const SOURCE_FIELDS: [Field; 5] = [Field::X, Field::Y, Field::Z, Field::H, Field::M];
const ACC_FIELDS: [Field; 3] = [Field::Ax, Field::Ay, Field::Az];

impl<E: Executor> MultipoleHolder for OctreeMultipoles<E> {
    const BACKEND: Backend = E::BACKEND;

    fn with_params(theta: f64, leaf_size: usize) -> Self {
        Self {
            theta,
            leaf_size,
            forest: None,
            stats: [0; 4],
            _exec: PhantomData,
        }
    }

    fn upsweep<D: Domain>(&mut self, data: &ParticleData, domain: &D) -> Result<(), StepError> {
        Self::check_backend(data)?;
        let owned = Self::owned_range(data, domain)?;
        Self::check_columns(data, &SOURCE_FIELDS)?;
        let store = data.store();
        let col = |f: Field| &store.column(f)[owned.clone()];

        let mut local = Octree::build(
            col(Field::X),
            col(Field::Y),
            col(Field::Z),
            col(Field::H),
            col(Field::M),
            self.leaf_size,
        );
        local.upsweep();

        let comm = domain.comm();
        let me = comm.rank();
        let gathered = comm.all_gather(&local.encode())?;
        let remote = gathered
            .iter()
            .enumerate()
            .filter(|&(rank, _)| rank != me)
            .map(|(_, words)| Octree::decode(words))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            rank = me,
            nodes = local.nodes().len(),
            particles = local.len(),
            remote_trees = remote.len(),
            "upsweep complete"
        );
        self.forest = Some(Forest { local, remote });
        Ok(())
    }

    fn traverse<D: Domain>(
        &mut self,
        data: &mut ParticleData,
        domain: &D,
    ) -> Result<(), StepError> {
        Self::check_backend(data)?;
        let owned = Self::owned_range(data, domain)?;
        Self::check_columns(data, &SOURCE_FIELDS)?;
        Self::check_columns(data, &ACC_FIELDS)?;
        let forest = self.forest.take().ok_or(StepError::MissingUpsweep)?;
        if forest.local.len() != owned.len() {
            return Err(StepError::InvalidOwnedRange {
                first: owned.start,
                last: owned.end,
                len: data.len(),
            });
        }

        let theta2 = self.theta * self.theta;
        let g = data.g;
        let first = owned.start;
        let store = data.store();
        let (x, y, z, h) = (
            store.column(Field::X),
            store.column(Field::Y),
            store.column(Field::Z),
            store.column(Field::H),
        );
        let results: Vec<Interaction> = E::map_range(owned.clone(), |i| {
            let target = Target {
                pos: [x[i], y[i], z[i]],
                h: h[i],
                skip: forest.local.slot_of(i - first),
            };
            let mut out = forest.local.walk(&target, theta2, g);
            let remote_target = Target { skip: None, ..target };
            for tree in &forest.remote {
                out.merge(&tree.walk(&remote_target, theta2, g));
            }
            out
        });

        let m = &store.column(Field::M)[owned.clone()];
        let egrav = 0.5
            * results
                .iter()
                .zip(m)
                .map(|(r, &mi)| mi * r.phi)
                .sum::<f64>();
        let mut stats = [0u64; 4];
        for r in &results {
            stats[0] += r.p2p;
            stats[1] = stats[1].max(r.p2p);
            stats[2] += r.m2p;
            stats[3] = stats[3].max(r.m2p);
        }

        let store = data.store_mut();
        for (axis, field) in ACC_FIELDS.into_iter().enumerate() {
            let column = &mut store.column_mut(field)[owned.clone()];
            for (a, r) in column.iter_mut().zip(&results) {
                *a += r.acc[axis];
            }
        }
        data.egrav = egrav;
        self.stats = stats;
        Ok(())
    }

    fn read_stats(&self) -> [u64; 4] {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cadence_core::FieldSet;
    use cadence_domain::LocalDomain;
    use cadence_test_utils::{direct_sum, ParticleCloud};

    fn acc_fields() -> FieldSet {
        FieldSet::of(&[Field::Ax, Field::Ay, Field::Az])
    }

    fn synced(cloud: ParticleCloud, backend: Backend, halo: usize) -> (ParticleData, LocalDomain) {
        let mut data = cloud.into_data(backend, acc_fields());
        let mut domain = LocalDomain::new(halo, halo);
        domain.sync(&mut data, FieldSet::empty(), acc_fields()).unwrap();
        (data, domain)
    }

    fn step<H: MultipoleHolder>(holder: &mut H, data: &mut ParticleData, domain: &LocalDomain) {
        holder.upsweep(data, domain).unwrap();
        holder.traverse(data, domain).unwrap();
    }

    #[test]
    fn two_body_matches_closed_form() {
        let (mut data, domain) = synced(ParticleCloud::two_body(), Backend::Host, 0);
        let mut holder = HostMultipoleHolder::with_params(0.5, 16);
        step(&mut holder, &mut data, &domain);

        let s = data.store();
        assert_relative_eq!(s.column(Field::Ax)[0], 2.0);
        assert_relative_eq!(s.column(Field::Ax)[1], -1.0);
        assert_eq!(s.column(Field::Ay), &[0.0, 0.0]);
        assert_relative_eq!(data.egrav, -2.0);
        assert_eq!(holder.read_stats(), [2, 1, 0, 0]);
    }

    #[test]
    fn halo_slots_are_ignored() {
        let cloud = ParticleCloud::uniform_cube(40, 0.01, 12);
        let exact = direct_sum(&cloud, 1.0);
        let (mut data, domain) = synced(cloud, Backend::Host, 3);
        // Padding with arbitrary mass must not contribute.
        data.fill(Field::M, 0..3, 7.0).unwrap();
        let mut holder = HostMultipoleHolder::with_params(0.0, 4);
        step(&mut holder, &mut data, &domain);

        let ax = data.store().column(Field::Ax);
        for i in 0..40 {
            assert_relative_eq!(ax[3 + i], exact.acc[i][0], epsilon = 1e-9, max_relative = 1e-9);
        }
        assert_eq!(ax[..3], [0.0; 3]);
        assert_relative_eq!(data.egrav, exact.egrav, max_relative = 1e-10);
    }

    #[test]
    fn host_and_accelerated_agree() {
        let cloud = ParticleCloud::uniform_cube(150, 0.02, 77);
        let (mut host, domain) = synced(cloud.clone(), Backend::Host, 0);
        let (mut device, _) = synced(cloud, Backend::Accelerated, 0);

        let mut h = HostMultipoleHolder::with_params(0.6, 8);
        let mut a = AcceleratedMultipoleHolder::with_params(0.6, 8);
        step(&mut h, &mut host, &domain);
        step(&mut a, &mut device, &domain);

        for f in [Field::Ax, Field::Ay, Field::Az] {
            assert_eq!(host.store().column(f), device.store().column(f));
        }
        assert_eq!(host.egrav, device.egrav);
        assert_eq!(h.read_stats(), a.read_stats());
    }

    #[test]
    fn traversal_accumulates_onto_existing_acceleration() {
        let (mut data, domain) = synced(ParticleCloud::two_body(), Backend::Host, 0);
        data.fill(Field::Ax, 0..2, 10.0).unwrap();
        step(&mut HostMultipoleHolder::with_params(0.5, 16), &mut data, &domain);
        assert_relative_eq!(data.store().column(Field::Ax)[0], 12.0);
        assert_relative_eq!(data.store().column(Field::Ax)[1], 9.0);
    }

    #[test]
    fn traverse_requires_fresh_upsweep() {
        let (mut data, domain) = synced(ParticleCloud::two_body(), Backend::Host, 0);
        let mut holder = HostMultipoleHolder::with_params(0.5, 16);
        assert_eq!(holder.traverse(&mut data, &domain), Err(StepError::MissingUpsweep));

        step(&mut holder, &mut data, &domain);
        assert_eq!(holder.local_nodes(), None);
        assert_eq!(holder.traverse(&mut data, &domain), Err(StepError::MissingUpsweep));
    }

    #[test]
    fn wrong_backend_is_rejected() {
        let (data, domain) = synced(ParticleCloud::two_body(), Backend::Accelerated, 0);
        let mut holder = HostMultipoleHolder::with_params(0.5, 16);
        match holder.upsweep(&data, &domain) {
            Err(StepError::BackendMismatch { expected, got }) => {
                assert_eq!(expected, Backend::Host);
                assert_eq!(got, Backend::Accelerated);
            }
            other => panic!("expected BackendMismatch, got {other:?}"),
        }
    }

    #[test]
    fn undeclared_acceleration_is_a_length_mismatch() {
        let mut data = ParticleCloud::two_body().into_data(Backend::Host, FieldSet::empty());
        let mut domain = LocalDomain::new(0, 0);
        domain.sync(&mut data, FieldSet::empty(), FieldSet::empty()).unwrap();
        let mut holder = HostMultipoleHolder::with_params(0.5, 16);
        holder.upsweep(&data, &domain).unwrap();
        assert_eq!(
            holder.traverse(&mut data, &domain),
            Err(StepError::LengthMismatch {
                field: Field::Ax,
                expected: 2,
                got: 0
            })
        );
    }

    #[test]
    fn short_mass_column_fails_upsweep() {
        let (mut data, domain) = synced(ParticleCloud::two_body(), Backend::Host, 0);
        data.store_mut().set_column(Field::M, vec![1.0]);
        let mut holder = HostMultipoleHolder::with_params(0.5, 16);
        assert_eq!(
            holder.upsweep(&data, &domain),
            Err(StepError::LengthMismatch {
                field: Field::M,
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn empty_domain_yields_zero_energy() {
        let (mut data, domain) = synced(ParticleCloud::default(), Backend::Host, 0);
        data.egrav = 5.0;
        let mut holder = HostMultipoleHolder::with_params(0.5, 16);
        step(&mut holder, &mut data, &domain);
        assert_eq!(data.egrav, 0.0);
        assert_eq!(holder.read_stats(), [0; 4]);
    }
}
