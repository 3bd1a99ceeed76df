//! Multi-rank halo exchange through `SfcDomain`.

use cadence_comm::Communicator;
use cadence_core::{Backend, Field, FieldSet};
use cadence_domain::{Domain, SfcDomain};
use cadence_test_utils::{run_ranks, ParticleCloud};

struct RankView {
    first: usize,
    last: usize,
    len: usize,
    m: Vec<f64>,
    keys: Vec<u64>,
}

fn sync_ranks(size: usize, per_rank: usize, width: usize, syncs: usize) -> Vec<RankView> {
    run_ranks(size, |comm| {
        let rank = comm.rank();
        let mut cloud = ParticleCloud::uniform_cube(per_rank, 0.01, 100 + rank as u64);
        // Slab per rank along x so neighbours are spatially adjacent.
        for x in &mut cloud.x {
            *x = (*x + rank as f64) / size as f64;
        }
        cloud.m = (0..per_rank).map(|i| (rank * 1000 + i) as f64).collect();
        let mut data = cloud.into_data(Backend::Host, FieldSet::of(&[Field::Ax]));
        let mut domain = SfcDomain::new(comm, width);
        for _ in 0..syncs {
            domain
                .sync(&mut data, FieldSet::empty(), FieldSet::of(&[Field::Ax]))
                .unwrap();
        }
        assert_eq!(data.store().column(Field::Ax).len(), domain.n_particles_with_halos());
        RankView {
            first: domain.start_index(),
            last: domain.end_index(),
            len: domain.n_particles_with_halos(),
            m: data.store().column(Field::M).to_vec(),
            keys: data.store().keys().to_vec(),
        }
    })
}

#[test]
fn layout_reserves_halos_from_curve_neighbours() {
    let views = sync_ranks(3, 10, 2, 1);
    let layouts: Vec<_> = views.iter().map(|v| (v.first, v.last, v.len)).collect();
    assert_eq!(layouts, vec![(0, 10, 12), (2, 12, 14), (2, 12, 12)]);
}

#[test]
fn halos_hold_neighbour_boundary_particles() {
    let views = sync_ranks(3, 10, 2, 1);
    for r in 1..3 {
        let (left, right) = (&views[r - 1], &views[r]);
        // Left halo of r is the tail of r-1's owned range.
        assert_eq!(right.m[..right.first], left.m[left.last - 2..left.last]);
        assert_eq!(right.keys[..right.first], left.keys[left.last - 2..left.last]);
        // Right halo of r-1 is the head of r's owned range.
        assert_eq!(left.m[left.last..], right.m[right.first..right.first + 2]);
    }
}

#[test]
fn owned_particles_are_key_sorted_and_preserved() {
    let views = sync_ranks(2, 25, 3, 1);
    for (rank, v) in views.iter().enumerate() {
        let owned_keys = &v.keys[v.first..v.last];
        assert!(owned_keys.windows(2).all(|w| w[0] <= w[1]));
        let mut owned_m = v.m[v.first..v.last].to_vec();
        owned_m.sort_by(f64::total_cmp);
        let expected: Vec<f64> = (0..25).map(|i| (rank * 1000 + i) as f64).collect();
        assert_eq!(owned_m, expected);
    }
}

#[test]
fn repeated_sync_is_stable() {
    let once = sync_ranks(3, 8, 2, 1);
    let thrice = sync_ranks(3, 8, 2, 3);
    for (a, b) in once.iter().zip(&thrice) {
        assert_eq!((a.first, a.last, a.len), (b.first, b.last, b.len));
        assert_eq!(a.m, b.m);
        assert_eq!(a.keys, b.keys);
    }
}

#[test]
fn halo_wider_than_neighbour_takes_what_exists() {
    let views = sync_ranks(2, 3, 5, 1);
    assert_eq!((views[0].first, views[0].last, views[0].len), (0, 3, 6));
    assert_eq!((views[1].first, views[1].last, views[1].len), (3, 6, 6));
}

#[test]
fn single_rank_has_no_halos() {
    let views = sync_ranks(1, 6, 4, 2);
    assert_eq!((views[0].first, views[0].last, views[0].len), (0, 6, 6));
}
