//! Benchmark profiles for the Cadence time-advancement core.
//!
//! - [`clustered_profile`]: particles in a few dense clumps, activated for
//!   the N-body propagator
//! - [`skewed_group_dt`]: log-uniform group timesteps spanning several rungs

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use cadence_core::{Backend, Field, ParticleData};
use cadence_domain::LocalDomain;
use cadence_engine::{NbodyPropagator, Propagator};
use cadence_gravity::MultipoleHolder;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Build `n` particles in four Gaussian-ish clumps inside the unit cube,
/// with fields activated for `prop`.
pub fn clustered_profile<H: MultipoleHolder>(
    n: usize,
    seed: u64,
    backend: Backend,
    prop: &NbodyPropagator<H>,
) -> ParticleData {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let centers = [[0.25, 0.25, 0.25], [0.75, 0.3, 0.6], [0.4, 0.8, 0.3], [0.7, 0.7, 0.8]];
    let mut pos = [Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n)];
    for i in 0..n {
        let c = centers[i % centers.len()];
        for k in 0..3 {
            // Bell-shaped offset from a sum of uniforms.
            let offset: f64 = (0..4).map(|_| rng.random_range(-0.05..0.05)).sum();
            pos[k].push(c[k] + offset);
        }
    }
    let mut data = ParticleData::new(backend);
    <NbodyPropagator<H> as Propagator<LocalDomain>>::activate_fields(prop, &mut data);
    let [x, y, z] = pos;
    data.load(Field::X, x);
    data.load(Field::Y, y);
    data.load(Field::Z, z);
    data.load(Field::H, vec![0.005; n]);
    data.load(Field::M, vec![1.0 / n as f64; n]);
    for field in data.dependent().iter() {
        data.load(field, vec![0.0; n]);
    }
    data.load_keys(vec![0; n]);
    data
}

/// `n` group timesteps distributed log-uniformly over `[1e-4, 1e-2)`.
pub fn skewed_group_dt(n: usize, seed: u64) -> Vec<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| 10f32.powf(rng.random_range(-4.0f32..-2.0)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_engine::{HostNbodyPropagator, PropagatorConfig};

    #[test]
    fn profile_is_deterministic_and_complete() {
        let prop = HostNbodyPropagator::new(PropagatorConfig::default()).unwrap();
        let a = clustered_profile(100, 7, Backend::Host, &prop);
        let b = clustered_profile(100, 7, Backend::Host, &prop);
        assert_eq!(a.store(), b.store());
        assert!(a.check_lengths().is_ok());
        assert_eq!(a.len(), 100);
    }

    #[test]
    fn skewed_dt_stays_in_range() {
        let dt = skewed_group_dt(1000, 3);
        assert!(dt.iter().all(|&v| (0.9e-4..=1.1e-2).contains(&v)));
    }
}
