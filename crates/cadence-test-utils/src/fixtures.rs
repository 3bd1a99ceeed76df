//! Particle fixtures and reference gravity.

use cadence_core::{Backend, Field, FieldSet, ParticleData};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A set of particles in plain arrays, independent of any store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleCloud {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub h: Vec<f64>,
    pub m: Vec<f64>,
}

impl ParticleCloud {
    /// Two particles with masses 1 and 2 at unit separation along x,
    /// unsoftened.
    pub fn two_body() -> Self {
        Self {
            x: vec![0.0, 1.0],
            y: vec![0.0, 0.0],
            z: vec![0.0, 0.0],
            h: vec![0.0, 0.0],
            m: vec![1.0, 2.0],
        }
    }

    /// `n` particles uniformly distributed in the unit cube with masses
    /// in `[0.5, 1.5)` and smoothing length `h`.
    pub fn uniform_cube(n: usize, h: f64, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut cloud = Self::default();
        for _ in 0..n {
            cloud.x.push(rng.random_range(0.0..1.0));
            cloud.y.push(rng.random_range(0.0..1.0));
            cloud.z.push(rng.random_range(0.0..1.0));
            cloud.h.push(h);
            cloud.m.push(rng.random_range(0.5..1.5));
        }
        cloud
    }

    /// A tight cluster of `n` particles of radius `radius` around `center`.
    pub fn cluster(n: usize, center: [f64; 3], radius: f64, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut cloud = Self::default();
        for _ in 0..n {
            cloud.x.push(center[0] + rng.random_range(-radius..radius));
            cloud.y.push(center[1] + rng.random_range(-radius..radius));
            cloud.z.push(center[2] + rng.random_range(-radius..radius));
            cloud.h.push(0.0);
            cloud.m.push(rng.random_range(0.5..1.5));
        }
        cloud
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Contiguous sub-cloud.
    pub fn slice(&self, range: std::ops::Range<usize>) -> Self {
        Self {
            x: self.x[range.clone()].to_vec(),
            y: self.y[range.clone()].to_vec(),
            z: self.z[range.clone()].to_vec(),
            h: self.h[range.clone()].to_vec(),
            m: self.m[range].to_vec(),
        }
    }

    /// Split into `parts` contiguous chunks whose sizes differ by at most one.
    pub fn split(&self, parts: usize) -> Vec<Self> {
        let n = self.len();
        (0..parts)
            .map(|p| self.slice(p * n / parts..(p + 1) * n / parts))
            .collect()
    }

    /// Load into fresh particle data with the positional fields conserved,
    /// `dependent` zero-filled, and zero keys.
    pub fn into_data(self, backend: Backend, dependent: FieldSet) -> ParticleData {
        let n = self.len();
        let mut data = ParticleData::new(backend);
        data.set_dependent(dependent);
        data.load(Field::X, self.x);
        data.load(Field::Y, self.y);
        data.load(Field::Z, self.z);
        data.load(Field::H, self.h);
        data.load(Field::M, self.m);
        for field in data.dependent().iter() {
            data.load(field, vec![0.0; n]);
        }
        data.load_keys(vec![0; n]);
        data
    }
}

/// Exact pairwise gravity for a cloud.
#[derive(Clone, Debug)]
pub struct DirectSum {
    /// Acceleration per particle.
    pub acc: Vec<[f64; 3]>,
    /// Total potential energy, each pair counted once.
    pub egrav: f64,
}

/// O(n²) reference gravity with Plummer softening `max(h_i, h_j)`.
pub fn direct_sum(cloud: &ParticleCloud, g: f64) -> DirectSum {
    let n = cloud.len();
    let mut acc = vec![[0.0; 3]; n];
    let mut egrav = 0.0;
    for i in 0..n {
        let mut phi = 0.0;
        for j in (0..n).filter(|&j| j != i) {
            let d = [
                cloud.x[j] - cloud.x[i],
                cloud.y[j] - cloud.y[i],
                cloud.z[j] - cloud.z[i],
            ];
            let eps = cloud.h[i].max(cloud.h[j]);
            let r2 = d[0] * d[0] + d[1] * d[1] + d[2] * d[2] + eps * eps;
            let rinv = 1.0 / r2.sqrt();
            let rinv3 = rinv * rinv * rinv;
            for k in 0..3 {
                acc[i][k] += g * cloud.m[j] * d[k] * rinv3;
            }
            phi -= g * cloud.m[j] * rinv;
        }
        egrav += 0.5 * cloud.m[i] * phi;
    }
    DirectSum { acc, egrav }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_clouds_are_reproducible() {
        assert_eq!(
            ParticleCloud::uniform_cube(16, 0.01, 7),
            ParticleCloud::uniform_cube(16, 0.01, 7)
        );
        assert_ne!(
            ParticleCloud::uniform_cube(16, 0.01, 7),
            ParticleCloud::uniform_cube(16, 0.01, 8)
        );
    }

    #[test]
    fn split_covers_every_particle() {
        let cloud = ParticleCloud::uniform_cube(10, 0.0, 1);
        let parts = cloud.split(3);
        assert_eq!(parts.iter().map(|p| p.len()).collect::<Vec<_>>(), vec![3, 3, 4]);
        assert_eq!(parts[2].x, cloud.x[6..].to_vec());
    }

    #[test]
    fn two_body_direct_sum_is_analytic() {
        let ds = direct_sum(&ParticleCloud::two_body(), 1.0);
        assert_eq!(ds.acc[0], [2.0, 0.0, 0.0]);
        assert_eq!(ds.acc[1], [-1.0, 0.0, 0.0]);
        assert_eq!(ds.egrav, -2.0);
    }
}
