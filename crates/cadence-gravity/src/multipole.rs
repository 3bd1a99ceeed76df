//! Traceless Cartesian quadrupole moments and the kernels that use them.
//!
//! The quadrupole of a set of point masses about their center of mass is
//! `Q_ab = Σ m (3 d_a d_b - |d|² δ_ab)`, stored as
//! `[xx, xy, xz, yy, yz, zz]`. Softening is Plummer-style: `|r|²` is
//! replaced by `|r|² + eps²` in every kernel.

/// Mass, center of mass and quadrupole of a set of particles.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Multipole {
    /// Total mass.
    pub mass: f64,
    /// Center of mass.
    pub com: [f64; 3],
    /// Traceless quadrupole about `com`: `[xx, xy, xz, yy, yz, zz]`.
    pub quad: [f64; 6],
}

/// Accumulate `m (3 d d - |d|² I)` into `quad`.
fn add_outer(quad: &mut [f64; 6], m: f64, d: [f64; 3]) {
    let d2 = d[0] * d[0] + d[1] * d[1] + d[2] * d[2];
    quad[0] += m * (3.0 * d[0] * d[0] - d2);
    quad[1] += m * 3.0 * d[0] * d[1];
    quad[2] += m * 3.0 * d[0] * d[2];
    quad[3] += m * (3.0 * d[1] * d[1] - d2);
    quad[4] += m * 3.0 * d[1] * d[2];
    quad[5] += m * (3.0 * d[2] * d[2] - d2);
}

impl Multipole {
    /// P2M: moments of particles given as parallel slices.
    pub fn from_particles(x: &[f64], y: &[f64], z: &[f64], m: &[f64]) -> Self {
        let mass: f64 = m.iter().sum();
        if mass == 0.0 {
            return Self::default();
        }
        let mut com = [0.0; 3];
        for i in 0..m.len() {
            com[0] += m[i] * x[i];
            com[1] += m[i] * y[i];
            com[2] += m[i] * z[i];
        }
        com = com.map(|c| c / mass);

        let mut quad = [0.0; 6];
        for i in 0..m.len() {
            add_outer(&mut quad, m[i], [x[i] - com[0], y[i] - com[1], z[i] - com[2]]);
        }
        Self { mass, com, quad }
    }

    /// M2M: shift child moments to their common center of mass and sum.
    pub fn combine(children: &[Multipole]) -> Self {
        let mass: f64 = children.iter().map(|c| c.mass).sum();
        if mass == 0.0 {
            return Self::default();
        }
        let mut com = [0.0; 3];
        for c in children {
            for k in 0..3 {
                com[k] += c.mass * c.com[k];
            }
        }
        com = com.map(|v| v / mass);

        let mut quad = [0.0; 6];
        for c in children {
            for k in 0..6 {
                quad[k] += c.quad[k];
            }
            add_outer(&mut quad, c.mass, [c.com[0] - com[0], c.com[1] - com[1], c.com[2] - com[2]]);
        }
        Self { mass, com, quad }
    }

    /// M2P: acceleration and potential at offset `d = target - com`.
    pub fn m2p(&self, d: [f64; 3], eps2: f64, g: f64) -> ([f64; 3], f64) {
        let r2 = d[0] * d[0] + d[1] * d[1] + d[2] * d[2] + eps2;
        let rinv = 1.0 / r2.sqrt();
        let rinv2 = rinv * rinv;
        let rinv3 = rinv * rinv2;
        let rinv5 = rinv3 * rinv2;
        let rinv7 = rinv5 * rinv2;

        let q = &self.quad;
        let qd = [
            q[0] * d[0] + q[1] * d[1] + q[2] * d[2],
            q[1] * d[0] + q[3] * d[1] + q[4] * d[2],
            q[2] * d[0] + q[4] * d[1] + q[5] * d[2],
        ];
        let dqd = d[0] * qd[0] + d[1] * qd[1] + d[2] * qd[2];

        let phi = -g * (self.mass * rinv + 0.5 * dqd * rinv5);
        let acc = std::array::from_fn(|k| {
            g * (-self.mass * d[k] * rinv3 + qd[k] * rinv5 - 2.5 * dqd * d[k] * rinv7)
        });
        (acc, phi)
    }
}

/// P2P: acceleration and potential at offset `d = source - target` from a
/// point mass `m`. Returns zeros for coincident unsoftened particles.
pub fn p2p(d: [f64; 3], m: f64, eps2: f64, g: f64) -> ([f64; 3], f64) {
    let r2 = d[0] * d[0] + d[1] * d[1] + d[2] * d[2] + eps2;
    if r2 == 0.0 {
        return ([0.0; 3], 0.0);
    }
    let rinv = 1.0 / r2.sqrt();
    let rinv3 = rinv * rinv * rinv;
    (d.map(|dk| g * m * dk * rinv3), -g * m * rinv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cadence_test_utils::ParticleCloud;

    fn moments(c: &ParticleCloud) -> Multipole {
        Multipole::from_particles(&c.x, &c.y, &c.z, &c.m)
    }

    #[test]
    fn p2m_mass_and_center() {
        let m = Multipole::from_particles(&[0.0, 3.0], &[0.0, 0.0], &[1.0, 1.0], &[2.0, 1.0]);
        assert_eq!(m.mass, 3.0);
        assert_eq!(m.com, [1.0, 0.0, 1.0]);
    }

    #[test]
    fn quadrupole_is_traceless() {
        let m = moments(&ParticleCloud::cluster(50, [1.0, 2.0, 3.0], 0.5, 9));
        assert!((m.quad[0] + m.quad[3] + m.quad[5]).abs() < 1e-12);
    }

    #[test]
    fn m2m_matches_direct_p2m() {
        let cloud = ParticleCloud::cluster(40, [0.0; 3], 1.0, 4);
        let parts = cloud.split(3);
        let children: Vec<Multipole> = parts.iter().map(moments).collect();
        let combined = Multipole::combine(&children);
        let direct = moments(&cloud);
        assert_relative_eq!(combined.mass, direct.mass, epsilon = 1e-12);
        for k in 0..3 {
            assert_relative_eq!(combined.com[k], direct.com[k], epsilon = 1e-12);
        }
        for k in 0..6 {
            assert_relative_eq!(combined.quad[k], direct.quad[k], epsilon = 1e-10);
        }
    }

    #[test]
    fn far_field_matches_direct_sum() {
        let cloud = ParticleCloud::cluster(64, [0.0; 3], 0.1, 11);
        let mp = moments(&cloud);
        let target = [5.0, -1.0, 2.0];

        let mut acc = [0.0; 3];
        let mut phi = 0.0;
        for i in 0..cloud.len() {
            let d = [cloud.x[i] - target[0], cloud.y[i] - target[1], cloud.z[i] - target[2]];
            let (a, p) = p2p(d, cloud.m[i], 0.0, 1.0);
            for k in 0..3 {
                acc[k] += a[k];
            }
            phi += p;
        }

        let d = [target[0] - mp.com[0], target[1] - mp.com[1], target[2] - mp.com[2]];
        let (approx_acc, approx_phi) = mp.m2p(d, 0.0, 1.0);
        for k in 0..3 {
            assert_relative_eq!(approx_acc[k], acc[k], max_relative = 1e-4);
        }
        assert_relative_eq!(approx_phi, phi, max_relative = 1e-5);
    }

    #[test]
    fn quadrupole_improves_on_monopole() {
        let cloud = ParticleCloud::cluster(32, [0.0; 3], 0.5, 2);
        let mp = moments(&cloud);
        let monopole = Multipole { quad: [0.0; 6], ..mp };
        let target = [3.0, 0.5, 0.0];
        let d = [target[0] - mp.com[0], target[1] - mp.com[1], target[2] - mp.com[2]];

        let mut exact = 0.0;
        for i in 0..cloud.len() {
            let s = [cloud.x[i] - target[0], cloud.y[i] - target[1], cloud.z[i] - target[2]];
            exact += p2p(s, cloud.m[i], 0.0, 1.0).1;
        }
        let err_quad = (mp.m2p(d, 0.0, 1.0).1 - exact).abs();
        let err_mono = (monopole.m2p(d, 0.0, 1.0).1 - exact).abs();
        assert!(err_quad < err_mono);
    }

    #[test]
    fn p2p_two_body_and_softening() {
        let (a, phi) = p2p([1.0, 0.0, 0.0], 2.0, 0.0, 1.0);
        assert_eq!(a, [2.0, 0.0, 0.0]);
        assert_eq!(phi, -2.0);
        let (a, phi) = p2p([0.0; 3], 1.0, 0.0, 1.0);
        assert_eq!((a, phi), ([0.0; 3], 0.0));
        let (_, soft) = p2p([0.0; 3], 1.0, 0.25, 1.0);
        assert_eq!(soft, -2.0);
    }
}
