//! Morton (Z-order) space-filling-curve keys.

use crate::bbox::BoundingBox;

/// Bits of resolution per dimension; keys use the low 63 bits.
pub const KEY_BITS_PER_DIM: u32 = 21;

const CELLS_PER_DIM: u64 = 1 << KEY_BITS_PER_DIM;

/// Spread the low 21 bits of `v` so that bit `i` lands at bit `3i`.
fn spread(v: u64) -> u64 {
    let mut x = v & (CELLS_PER_DIM - 1);
    x = (x | x << 32) & 0x001f_0000_0000_ffff;
    x = (x | x << 16) & 0x001f_0000_ff00_00ff;
    x = (x | x << 8) & 0x100f_00f0_0f00_f00f;
    x = (x | x << 4) & 0x10c3_0c30_c30c_30c3;
    x = (x | x << 2) & 0x1249_2492_4924_9249;
    x
}

/// Morton key of point `p` within the enclosing cube of `bbox`.
///
/// Points outside the cube are clamped onto its surface.
pub fn morton_key(p: [f64; 3], bbox: &BoundingBox) -> u64 {
    let (center, half) = bbox.cube();
    let scale = CELLS_PER_DIM as f64 / (2.0 * half);
    let cell = |k: usize| -> u64 {
        let t = ((p[k] - (center[k] - half)) * scale).floor();
        t.clamp(0.0, (CELLS_PER_DIM - 1) as f64) as u64
    };
    spread(cell(0)) << 2 | spread(cell(1)) << 1 | spread(cell(2))
}

/// Morton keys for a set of points.
pub(crate) fn keys_for(x: &[f64], y: &[f64], z: &[f64], bbox: &BoundingBox) -> Vec<u64> {
    x.iter()
        .zip(y)
        .zip(z)
        .map(|((&px, &py), &pz)| morton_key([px, py, pz], bbox))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn spread_interleaves() {
        assert_eq!(spread(0b1), 0b1);
        assert_eq!(spread(0b11), 0b1001);
        assert_eq!(spread(0b101), 0b100_0001);
    }

    #[test]
    fn corners_map_to_extreme_keys() {
        let b = BoundingBox::unit();
        assert_eq!(morton_key([0.0; 3], &b), 0);
        assert_eq!(morton_key([1.0; 3], &b), (1u64 << 63) - 1);
    }

    #[test]
    fn x_is_the_most_significant_axis() {
        let b = BoundingBox::unit();
        let kx = morton_key([0.75, 0.0, 0.0], &b);
        let ky = morton_key([0.0, 0.75, 0.0], &b);
        let kz = morton_key([0.0, 0.0, 0.75], &b);
        assert!(kx > ky && ky > kz);
    }

    proptest! {
        #[test]
        fn keys_fit_in_63_bits(x in -2.0f64..2.0, y in -2.0f64..2.0, z in -2.0f64..2.0) {
            let k = morton_key([x, y, z], &BoundingBox::unit());
            prop_assert!(k < 1u64 << 63);
        }

        #[test]
        fn octant_is_the_top_key_bits(x in 0.0f64..1.0, y in 0.0f64..1.0, z in 0.0f64..1.0) {
            let k = morton_key([x, y, z], &BoundingBox::unit());
            let octant = (u64::from(x >= 0.5) << 2) | (u64::from(y >= 0.5) << 1) | u64::from(z >= 0.5);
            prop_assert_eq!(k >> 60, octant);
        }
    }
}
