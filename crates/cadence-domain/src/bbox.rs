//! Axis-aligned bounding boxes.

/// An axis-aligned box in three dimensions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Lower corner.
    pub min: [f64; 3],
    /// Upper corner.
    pub max: [f64; 3],
}

impl BoundingBox {
    /// Create a box from its corners.
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self { min, max }
    }

    /// The unit cube `[0, 1]³`.
    pub fn unit() -> Self {
        Self::new([0.0; 3], [1.0; 3])
    }

    /// The tightest box around the given points, or `None` if there are none.
    ///
    /// The three slices must have equal length.
    pub fn from_points(x: &[f64], y: &[f64], z: &[f64]) -> Option<Self> {
        if x.is_empty() {
            return None;
        }
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for ((&px, &py), &pz) in x.iter().zip(y).zip(z) {
            for (k, v) in [px, py, pz].into_iter().enumerate() {
                min[k] = min[k].min(v);
                max[k] = max[k].max(v);
            }
        }
        Some(Self { min, max })
    }

    /// Smallest box containing both.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min: std::array::from_fn(|k| self.min[k].min(other.min[k])),
            max: std::array::from_fn(|k| self.max[k].max(other.max[k])),
        }
    }

    /// Center point.
    pub fn center(&self) -> [f64; 3] {
        std::array::from_fn(|k| 0.5 * (self.min[k] + self.max[k]))
    }

    /// Edge lengths.
    pub fn extent(&self) -> [f64; 3] {
        std::array::from_fn(|k| self.max[k] - self.min[k])
    }

    /// The enclosing cube as `(center, half_width)`.
    ///
    /// A degenerate box (all points coincide) yields a cube of half-width
    /// `0.5` so that octants stay well defined.
    pub fn cube(&self) -> ([f64; 3], f64) {
        let [ex, ey, ez] = self.extent();
        let half = 0.5 * ex.max(ey).max(ez);
        (self.center(), if half > 0.0 { half } else { 0.5 })
    }

    /// Whether `p` lies inside or on the boundary.
    pub fn contains(&self, p: [f64; 3]) -> bool {
        (0..3).all(|k| self.min[k] <= p[k] && p[k] <= self.max[k])
    }
}
