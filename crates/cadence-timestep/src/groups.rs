//! Contiguous particle groups.

use std::ops::Range;

use cadence_core::{Field, FieldStore};

/// A partition of the owned particle range into contiguous groups.
///
/// Group `g` covers `group_start[g]..group_end[g]`. Groups are ordered,
/// non-overlapping and lie within `first_body..last_body`. Rebuilt every
/// macro-step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupView {
    /// First particle covered by any group.
    pub first_body: usize,
    /// One past the last particle covered by any group.
    pub last_body: usize,
    /// Start index of each group.
    pub group_start: Vec<usize>,
    /// End index (exclusive) of each group.
    pub group_end: Vec<usize>,
}

impl GroupView {
    /// Split `first..last` into consecutive groups of `target_size`
    /// particles; the final group takes the remainder.
    ///
    /// A `target_size` of zero is treated as one.
    ///
    /// # Examples
    ///
    /// ```
    /// use cadence_timestep::GroupView;
    ///
    /// let groups = GroupView::fixed_size(5, 15, 4);
    /// assert_eq!(groups.num_groups(), 3);
    /// assert_eq!(groups.range(2), 13..15);
    /// ```
    pub fn fixed_size(first: usize, last: usize, target_size: usize) -> Self {
        let size = target_size.max(1);
        let last = last.max(first);
        let group_start: Vec<usize> = (first..last).step_by(size).collect();
        let group_end = group_start.iter().map(|&s| (s + size).min(last)).collect();
        Self {
            first_body: first,
            last_body: last,
            group_start,
            group_end,
        }
    }

    /// Number of groups.
    pub fn num_groups(&self) -> usize {
        self.group_start.len()
    }

    /// Particle index range of group `g`.
    pub fn range(&self, g: usize) -> Range<usize> {
        self.group_start[g]..self.group_end[g]
    }

    /// Number of particles in group `g`.
    pub fn size(&self, g: usize) -> usize {
        self.group_end[g] - self.group_start[g]
    }

    /// Axis-aligned bounds `(min, max)` of group `g`'s positions, or
    /// `None` for an empty group.
    pub fn bounding_box(&self, store: &FieldStore, g: usize) -> Option<([f64; 3], [f64; 3])> {
        let range = self.range(g);
        if range.is_empty() {
            return None;
        }
        let columns = [
            store.column(Field::X),
            store.column(Field::Y),
            store.column(Field::Z),
        ];
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for i in range {
            for (k, column) in columns.iter().enumerate() {
                min[k] = min[k].min(column[i]);
                max[k] = max[k].max(column[i]);
            }
        }
        Some((min, max))
    }
}
