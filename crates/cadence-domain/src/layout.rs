//! Shared array relayout for domain implementations.

use std::ops::Range;

use cadence_comm::{Reducible, Scalar};
use cadence_core::{CollectiveError, FieldSet, FieldStore, ParticleData, SyncError};

/// Where the owned particles sit after a sync.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Layout {
    pub first: usize,
    pub last: usize,
    pub len: usize,
}

impl Layout {
    /// The owned slice of arrays of length `n`.
    ///
    /// Arrays still laid out by this sync yield the previous owned range;
    /// anything else is treated as all-owned.
    pub fn owned_in(&self, n: usize) -> Range<usize> {
        if n == self.len {
            self.first..self.last
        } else {
            0..n
        }
    }
}

/// Conserved values and keys for a run of particles, one column per
/// conserved field in [`FieldSet`] iteration order.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct HaloBlock {
    keys: Vec<u64>,
    columns: Vec<Vec<f64>>,
}

impl HaloBlock {
    pub fn empty(n_fields: usize) -> Self {
        Self::padding(0, n_fields)
    }

    /// `count` zero-valued slots.
    pub fn padding(count: usize, n_fields: usize) -> Self {
        Self {
            keys: vec![0; count],
            columns: vec![vec![0.0; count]; n_fields],
        }
    }

    /// Copy the particles at `indices` out of `store`.
    pub fn gather(store: &FieldStore, conserved: FieldSet, keys: &[u64], indices: &[usize]) -> Self {
        Self {
            keys: keys.to_vec(),
            columns: conserved
                .iter()
                .map(|field| {
                    let column = store.column(field);
                    indices.iter().map(|&i| column[i]).collect()
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// `[count, keys.., field 0 values.., field 1 values.., ..]`
    pub fn encode(&self) -> Vec<Scalar> {
        let mut msg = Vec::with_capacity(1 + self.len() * (1 + self.columns.len()));
        msg.push(Scalar::U64(self.len() as u64));
        msg.extend(self.keys.iter().map(|&k| Scalar::U64(k)));
        for column in &self.columns {
            msg.extend(column.iter().map(|&v| Scalar::F64(v)));
        }
        msg
    }

    pub fn decode(msg: Vec<Scalar>, n_fields: usize) -> Result<Self, SyncError> {
        let got = msg.len();
        let mut values = msg.into_iter();
        let count = values
            .next()
            .and_then(u64::from_scalar)
            .ok_or(CollectiveError::TypeMismatch)? as usize;
        let expected = 1 + count * (1 + n_fields);
        if got != expected {
            return Err(CollectiveError::LengthMismatch { expected, got }.into());
        }
        let keys = (&mut values)
            .take(count)
            .map(|s| u64::from_scalar(s).ok_or(CollectiveError::TypeMismatch))
            .collect::<Result<Vec<_>, _>>()?;
        let columns = (0..n_fields)
            .map(|_| {
                (&mut values)
                    .take(count)
                    .map(|s| f64::from_scalar(s).ok_or(CollectiveError::TypeMismatch))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { keys, columns })
    }
}

/// Verify every conserved column holds `n` values.
pub(crate) fn check_columns(store: &FieldStore, conserved: FieldSet, n: usize) -> Result<(), SyncError> {
    for field in conserved.iter() {
        let got = store.column(field).len();
        if got != n {
            return Err(SyncError::InvalidLayout {
                reason: format!("conserved field '{field}' has {got} values for {n} particles"),
            });
        }
    }
    Ok(())
}

/// Rewrite the compute store as `[left | owned in `order` | right]`.
///
/// `order` holds absolute indices into the current arrays; `owned_keys`
/// are the keys of those particles in the same order. Dependent and
/// other active fields are resized to the new length.
pub(crate) fn relayout(
    data: &mut ParticleData,
    conserved: FieldSet,
    dependent: FieldSet,
    order: &[usize],
    owned_keys: Vec<u64>,
    left: HaloBlock,
    right: HaloBlock,
) -> Layout {
    let active = data.active().union(&conserved).union(&dependent);
    let first = left.len();
    let last = first + order.len();
    let len = last + right.len();

    let store = data.store_mut();
    for (k, field) in conserved.iter().enumerate() {
        let old = store.column(field);
        let mut column = Vec::with_capacity(len);
        column.extend_from_slice(&left.columns[k]);
        column.extend(order.iter().map(|&i| old[i]));
        column.extend_from_slice(&right.columns[k]);
        store.set_column(field, column);
    }

    let mut keys = left.keys;
    keys.extend(owned_keys);
    keys.extend(right.keys);
    store.set_keys(keys);
    store.resize(len, active);

    Layout { first, last, len }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{Backend, Field};

    #[test]
    fn halo_block_survives_transport() {
        let block = HaloBlock {
            keys: vec![3, 9],
            columns: vec![vec![1.0, 2.0], vec![-1.0, 0.5]],
        };
        assert_eq!(HaloBlock::decode(block.encode(), 2).unwrap(), block);
        assert_eq!(HaloBlock::decode(HaloBlock::empty(4).encode(), 4).unwrap().len(), 0);
    }

    #[test]
    fn truncated_halo_block_is_rejected() {
        let mut msg = HaloBlock::padding(2, 1).encode();
        msg.pop();
        assert_eq!(
            HaloBlock::decode(msg, 1),
            Err(SyncError::Collective(CollectiveError::LengthMismatch {
                expected: 5,
                got: 4
            }))
        );
    }

    #[test]
    fn relayout_places_owned_between_halos() {
        let mut data = ParticleData::new(Backend::Host);
        data.set_dependent(FieldSet::of(&[Field::Ax]));
        for field in data.active().iter() {
            data.load(field, vec![10.0, 11.0, 12.0]);
        }
        let conserved = FieldSet::positional();
        let n = conserved.len();
        let layout = relayout(
            &mut data,
            conserved,
            FieldSet::of(&[Field::Ax]),
            &[2, 0],
            vec![5, 6],
            HaloBlock::padding(1, n),
            HaloBlock::padding(2, n),
        );
        assert_eq!(layout, Layout { first: 1, last: 3, len: 5 });
        assert_eq!(data.store().column(Field::M), &[0.0, 12.0, 10.0, 0.0, 0.0]);
        assert_eq!(data.store().keys(), &[0, 5, 6, 0, 0]);
        assert_eq!(data.store().column(Field::Ax).len(), 5);
        assert_eq!(layout.owned_in(5), 1..3);
        assert_eq!(layout.owned_in(4), 0..4);
    }
}
