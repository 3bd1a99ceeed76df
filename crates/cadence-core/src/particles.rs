//! Column storage for per-particle fields and the per-rank simulation context.
//!
//! [`FieldStore`] holds one `Vec<f64>` per [`Field`] plus the `u64`
//! space-filling-curve keys. [`ParticleData`] owns a host store, an
//! optional device-resident store (accelerated backend), the
//! conserved/dependent field declarations, and the scalar results the
//! gravity step produces. It is passed explicitly as `&mut` to every
//! phase; nothing in the workspace holds ambient references to it.

use std::ops::Range;

use crate::backend::Backend;
use crate::error::StepError;
use crate::field::{Field, FieldSet};

/// One array per field plus the particle keys.
///
/// Inactive fields stay empty; [`resize`](FieldStore::resize) only grows
/// the fields it is told are active.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldStore {
    columns: [Vec<f64>; Field::COUNT],
    keys: Vec<u64>,
}

impl FieldStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a field's array.
    pub fn column(&self, field: Field) -> &[f64] {
        &self.columns[field.index()]
    }

    /// Mutable access to a field's array.
    pub fn column_mut(&mut self, field: Field) -> &mut [f64] {
        &mut self.columns[field.index()]
    }

    /// Replace a field's array.
    pub fn set_column(&mut self, field: Field, values: Vec<f64>) {
        self.columns[field.index()] = values;
    }

    /// Disjoint mutable access to every field at once, in [`Field::ALL`] order.
    ///
    /// Lets a kernel read some fields while writing others without copying.
    pub fn columns_mut(&mut self) -> [&mut [f64]; Field::COUNT] {
        self.columns.each_mut().map(|c| c.as_mut_slice())
    }

    /// Particle keys.
    pub fn keys(&self) -> &[u64] {
        &self.keys
    }

    /// Mutable particle keys.
    pub fn keys_mut(&mut self) -> &mut [u64] {
        &mut self.keys
    }

    /// Replace the particle keys.
    pub fn set_keys(&mut self, keys: Vec<u64>) {
        self.keys = keys;
    }

    /// Resize every active field and the keys to `len`.
    ///
    /// New slots are zero. Inactive fields are released.
    pub fn resize(&mut self, len: usize, active: FieldSet) {
        for field in Field::ALL {
            let column = &mut self.columns[field.index()];
            if active.contains(field) {
                column.resize(len, 0.0);
            } else {
                *column = Vec::new();
            }
        }
        self.keys.resize(len, 0);
    }

    /// Set `field[range]` to `value`.
    pub fn fill(&mut self, field: Field, range: Range<usize>, value: f64) {
        self.columns[field.index()][range].fill(value);
    }

    /// Copy `field[range]` from `source` into `self`.
    pub fn copy_range_from(&mut self, source: &FieldStore, field: Field, range: Range<usize>) {
        let idx = field.index();
        self.columns[idx][range.clone()].copy_from_slice(&source.columns[idx][range]);
    }
}

/// Per-rank particle state, mutated in place by the propagator phases.
#[derive(Clone, Debug)]
pub struct ParticleData {
    backend: Backend,
    host: FieldStore,
    device: Option<FieldStore>,
    conserved: FieldSet,
    dependent: FieldSet,
    /// Gravitational constant.
    pub g: f64,
    /// Gravitational potential energy from the last traversal.
    ///
    /// Local on every rank after traversal; the root rank holds the
    /// global sum after the step's reduction.
    pub egrav: f64,
}

impl ParticleData {
    /// Create empty particle data for the given backend.
    ///
    /// The positional fields `x, y, z, h, m` are conserved from the start.
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            host: FieldStore::new(),
            device: backend.is_accelerated().then(FieldStore::new),
            conserved: FieldSet::positional(),
            dependent: FieldSet::empty(),
            g: 1.0,
            egrav: 0.0,
        }
    }

    /// The backend this data was created for.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Declare fields as conserved.
    ///
    /// A field declared conserved is removed from the dependent set.
    pub fn set_conserved(&mut self, fields: FieldSet) {
        self.conserved = self.conserved.union(&fields);
        self.dependent = self.dependent.difference(&self.conserved);
    }

    /// Declare fields as dependent (scratch).
    ///
    /// Fields already conserved stay conserved.
    pub fn set_dependent(&mut self, fields: FieldSet) {
        self.dependent = self.dependent.union(&fields).difference(&self.conserved);
    }

    /// Fields persisted and exchanged across halos every step.
    pub fn conserved(&self) -> FieldSet {
        self.conserved
    }

    /// Scratch fields recomputed every step.
    pub fn dependent(&self) -> FieldSet {
        self.dependent
    }

    /// Every allocated field.
    pub fn active(&self) -> FieldSet {
        self.conserved.union(&self.dependent)
    }

    /// The host-resident store.
    pub fn host(&self) -> &FieldStore {
        &self.host
    }

    /// Mutable host-resident store.
    pub fn host_mut(&mut self) -> &mut FieldStore {
        &mut self.host
    }

    /// The store kernels operate on: the device store when accelerated,
    /// otherwise the host store.
    pub fn store(&self) -> &FieldStore {
        self.device.as_ref().unwrap_or(&self.host)
    }

    /// Mutable access to the store kernels operate on.
    pub fn store_mut(&mut self) -> &mut FieldStore {
        self.device.as_mut().unwrap_or(&mut self.host)
    }

    /// Load a field's initial values into every store.
    pub fn load(&mut self, field: Field, values: Vec<f64>) {
        if let Some(device) = self.device.as_mut() {
            device.set_column(field, values.clone());
        }
        self.host.set_column(field, values);
    }

    /// Load particle keys into every store.
    pub fn load_keys(&mut self, keys: Vec<u64>) {
        if let Some(device) = self.device.as_mut() {
            device.set_keys(keys.clone());
        }
        self.host.set_keys(keys);
    }

    /// Number of particles (owned + halo) in the compute store.
    pub fn len(&self) -> usize {
        self.store().column(Field::X).len()
    }

    /// Whether the compute store holds no particles.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resize all active fields in every store to `len`.
    pub fn resize(&mut self, len: usize) {
        let active = self.active();
        self.host.resize(len, active);
        if let Some(device) = self.device.as_mut() {
            device.resize(len, active);
        }
    }

    /// Set `field[range]` to `value` in the compute store.
    pub fn fill(&mut self, field: Field, range: Range<usize>, value: f64) -> Result<(), StepError> {
        self.check_range(&range)?;
        self.store_mut().fill(field, range, value);
        Ok(())
    }

    /// Copy `fields[range]` from the device store into host memory.
    ///
    /// A no-op on the host backend. Inactive fields are skipped.
    pub fn transfer_to_host(&mut self, range: Range<usize>, fields: FieldSet) -> Result<(), StepError> {
        self.check_range(&range)?;
        let active = self.active();
        if let Some(device) = self.device.as_ref() {
            for field in fields.intersection(&active).iter() {
                self.host.copy_range_from(device, field, range.clone());
            }
        }
        Ok(())
    }

    /// Verify that every active field and the keys match the particle count.
    pub fn check_lengths(&self) -> Result<(), StepError> {
        let expected = self.len();
        for store in std::iter::once(&self.host).chain(self.device.as_ref()) {
            for field in self.active().iter() {
                let got = store.column(field).len();
                if got != expected {
                    return Err(StepError::LengthMismatch {
                        field,
                        expected,
                        got,
                    });
                }
            }
            let got = store.keys().len();
            if got != expected {
                return Err(StepError::KeyLengthMismatch { expected, got });
            }
        }
        Ok(())
    }

    fn check_range(&self, range: &Range<usize>) -> Result<(), StepError> {
        let len = self.len();
        if range.start > range.end || range.end > len {
            return Err(StepError::InvalidOwnedRange {
                first: range.start,
                last: range.end,
                len,
            });
        }
        Ok(())
    }
}
