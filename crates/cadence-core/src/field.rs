//! Per-particle field names and the [`FieldSet`] bitset.

use std::fmt;

/// A per-particle floating-point field.
///
/// The discriminant is the field's bit position in a [`FieldSet`] and
/// its slot in a [`FieldStore`](crate::FieldStore).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Field {
    /// Position, x component.
    X,
    /// Position, y component.
    Y,
    /// Position, z component.
    Z,
    /// Smoothing length.
    H,
    /// Mass.
    M,
    /// Velocity, x component.
    Vx,
    /// Velocity, y component.
    Vy,
    /// Velocity, z component.
    Vz,
    /// Density.
    Rho,
    /// Pressure.
    P,
    /// Sound speed.
    C,
    /// Acceleration, x component.
    Ax,
    /// Acceleration, y component.
    Ay,
    /// Acceleration, z component.
    Az,
    /// Internal energy rate.
    Du,
    /// Velocity divergence.
    Divv,
}

impl Field {
    /// Number of field variants.
    pub const COUNT: usize = 16;

    /// Every field, in discriminant order.
    pub const ALL: [Field; Field::COUNT] = [
        Field::X,
        Field::Y,
        Field::Z,
        Field::H,
        Field::M,
        Field::Vx,
        Field::Vy,
        Field::Vz,
        Field::Rho,
        Field::P,
        Field::C,
        Field::Ax,
        Field::Ay,
        Field::Az,
        Field::Du,
        Field::Divv,
    ];

    /// Slot index of this field.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short lowercase name used in logs and output headers.
    pub fn name(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
            Self::H => "h",
            Self::M => "m",
            Self::Vx => "vx",
            Self::Vy => "vy",
            Self::Vz => "vz",
            Self::Rho => "rho",
            Self::P => "p",
            Self::C => "c",
            Self::Ax => "ax",
            Self::Ay => "ay",
            Self::Az => "az",
            Self::Du => "du",
            Self::Divv => "divv",
        }
    }

    /// Look a field up by its [`name`](Field::name).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of [`Field`]s implemented as a fixed-width bitset.
///
/// Used to declare which fields are conserved (persisted and halo
/// exchanged) and which are dependent (scratch) for a propagator.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FieldSet {
    bits: u32,
}

impl FieldSet {
    /// Create an empty field set.
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Create a set from a slice of fields.
    pub fn of(fields: &[Field]) -> Self {
        fields.iter().copied().collect()
    }

    /// The positional fields every propagator conserves: `x, y, z, h, m`.
    pub fn positional() -> Self {
        Self::of(&[Field::X, Field::Y, Field::Z, Field::H, Field::M])
    }

    /// Insert a field into the set.
    pub fn insert(&mut self, field: Field) {
        self.bits |= 1 << field.index();
    }

    /// Remove a field from the set.
    pub fn remove(&mut self, field: Field) {
        self.bits &= !(1 << field.index());
    }

    /// Check whether the set contains a field.
    pub fn contains(&self, field: Field) -> bool {
        self.bits & (1 << field.index()) != 0
    }

    /// Return the union of two sets (`self | other`).
    pub fn union(&self, other: &Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Return the intersection of two sets (`self & other`).
    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            bits: self.bits & other.bits,
        }
    }

    /// Return the set difference (`self - other`).
    pub fn difference(&self, other: &Self) -> Self {
        Self {
            bits: self.bits & !other.bits,
        }
    }

    /// Check whether `self` is a subset of `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.bits & !other.bits == 0
    }

    /// Returns `true` if the set contains no fields.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Returns the number of fields in the set.
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Iterate over the fields in the set, in discriminant order.
    pub fn iter(&self) -> FieldSetIter {
        FieldSetIter {
            bits: self.bits,
            next: 0,
        }
    }
}

impl fmt::Debug for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Field::name)).finish()
    }
}

impl FromIterator<Field> for FieldSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        let mut set = Self::empty();
        for field in iter {
            set.insert(field);
        }
        set
    }
}

impl IntoIterator for &FieldSet {
    type Item = Field;
    type IntoIter = FieldSetIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the fields of a [`FieldSet`].
pub struct FieldSetIter {
    bits: u32,
    next: usize,
}

impl Iterator for FieldSetIter {
    type Item = Field;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < Field::COUNT {
            let idx = self.next;
            self.next += 1;
            if self.bits & (1 << idx) != 0 {
                return Some(Field::ALL[idx]);
            }
        }
        None
    }
}
