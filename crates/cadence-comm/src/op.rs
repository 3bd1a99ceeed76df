//! Reduction operators and the scalar wire type.

/// Elementwise combining operator for a reduction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReduceOp {
    /// Sum of all contributions.
    Sum,
    /// Minimum of all contributions.
    Min,
    /// Maximum of all contributions.
    Max,
}

/// Which ranks receive the result of a reduction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReduceTarget {
    /// Only the given rank receives the result.
    Root(usize),
    /// Every rank receives the result.
    All,
}

/// A scalar as carried between ranks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    /// Single-precision float.
    F32(f32),
    /// Double-precision float.
    F64(f64),
    /// Unsigned counter.
    U64(u64),
}

/// A value that can take part in a reduction or gather.
pub trait Reducible: Copy + Send + 'static {
    /// Combine two contributions.
    fn combine(self, other: Self, op: ReduceOp) -> Self;

    /// Wrap for transport.
    fn into_scalar(self) -> Scalar;

    /// Unwrap after transport. `None` if the peer sent another type.
    fn from_scalar(scalar: Scalar) -> Option<Self>;
}

macro_rules! impl_float_reducible {
    ($t:ty, $variant:ident) => {
        impl Reducible for $t {
            fn combine(self, other: Self, op: ReduceOp) -> Self {
                match op {
                    ReduceOp::Sum => self + other,
                    ReduceOp::Min => self.min(other),
                    ReduceOp::Max => self.max(other),
                }
            }

            fn into_scalar(self) -> Scalar {
                Scalar::$variant(self)
            }

            fn from_scalar(scalar: Scalar) -> Option<Self> {
                match scalar {
                    Scalar::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_float_reducible!(f32, F32);
impl_float_reducible!(f64, F64);

impl Reducible for u64 {
    fn combine(self, other: Self, op: ReduceOp) -> Self {
        match op {
            ReduceOp::Sum => self.saturating_add(other),
            ReduceOp::Min => self.min(other),
            ReduceOp::Max => self.max(other),
        }
    }

    fn into_scalar(self) -> Scalar {
        Scalar::U64(self)
    }

    fn from_scalar(scalar: Scalar) -> Option<Self> {
        match scalar {
            Scalar::U64(v) => Some(v),
            _ => None,
        }
    }
}
