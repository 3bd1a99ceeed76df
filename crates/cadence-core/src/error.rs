//! Error types for the Cadence time-advancement core.
//!
//! Organized by failure class: collective communication, domain
//! synchronization, rung scheduling, macro-step execution, and
//! configuration. Every error here is fatal for the current step; the
//! only recovered condition (all groups equally fast) is not an error.

use std::error::Error;
use std::fmt;

use crate::backend::Backend;
use crate::field::Field;

/// Errors from a collective operation (barrier, reduction, gather).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectiveError {
    /// A peer rank dropped its endpoint before the collective completed.
    PeerDisconnected {
        /// Rank that went away.
        rank: usize,
    },
    /// A peer contributed values of a different scalar type.
    TypeMismatch,
    /// A peer contributed a different number of values to a reduction.
    LengthMismatch {
        /// Number of values this rank contributed.
        expected: usize,
        /// Number of values the peer contributed.
        got: usize,
    },
    /// A peer's payload could not be decoded.
    MalformedPayload {
        /// What was wrong with it.
        reason: &'static str,
    },
    /// The requested root rank does not exist.
    InvalidRoot {
        /// The requested root.
        root: usize,
        /// Number of ranks in the group.
        size: usize,
    },
}

impl fmt::Display for CollectiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerDisconnected { rank } => write!(f, "rank {rank} disconnected"),
            Self::TypeMismatch => write!(f, "peer contributed a different scalar type"),
            Self::LengthMismatch { expected, got } => {
                write!(f, "reduction length mismatch: expected {expected}, got {got}")
            }
            Self::MalformedPayload { reason } => write!(f, "malformed payload: {reason}"),
            Self::InvalidRoot { root, size } => {
                write!(f, "root rank {root} out of range for group of {size}")
            }
        }
    }
}

impl Error for CollectiveError {}

/// Errors from the domain synchronization (halo exchange) phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncError {
    /// The halo exchange could not complete.
    Collective(CollectiveError),
    /// The particle arrays do not describe a valid layout for this domain.
    InvalidLayout {
        /// Description of the layout problem.
        reason: String,
    },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collective(e) => write!(f, "halo exchange failed: {e}"),
            Self::InvalidLayout { reason } => write!(f, "invalid particle layout: {reason}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Collective(e) => Some(e),
            Self::InvalidLayout { .. } => None,
        }
    }
}

impl From<CollectiveError> for SyncError {
    fn from(e: CollectiveError) -> Self {
        Self::Collective(e)
    }
}

/// Errors from rung scheduling.
#[derive(Clone, Debug, PartialEq)]
pub enum ScheduleError {
    /// A group timestep is negative, NaN or infinite.
    ///
    /// Raised before any collective is issued.
    InvalidTimestep {
        /// Index of the offending group (pre-sort).
        index: usize,
        /// The offending value.
        value: f32,
    },
    /// The timestep array does not hold one value per group.
    LengthMismatch {
        /// Number of groups.
        expected: usize,
        /// Number of timesteps supplied.
        got: usize,
    },
    /// No rank holds any group.
    NoGroups,
    /// The scheduler configuration is invalid.
    InvalidConfig {
        /// Description of the invalid parameter.
        reason: String,
    },
    /// The min-reduction across ranks failed.
    Collective(CollectiveError),
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimestep { index, value } => {
                write!(f, "group {index} has invalid timestep {value}")
            }
            Self::LengthMismatch { expected, got } => {
                write!(f, "{got} group timesteps for {expected} groups")
            }
            Self::NoGroups => write!(f, "no groups on any rank"),
            Self::InvalidConfig { reason } => write!(f, "invalid rung config: {reason}"),
            Self::Collective(e) => write!(f, "timestep reduction failed: {e}"),
        }
    }
}

impl Error for ScheduleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Collective(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CollectiveError> for ScheduleError {
    fn from(e: CollectiveError) -> Self {
        Self::Collective(e)
    }
}

/// Errors from a propagator macro-step.
///
/// There is no partial-step recovery: any of these aborts the step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepError {
    /// Domain synchronization failed.
    Sync(SyncError),
    /// A per-particle array does not match the particle count.
    LengthMismatch {
        /// The offending field.
        field: Field,
        /// The expected length (owned + halo particles).
        expected: usize,
        /// The actual length.
        got: usize,
    },
    /// The local SFC key array does not match the particle count.
    KeyLengthMismatch {
        /// The expected length.
        expected: usize,
        /// The actual length.
        got: usize,
    },
    /// A collective (barrier or reduction) failed.
    Collective(CollectiveError),
    /// The domain reports an owned range outside the particle arrays.
    InvalidOwnedRange {
        /// First owned index.
        first: usize,
        /// One past the last owned index.
        last: usize,
        /// Particle count including halos.
        len: usize,
    },
    /// The particle data was created for a different backend than the
    /// propagator's multipole holder.
    BackendMismatch {
        /// Backend of the multipole holder.
        expected: Backend,
        /// Backend of the particle data.
        got: Backend,
    },
    /// Traversal was requested before an upsweep built the tree.
    MissingUpsweep,
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(e) => write!(f, "domain sync failed: {e}"),
            Self::LengthMismatch {
                field,
                expected,
                got,
            } => write!(f, "field '{field}' has length {got}, expected {expected}"),
            Self::KeyLengthMismatch { expected, got } => {
                write!(f, "key array has length {got}, expected {expected}")
            }
            Self::Collective(e) => write!(f, "collective failed: {e}"),
            Self::InvalidOwnedRange { first, last, len } => {
                write!(f, "owned range [{first}, {last}) invalid for {len} particles")
            }
            Self::BackendMismatch { expected, got } => write!(
                f,
                "particle data uses the {} backend, propagator expects {}",
                got.name(),
                expected.name()
            ),
            Self::MissingUpsweep => write!(f, "traversal requested before upsweep"),
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sync(e) => Some(e),
            Self::Collective(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SyncError> for StepError {
    fn from(e: SyncError) -> Self {
        Self::Sync(e)
    }
}

impl From<CollectiveError> for StepError {
    fn from(e: CollectiveError) -> Self {
        Self::Collective(e)
    }
}

/// Errors detected when validating a configuration struct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A numeric parameter is out of its documented range.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the violated constraint.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter { name, reason } => write!(f, "{name}: {reason}"),
        }
    }
}

impl Error for ConfigError {}

impl From<ConfigError> for ScheduleError {
    fn from(e: ConfigError) -> Self {
        Self::InvalidConfig {
            reason: e.to_string(),
        }
    }
}
