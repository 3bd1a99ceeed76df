//! Core types for the Cadence time-advancement core.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the particle field model shared by every other crate in the
//! workspace: the [`Field`] enum and [`FieldSet`] bitset, the
//! [`FieldStore`] column arrays, the [`ParticleData`] context that the
//! propagator mutates in place each macro-step, backend selection with its
//! kernel executors, and the error taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod error;
pub mod field;
pub mod particles;

pub use backend::{Backend, Executor, Parallel, Serial};
pub use error::{CollectiveError, ConfigError, ScheduleError, StepError, SyncError};
pub use field::{Field, FieldSet, FieldSetIter};
pub use particles::{FieldStore, ParticleData};
