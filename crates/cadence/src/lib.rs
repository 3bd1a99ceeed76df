//! Cadence: multi-rate timestep scheduling and distributed tree gravity
//! for particle simulations.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Cadence sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use cadence::prelude::*;
//!
//! let mut prop = HostNbodyPropagator::new(PropagatorConfig::default()).unwrap();
//! let mut domain = LocalDomain::new(0, 0);
//!
//! let mut data = ParticleData::new(Backend::Host);
//! <HostNbodyPropagator as Propagator<LocalDomain>>::activate_fields(&prop, &mut data);
//! data.load(Field::X, vec![0.0, 1.0]);
//! data.load(Field::Y, vec![0.0, 0.0]);
//! data.load(Field::Z, vec![0.0, 0.0]);
//! data.load(Field::H, vec![0.0, 0.0]);
//! data.load(Field::M, vec![1.0, 2.0]);
//! for field in data.dependent().iter() {
//!     data.load(field, vec![0.0; 2]);
//! }
//! data.load_keys(vec![0; 2]);
//!
//! prop.step(&mut domain, &mut data).unwrap();
//! assert!((data.egrav + 2.0).abs() < 1e-12);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `cadence-core` | fields, particle storage, backends, errors |
//! | [`comm`] | `cadence-comm` | communicator capability and in-process ranks |
//! | [`domain`] | `cadence-domain` | domain synchronization and halo exchange |
//! | [`timestep`] | `cadence-timestep` | group criteria and rung scheduling |
//! | [`gravity`] | `cadence-gravity` | octree quadrupole gravity |
//! | [`engine`] | `cadence-engine` | propagators and step metrics |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Fields, particle storage, backends and errors (`cadence-core`).
pub use cadence_core as types;

/// Communicator capability (`cadence-comm`).
///
/// [`comm::SerialComm`] for single-rank runs, [`comm::ThreadComm`] for
/// in-process rank groups.
pub use cadence_comm as comm;

/// Domain synchronization (`cadence-domain`).
pub use cadence_domain as domain;

/// Group timestep criteria and rung scheduling (`cadence-timestep`).
pub use cadence_timestep as timestep;

/// Octree quadrupole gravity (`cadence-gravity`).
pub use cadence_gravity as gravity;

/// Propagators and step metrics (`cadence-engine`).
pub use cadence_engine as engine;

/// Common imports for typical Cadence usage.
pub mod prelude {
    // Core types
    pub use cadence_core::{Backend, Field, FieldSet, ParticleData};

    // Errors
    pub use cadence_core::{CollectiveError, ConfigError, ScheduleError, StepError, SyncError};

    // Communication
    pub use cadence_comm::{Communicator, ReduceOp, ReduceTarget, SerialComm, ThreadComm};

    // Domain
    pub use cadence_domain::{Domain, LocalDomain, SfcDomain};

    // Timestep
    pub use cadence_timestep::{RungConfig, RungScheduler, Timestep, TimestepConfig};

    // Engine
    pub use cadence_engine::{
        AcceleratedNbodyPropagator, HostNbodyPropagator, Propagator, PropagatorConfig,
        RungTimestepper, StepMetrics,
    };
}
