//! Step orchestration for the Cadence time-advancement core.
//!
//! A [`Propagator`] advances one rank's particles by one macro-step
//! against a [`Domain`](cadence_domain::Domain). [`NbodyPropagator`] is
//! the gravity-only propagator: it synchronizes the domain, pads the halo
//! region, rebuilds the multipole hierarchy, traverses it, and reduces
//! energy and load statistics across ranks. [`RungTimestepper`] turns the
//! resulting accelerations into a rung layout for the next macro-step.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod metrics;
pub mod nbody;
pub mod propagator;
pub mod timer;
pub mod timestepper;

pub use config::PropagatorConfig;
pub use metrics::StepMetrics;
pub use nbody::{AcceleratedNbodyPropagator, HostNbodyPropagator, NbodyPropagator};
pub use propagator::Propagator;
pub use timer::PhaseTimer;
pub use timestepper::{RungLayout, RungTimestepper, TimestepError};
