//! Adaptive multi-rate timestepping for the Cadence time-advancement core.
//!
//! Each macro-step, particles are partitioned into contiguous groups
//! ([`GroupView`]). The [`GroupTimestepEvaluator`] computes one safe
//! timestep per group from the velocity-divergence and acceleration
//! criteria. The [`RungScheduler`] then sorts the groups by timestep,
//! reduces the global minimum across ranks, and splits the sorted groups
//! into at most [`Timestep::MAX_NUM_RUNGS`] power-of-two tiers. The result
//! is a [`Timestep`] describing the rung boundaries plus a [`GroupOrder`]
//! mapping sorted positions back to the original groups.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod criteria;
pub mod groups;
pub mod rungs;

pub use config::{RungConfig, TimestepConfig};
pub use criteria::{
    cap_timesteps, combine_min, group_acc_timestep, group_divv_timestep, GroupTimestepEvaluator,
};
pub use groups::GroupView;
pub use rungs::{
    compute_rung_timestep, sort_group_dt, timestep_range, GroupOrder, RungScheduler, Timestep,
    MAX_NUM_RUNGS,
};
