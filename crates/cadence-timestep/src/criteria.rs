//! Per-group timestep criteria.
//!
//! Both criteria reduce over the particles of each group and yield one
//! `f32` per group. A group whose limiting quantity is zero everywhere
//! is unconstrained by that criterion and gets `+inf`. The caller
//! combines criteria with [`combine_min`] and bounds the result with
//! [`cap_timesteps`] before scheduling, since the scheduler accepts
//! finite timesteps only.

use std::marker::PhantomData;

use cadence_core::{ConfigError, Executor, Field, FieldSet, FieldStore, ParticleData, StepError};
use tracing::trace;

use crate::config::TimestepConfig;
use crate::groups::GroupView;

fn check_column(store: &FieldStore, field: Field, groups: &GroupView) -> Result<(), StepError> {
    let got = store.column(field).len();
    if got < groups.last_body {
        return Err(StepError::LengthMismatch {
            field,
            expected: groups.last_body,
            got,
        });
    }
    Ok(())
}

/// Velocity-divergence limited timestep: `k_cour / max |divv|` per group.
pub fn group_divv_timestep<E: Executor>(
    groups: &GroupView,
    store: &FieldStore,
    k_cour: f32,
) -> Result<Vec<f32>, StepError> {
    check_column(store, Field::Divv, groups)?;
    let divv = store.column(Field::Divv);
    Ok(E::map_range(0..groups.num_groups(), |g| {
        let peak = divv[groups.range(g)].iter().fold(0.0f64, |m, v| m.max(v.abs()));
        if peak > 0.0 {
            (f64::from(k_cour) / peak) as f32
        } else {
            f32::INFINITY
        }
    }))
}

/// Acceleration limited timestep: `coefficient / sqrt(max |a|)` per group,
/// where `coefficient = eta_acc * sqrt(eps)`.
pub fn group_acc_timestep<E: Executor>(
    groups: &GroupView,
    store: &FieldStore,
    coefficient: f32,
) -> Result<Vec<f32>, StepError> {
    for field in [Field::Ax, Field::Ay, Field::Az] {
        check_column(store, field, groups)?;
    }
    let (ax, ay, az) = (
        store.column(Field::Ax),
        store.column(Field::Ay),
        store.column(Field::Az),
    );
    Ok(E::map_range(0..groups.num_groups(), |g| {
        let peak2 = groups
            .range(g)
            .map(|i| ax[i] * ax[i] + ay[i] * ay[i] + az[i] * az[i])
            .fold(0.0f64, f64::max);
        if peak2 > 0.0 {
            // sqrt(|a|) = (|a|²)^(1/4)
            (f64::from(coefficient) / peak2.sqrt().sqrt()) as f32
        } else {
            f32::INFINITY
        }
    }))
}

/// Elementwise `target[g] = min(target[g], other[g])`.
pub fn combine_min(target: &mut [f32], other: &[f32]) {
    for (t, &o) in target.iter_mut().zip(other) {
        *t = t.min(o);
    }
}

/// Clamp every timestep to at most `max_dt`, turning `+inf` into `max_dt`.
pub fn cap_timesteps(dt: &mut [f32], max_dt: f32) {
    for t in dt {
        *t = t.min(max_dt);
    }
}

/// Evaluates both criteria over a [`GroupView`] on the compute store of
/// the executor's backend.
#[derive(Clone, Debug)]
pub struct GroupTimestepEvaluator<E: Executor> {
    config: TimestepConfig,
    _exec: PhantomData<E>,
}

impl<E: Executor> GroupTimestepEvaluator<E> {
    /// Create an evaluator after validating `config`.
    pub fn new(config: TimestepConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            _exec: PhantomData,
        })
    }

    /// The criteria coefficients.
    pub fn config(&self) -> &TimestepConfig {
        &self.config
    }

    /// Fields the criteria read.
    pub fn required_fields() -> FieldSet {
        FieldSet::of(&[Field::Divv, Field::Ax, Field::Ay, Field::Az])
    }

    /// One safe timestep per group: the minimum of both criteria, capped
    /// at [`TimestepConfig::max_dt`]. Every value is finite.
    pub fn evaluate(&self, groups: &GroupView, data: &ParticleData) -> Result<Vec<f32>, StepError> {
        if data.backend() != E::BACKEND {
            return Err(StepError::BackendMismatch {
                expected: E::BACKEND,
                got: data.backend(),
            });
        }
        let store = data.store();
        let mut dt = group_divv_timestep::<E>(groups, store, self.config.k_cour)?;
        let acc = group_acc_timestep::<E>(groups, store, self.config.acc_coefficient())?;
        combine_min(&mut dt, &acc);
        cap_timesteps(&mut dt, self.config.max_dt);
        trace!(groups = groups.num_groups(), backend = E::BACKEND.name(), "group timesteps evaluated");
        Ok(dt)
    }
}
