//! Rung layout for the next macro-step.

use std::error::Error;
use std::fmt;

use cadence_core::{ConfigError, Executor, ParticleData, ScheduleError, StepError};
use cadence_domain::Domain;
use cadence_timestep::{
    GroupOrder, GroupTimestepEvaluator, GroupView, RungConfig, RungScheduler, Timestep,
    TimestepConfig,
};

/// Errors from [`RungTimestepper::compute`].
#[derive(Clone, Debug, PartialEq)]
pub enum TimestepError {
    /// The group timesteps could not be evaluated.
    Evaluate(StepError),
    /// The rung layout could not be computed.
    Schedule(ScheduleError),
}

impl fmt::Display for TimestepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evaluate(e) => write!(f, "group timestep evaluation failed: {e}"),
            Self::Schedule(e) => write!(f, "rung scheduling failed: {e}"),
        }
    }
}

impl Error for TimestepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Evaluate(e) => Some(e),
            Self::Schedule(e) => Some(e),
        }
    }
}

impl From<StepError> for TimestepError {
    fn from(e: StepError) -> Self {
        Self::Evaluate(e)
    }
}

impl From<ScheduleError> for TimestepError {
    fn from(e: ScheduleError) -> Self {
        Self::Schedule(e)
    }
}

/// The outcome of one rung computation.
#[derive(Clone, Debug, PartialEq)]
pub struct RungLayout {
    /// The groups the owned range was split into.
    pub groups: GroupView,
    /// Group timesteps, sorted ascending.
    pub group_dt: Vec<f32>,
    /// Rung boundaries over the sorted groups.
    pub timestep: Timestep,
    /// Sorted position to original group.
    pub order: GroupOrder,
}

/// Groups the owned particles, evaluates their timesteps and assigns
/// rungs, using executor `E` for the per-group criteria.
#[derive(Clone, Debug)]
pub struct RungTimestepper<E: Executor> {
    evaluator: GroupTimestepEvaluator<E>,
    scheduler: RungScheduler,
    group_size: usize,
}

impl<E: Executor> RungTimestepper<E> {
    /// Create a timestepper forming groups of `group_size` consecutive
    /// owned particles.
    pub fn new(
        criteria: TimestepConfig,
        rungs: RungConfig,
        group_size: usize,
    ) -> Result<Self, ConfigError> {
        if group_size == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "group_size",
                reason: "must be at least 1".into(),
            });
        }
        Ok(Self {
            evaluator: GroupTimestepEvaluator::new(criteria)?,
            scheduler: RungScheduler::new(rungs)?,
            group_size,
        })
    }

    /// Compute the rung layout of the domain's owned particles.
    ///
    /// Collective over the domain's communicator. Evaluation errors are
    /// local and raised before the scheduler's reduction.
    pub fn compute<D: Domain>(
        &self,
        domain: &D,
        data: &ParticleData,
    ) -> Result<RungLayout, TimestepError> {
        let groups = GroupView::fixed_size(domain.start_index(), domain.end_index(), self.group_size);
        let mut group_dt = self.evaluator.evaluate(&groups, data)?;
        let (timestep, order) =
            self.scheduler
                .compute_rung_timestep(&groups, &mut group_dt, domain.comm())?;
        Ok(RungLayout {
            groups,
            group_dt,
            timestep,
            order,
        })
    }
}
