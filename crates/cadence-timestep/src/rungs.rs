//! Rung assignment.
//!
//! Groups are sorted by their safe timestep and split into tiers
//! ("rungs") whose step sizes are powers of two of the global minimum:
//! rung `r` advances with `2^r * min_dt`. A group lands in rung `r >= 1`
//! only if its own timestep exceeds `2^r * min_dt`, so the rung step
//! never exceeds the group's limit.

use cadence_comm::{Communicator, ReduceOp, ReduceTarget};
use cadence_core::{ConfigError, ScheduleError};
use tracing::debug;

use crate::config::RungConfig;
use crate::groups::GroupView;

/// Hard ceiling on the number of rungs.
pub const MAX_NUM_RUNGS: usize = 4;

/// The rung layout of one macro-step.
///
/// `rung_ranges` holds sorted-group-index boundaries, not particle
/// indices: rung `r` covers sorted groups
/// `rung_ranges[r]..rung_ranges[r + 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timestep {
    /// Global minimum group timestep; the step size of rung 0.
    pub min_dt: f32,
    /// Number of populated tiers, in `1..=max_rungs`.
    pub num_rungs: usize,
    /// Substep counter within the macro-step.
    pub substep: usize,
    /// Non-decreasing boundaries; `rung_ranges[0] == 0` and every entry
    /// from `num_rungs` on equals the local group count.
    pub rung_ranges: [usize; MAX_NUM_RUNGS + 1],
    /// Accumulated drift per rung.
    pub dt_drift: [f32; MAX_NUM_RUNGS],
}

impl Timestep {
    /// Hard ceiling on the number of rungs.
    pub const MAX_NUM_RUNGS: usize = MAX_NUM_RUNGS;

    /// The `num_rungs + 1` meaningful boundaries.
    pub fn rung_ranges(&self) -> &[usize] {
        &self.rung_ranges[..=self.num_rungs]
    }

    /// Number of local groups.
    pub fn total_groups(&self) -> usize {
        self.rung_ranges[self.num_rungs]
    }

    /// Step size of rung `r`: `2^r * min_dt`, or `None` past the last
    /// populated rung.
    pub fn rung_dt(&self, r: usize) -> Option<f32> {
        (r < self.num_rungs).then(|| self.min_dt * (1u32 << r) as f32)
    }

    /// The rung of the group at sorted position `sorted_idx`.
    pub fn rung_of(&self, sorted_idx: usize) -> Option<usize> {
        (0..self.num_rungs).find(|&r| sorted_idx < self.rung_ranges[r + 1])
    }

    /// Number of groups in rung `r`.
    pub fn rung_len(&self, r: usize) -> usize {
        if r >= self.num_rungs {
            return 0;
        }
        self.rung_ranges[r + 1] - self.rung_ranges[r]
    }
}

/// The sorted-to-original group permutation: position `i` of the sorted
/// timesteps belongs to group `order[i]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupOrder(Vec<usize>);

impl GroupOrder {
    /// Original group id of sorted position `sorted_idx`.
    pub fn original(&self, sorted_idx: usize) -> usize {
        self.0[sorted_idx]
    }

    /// Original ids of every group in rung `r` of `timestep`.
    pub fn groups_in_rung(&self, timestep: &Timestep, r: usize) -> &[usize] {
        if r >= timestep.num_rungs {
            return &[];
        }
        &self.0[timestep.rung_ranges[r]..timestep.rung_ranges[r + 1]]
    }

    /// The permutation as a slice.
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no groups.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Stable index-sort of `group_dt` ascending.
///
/// `group_dt` is left sorted; the returned permutation maps sorted
/// positions back to the original groups. Equal values keep their
/// original relative order.
pub fn sort_group_dt(group_dt: &mut [f32]) -> GroupOrder {
    let mut order: Vec<usize> = (0..group_dt.len()).collect();
    order.sort_by(|&a, &b| group_dt[a].total_cmp(&group_dt[b]));
    let sorted: Vec<f32> = order.iter().map(|&i| group_dt[i]).collect();
    group_dt.copy_from_slice(&sorted);
    GroupOrder(order)
}

/// Rung boundaries over ascending `sorted_dt`.
///
/// For `r` in `1..num_rungs`, entry `r` is the first index whose value
/// exceeds `2^r * min_dt`. Entry 0 is zero and the rest are
/// `sorted_dt.len()`.
pub fn timestep_range(
    sorted_dt: &[f32],
    min_dt: f32,
    num_rungs: usize,
) -> [usize; MAX_NUM_RUNGS + 1] {
    let mut ranges = [sorted_dt.len(); MAX_NUM_RUNGS + 1];
    ranges[0] = 0;
    let populated = num_rungs.min(MAX_NUM_RUNGS);
    for (r, slot) in ranges.iter_mut().enumerate().take(populated).skip(1) {
        let bound = min_dt * (1u32 << r) as f32;
        *slot = sorted_dt.partition_point(|&dt| dt <= bound);
    }
    ranges
}

/// `min(floor(log2(ref_dt / min_dt)) + 1, max_rungs)`, or 1 when
/// `ref_dt <= min_dt`.
fn rung_count(min_dt: f32, ref_dt: f32, max_rungs: usize) -> usize {
    if ref_dt <= min_dt {
        return 1;
    }
    let levels = (ref_dt / min_dt).log2().floor();
    let count = if levels.is_finite() {
        (levels as usize).saturating_add(1)
    } else {
        // min_dt == 0
        max_rungs
    };
    count.clamp(1, max_rungs)
}

/// Assign every local group to a rung.
///
/// Sorts `group_dt` in place, MIN-reduces `[min, fast-fraction value]`
/// across all ranks of `comm`, and derives the rung layout. A rank with
/// no groups contributes `+inf` to both.
///
/// # Errors
///
/// - [`ScheduleError::InvalidConfig`], [`ScheduleError::LengthMismatch`]
///   and [`ScheduleError::InvalidTimestep`] (negative or non-finite
///   input) are raised before the reduction.
/// - [`ScheduleError::NoGroups`] is raised on every rank when no rank
///   holds a group.
pub fn compute_rung_timestep<C: Communicator>(
    groups: &GroupView,
    group_dt: &mut [f32],
    config: &RungConfig,
    comm: &C,
) -> Result<(Timestep, GroupOrder), ScheduleError> {
    config.validate()?;
    if group_dt.len() != groups.num_groups() {
        return Err(ScheduleError::LengthMismatch {
            expected: groups.num_groups(),
            got: group_dt.len(),
        });
    }
    if let Some((index, &value)) = group_dt
        .iter()
        .enumerate()
        .find(|(_, dt)| !dt.is_finite() || **dt < 0.0)
    {
        return Err(ScheduleError::InvalidTimestep { index, value });
    }

    let order = sort_group_dt(group_dt);
    let n = group_dt.len();
    let local = match n {
        0 => [f32::INFINITY; 2],
        _ => {
            let fast = ((f64::from(config.fast_fraction) * n as f64) as usize).min(n - 1);
            [group_dt[0], group_dt[fast]]
        }
    };
    let global = comm
        .reduce(&local, ReduceOp::Min, ReduceTarget::All)?
        .unwrap_or_else(|| local.to_vec());
    let (min_dt, ref_dt) = (global[0], global[1]);
    if !min_dt.is_finite() {
        return Err(ScheduleError::NoGroups);
    }

    let num_rungs = rung_count(min_dt, ref_dt, config.max_rungs);
    let rung_ranges = timestep_range(group_dt, min_dt, num_rungs);
    debug!(
        min_dt,
        ref_dt,
        num_rungs,
        ranges = ?&rung_ranges[..=num_rungs],
        "rung layout"
    );

    Ok((
        Timestep {
            min_dt,
            num_rungs,
            substep: 0,
            rung_ranges,
            dt_drift: [0.0; MAX_NUM_RUNGS],
        },
        order,
    ))
}

/// A validated [`RungConfig`] bound to the scheduling entry point.
#[derive(Clone, Copy, Debug)]
pub struct RungScheduler {
    config: RungConfig,
}

impl RungScheduler {
    /// Create a scheduler after validating `config`.
    pub fn new(config: RungConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The scheduler configuration.
    pub fn config(&self) -> &RungConfig {
        &self.config
    }

    /// See [`compute_rung_timestep`].
    pub fn compute_rung_timestep<C: Communicator>(
        &self,
        groups: &GroupView,
        group_dt: &mut [f32],
        comm: &C,
    ) -> Result<(Timestep, GroupOrder), ScheduleError> {
        compute_rung_timestep(groups, group_dt, &self.config, comm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_comm::SerialComm;
    use proptest::prelude::*;

    fn schedule(dt: &mut [f32], config: RungConfig) -> Result<(Timestep, GroupOrder), ScheduleError> {
        let groups = GroupView::fixed_size(0, dt.len(), 1);
        compute_rung_timestep(&groups, dt, &config, &SerialComm)
    }

    fn with_fraction(fast_fraction: f32) -> RungConfig {
        RungConfig {
            fast_fraction,
            ..RungConfig::default()
        }
    }

    #[test]
    fn known_layout() {
        let mut dt = [33.0, 1.0, 9.0, 2.0, 17.0, 3.0, 4.0, 8.0, 5.0];
        let (ts, order) = schedule(&mut dt, RungConfig::default()).unwrap();
        // fast index floor(0.4 * 9) = 3 -> ref 4.0, log2(4/1) = 2 -> 3 rungs
        assert_eq!(ts.min_dt, 1.0);
        assert_eq!(ts.num_rungs, 3);
        assert_eq!(ts.rung_ranges, [0, 2, 4, 9, 9]);
        assert_eq!(ts.rung_ranges(), &[0, 2, 4, 9]);
        assert_eq!(dt, [1.0, 2.0, 3.0, 4.0, 5.0, 8.0, 9.0, 17.0, 33.0]);
        assert_eq!(order.as_slice(), &[1, 3, 5, 6, 8, 7, 2, 4, 0]);
        assert_eq!(order.groups_in_rung(&ts, 1), &[5, 6]);
        assert_eq!(ts.substep, 0);
        assert_eq!(ts.dt_drift, [0.0; MAX_NUM_RUNGS]);
    }

    #[test]
    fn equal_values_collapse_to_one_rung() {
        let mut dt = [0.25f32; 7];
        let (ts, _) = schedule(&mut dt, RungConfig::default()).unwrap();
        assert_eq!(ts.num_rungs, 1);
        assert_eq!(ts.rung_ranges, [0, 7, 7, 7, 7]);
        assert_eq!(ts.rung_len(0), 7);
    }

    #[test]
    fn rerun_on_sorted_input_is_identical() {
        let mut dt = [0.3, 0.01, 0.07, 0.02, 0.5, 0.011, 0.9];
        let (first, _) = schedule(&mut dt, RungConfig::default()).unwrap();
        let (second, order) = schedule(&mut dt, RungConfig::default()).unwrap();
        assert_eq!(first, second);
        assert_eq!(order.as_slice(), &[0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn sort_is_stable() {
        let mut dt = [2.0, 1.0, 2.0, 1.0];
        let order = sort_group_dt(&mut dt);
        assert_eq!(order.as_slice(), &[1, 3, 0, 2]);
    }

    #[test]
    fn max_rungs_clamps() {
        let cfg = RungConfig {
            max_rungs: 2,
            fast_fraction: 1.0,
        };
        let (ts, _) = schedule(&mut [1.0, 1000.0], cfg).unwrap();
        assert_eq!(ts.num_rungs, 2);
        assert_eq!(ts.rung_ranges(), &[0, 1, 2]);

        let (ts, _) = schedule(&mut [1.0, 1000.0], with_fraction(1.0)).unwrap();
        assert_eq!(ts.num_rungs, MAX_NUM_RUNGS);
    }

    #[test]
    fn single_group_boundaries() {
        for fast_fraction in [0.0, 0.4, 1.0] {
            let (ts, order) = schedule(&mut [0.125], with_fraction(fast_fraction)).unwrap();
            assert_eq!(ts.num_rungs, 1);
            assert_eq!(ts.rung_ranges(), &[0, 1]);
            assert_eq!(ts.min_dt, 0.125);
            assert_eq!(order.original(0), 0);
        }
    }

    #[test]
    fn fraction_one_reads_the_slowest_group() {
        let (ts, _) = schedule(&mut [1.0, 1.5, 2.0, 3.0, 7.9], with_fraction(1.0)).unwrap();
        // ref 7.9 -> floor(log2 7.9) + 1 = 3
        assert_eq!(ts.num_rungs, 3);
        assert_eq!(ts.rung_ranges(), &[0, 3, 4, 5]);
    }

    #[test]
    fn fraction_zero_gives_one_rung() {
        let (ts, _) = schedule(&mut [1.0, 100.0, 1000.0], with_fraction(0.0)).unwrap();
        assert_eq!(ts.num_rungs, 1);
    }

    #[test]
    fn zero_min_dt_is_accepted() {
        let (ts, _) = schedule(&mut [0.0, 1.0, 2.0], with_fraction(1.0)).unwrap();
        assert_eq!(ts.num_rungs, MAX_NUM_RUNGS);
        assert_eq!(ts.rung_ranges(), &[0, 1, 1, 1, 3]);
    }

    #[test]
    fn invalid_input_is_rejected_with_original_index() {
        for bad in [-1.0, f32::NAN, f32::INFINITY] {
            let err = schedule(&mut [0.5, 0.1, bad], RungConfig::default()).unwrap_err();
            match err {
                ScheduleError::InvalidTimestep { index: 2, .. } => {}
                other => panic!("expected InvalidTimestep at 2, got {other:?}"),
            }
        }
    }

    #[test]
    fn zero_groups_everywhere_is_no_groups() {
        assert_eq!(
            schedule(&mut [], RungConfig::default()),
            Err(ScheduleError::NoGroups)
        );
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let groups = GroupView::fixed_size(0, 4, 1);
        let err = compute_rung_timestep(&groups, &mut [1.0; 3], &RungConfig::default(), &SerialComm);
        assert_eq!(
            err,
            Err(ScheduleError::LengthMismatch {
                expected: 4,
                got: 3
            })
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = RungConfig {
            max_rungs: 9,
            ..RungConfig::default()
        };
        assert!(matches!(
            schedule(&mut [1.0], cfg),
            Err(ScheduleError::InvalidConfig { .. })
        ));
        assert!(RungScheduler::new(cfg).is_err());
    }

    #[test]
    fn timestep_helpers() {
        let mut dt = [1.0, 2.5, 4.5, 9.0];
        let scheduler = RungScheduler::new(with_fraction(1.0)).unwrap();
        let groups = GroupView::fixed_size(0, 4, 1);
        let (ts, _) = scheduler
            .compute_rung_timestep(&groups, &mut dt, &SerialComm)
            .unwrap();
        assert_eq!(ts.num_rungs, 4);
        assert_eq!(ts.rung_ranges(), &[0, 1, 2, 3, 4]);
        assert_eq!(ts.rung_dt(3), Some(8.0));
        assert_eq!(ts.rung_dt(4), None);
        assert_eq!(ts.rung_dt(usize::MAX), None);
        let rungs: Vec<_> = (0..5).map(|i| ts.rung_of(i)).collect();
        assert_eq!(rungs, vec![Some(0), Some(1), Some(2), Some(3), None]);
        assert_eq!(ts.total_groups(), 4);
        assert_eq!(ts.rung_len(7), 0);
    }

    proptest! {
        #[test]
        fn layout_invariants(
            raw in prop::collection::vec(1e-6f32..1e3, 1..200),
            fast_fraction in 0.0f32..=1.0,
            max_rungs in 1usize..=MAX_NUM_RUNGS,
        ) {
            let mut dt = raw.clone();
            let cfg = RungConfig { max_rungs, fast_fraction };
            let (ts, order) = schedule(&mut dt, cfg).unwrap();
            let n = raw.len();

            prop_assert!(ts.num_rungs >= 1 && ts.num_rungs <= max_rungs);
            prop_assert_eq!(ts.rung_ranges[0], 0);
            prop_assert!(ts.rung_ranges.windows(2).all(|w| w[0] <= w[1]));
            prop_assert!(ts.rung_ranges[ts.num_rungs..].iter().all(|&e| e == n));

            // The permutation is a bijection consistent with the sort.
            let mut seen = order.as_slice().to_vec();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..n).collect::<Vec<_>>());
            for i in 0..n {
                prop_assert_eq!(dt[i], raw[order.original(i)]);
            }

            for i in 0..n {
                let r = ts.rung_of(i).unwrap();
                prop_assert!(ts.rung_dt(r).unwrap() <= dt[i]);
                if let Some(next) = ts.rung_dt(r + 1) {
                    prop_assert!(dt[i] <= next);
                }
            }
        }
    }
}
