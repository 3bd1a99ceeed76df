//! Rung layout derived from a gravity step.

use cadence_comm::Communicator;
use cadence_core::{Backend, Executor, Field, FieldSet, Parallel, Serial, StepError};
use cadence_domain::{Domain, LocalDomain, SfcDomain};
use cadence_engine::{
    HostNbodyPropagator, Propagator, PropagatorConfig, RungTimestepper, TimestepError,
};
use cadence_test_utils::{run_ranks, ParticleCloud};
use cadence_timestep::{RungConfig, TimestepConfig};

fn timestepper<E: Executor>(group_size: usize) -> RungTimestepper<E> {
    RungTimestepper::new(TimestepConfig::default(), RungConfig::default(), group_size).unwrap()
}

#[test]
fn rungs_cover_every_owned_group() {
    let mut prop = HostNbodyPropagator::new(PropagatorConfig::default()).unwrap();
    let mut domain = LocalDomain::new(2, 2);
    let mut data = ParticleCloud::cluster(64, [0.0; 3], 1.0, 3).into_data(Backend::Host, FieldSet::empty());
    <HostNbodyPropagator as Propagator<LocalDomain>>::activate_fields(&prop, &mut data);
    data.set_dependent(FieldSet::of(&[Field::Divv]));
    let n = data.len();
    for field in data.dependent().iter() {
        data.load(field, vec![0.0; n]);
    }
    prop.step(&mut domain, &mut data).unwrap();

    let layout = timestepper::<Serial>(8).compute(&domain, &data).unwrap();
    assert_eq!(layout.groups.num_groups(), 8);
    assert_eq!(layout.groups.first_body, 2);
    let ts = layout.timestep;
    assert!(ts.num_rungs >= 1 && ts.num_rungs <= 4);
    assert_eq!(ts.rung_ranges()[ts.num_rungs], 8);
    assert_eq!(ts.min_dt, layout.group_dt[0]);
    assert!(layout.group_dt.windows(2).all(|w| w[0] <= w[1]));

    let mut seen: Vec<usize> = (0..ts.num_rungs)
        .flat_map(|r| layout.order.groups_in_rung(&ts, r).to_vec())
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..8).collect::<Vec<_>>());
}

#[test]
fn missing_divergence_is_an_evaluation_error() {
    let mut domain = LocalDomain::new(0, 0);
    let mut data = ParticleCloud::two_body().into_data(Backend::Host, FieldSet::of(&[Field::Ax, Field::Ay, Field::Az]));
    let dependent = data.dependent();
    domain.sync(&mut data, FieldSet::empty(), dependent).unwrap();
    match timestepper::<Serial>(1).compute(&domain, &data) {
        Err(TimestepError::Evaluate(StepError::LengthMismatch { field: Field::Divv, .. })) => {}
        other => panic!("expected Evaluate(LengthMismatch), got {other:?}"),
    }
}

#[test]
fn ranks_agree_on_the_global_minimum() {
    let results = run_ranks(3, |comm| {
        let rank = comm.rank();
        let fields = FieldSet::of(&[Field::Ax, Field::Ay, Field::Az, Field::Divv]);
        let mut data = ParticleCloud::uniform_cube(12, 0.01, rank as u64).into_data(Backend::Accelerated, fields);
        // Rank 1 holds the most violently diverging particle.
        let divv: Vec<f64> = (0..12).map(|i| if rank == 1 && i == 7 { 400.0 } else { 1.0 }).collect();
        data.load(Field::Divv, divv);
        let mut domain = SfcDomain::new(comm, 0);
        let dependent = data.dependent();
        domain.sync(&mut data, FieldSet::of(&[Field::Divv]), dependent).unwrap();
        let layout = timestepper::<Parallel>(4).compute(&domain, &data).unwrap();
        layout.timestep
    });
    for ts in &results {
        assert_eq!(ts.min_dt, 0.2f32 / 400.0);
        assert_eq!(ts.num_rungs, results[0].num_rungs);
    }
}

#[test]
fn zero_group_size_is_rejected() {
    let err = RungTimestepper::<Serial>::new(TimestepConfig::default(), RungConfig::default(), 0).unwrap_err();
    assert_eq!(err.to_string(), "group_size: must be at least 1");
}

#[test]
fn group_at_rest_gets_the_timestep_ceiling() {
    let fields = FieldSet::of(&[Field::Ax, Field::Ay, Field::Az, Field::Divv]);
    let mut data = ParticleCloud::uniform_cube(8, 0.01, 5).into_data(Backend::Host, fields);
    let mut domain = LocalDomain::new(0, 0);
    domain.sync(&mut data, FieldSet::empty(), fields).unwrap();
    // Group 0 has no divergence and no acceleration.
    data.load(Field::Divv, vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);

    let layout = timestepper::<Serial>(4).compute(&domain, &data).unwrap();
    assert_eq!(layout.group_dt, vec![0.2, f32::MAX]);
    assert_eq!(layout.order.as_slice(), &[1, 0]);
    assert_eq!(layout.timestep.min_dt, 0.2);
    assert_eq!(layout.timestep.num_rungs, 1);

    let capped = TimestepConfig {
        max_dt: 0.1,
        ..TimestepConfig::default()
    };
    let layout = RungTimestepper::<Serial>::new(capped, RungConfig::default(), 4)
        .unwrap()
        .compute(&domain, &data)
        .unwrap();
    assert_eq!(layout.group_dt, vec![0.1, 0.1]);
    assert_eq!(layout.timestep.min_dt, 0.1);
}
