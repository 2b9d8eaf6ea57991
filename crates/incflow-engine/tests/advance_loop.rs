//! Integration tests for the outer loop: step-size selection, steady-state
//! iteration, error propagation and NaN reporting.

use std::f64::consts::PI;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use incflow_core::SolverError;
use incflow_engine::{
    AdvanceConfig, AdvanceOutcome, Advancer, Collaborators, ConfigError, StepClock, StepError,
};
use incflow_field::FieldStore;
use incflow_grid::{
    BcTable, BoxLayout, ChannelComm, CommError, Communicator, Geometry, IntVect, LocalComm,
};
use incflow_ops::{Projection, StabilityBound};
use incflow_reference::{CentralOperators, CflBound, JacobiConfig, JacobiProjection, TableBoundary};
use incflow_test_utils::{
    init_logging, uniform_store, ConstantForcing, ConstantOperators, FailingDiffusion,
    FailingProjection, FixedBound, IdentityProjection, PeriodicBoundary, UniformState,
};

fn mock_collab() -> Collaborators {
    Collaborators::new(
        Box::new(ConstantOperators::zero()),
        Box::new(IdentityProjection::new()),
        Box::new(PeriodicBoundary::default()),
    )
}

fn advancer(config: AdvanceConfig, collab: Collaborators, bound: impl StabilityBound + 'static) -> Advancer {
    Advancer::new(config, collab, Box::new(bound), Box::new(LocalComm)).unwrap()
}

fn moving(vel: [f64; 3]) -> UniformState {
    UniformState {
        vel,
        ..UniformState::default()
    }
}

// ── Step size ────────────────────────────────────────────────────

#[test]
fn uniform_inflow_is_a_fixed_point() {
    init_logging();
    let mut store = uniform_store(
        8,
        4,
        1,
        UniformState {
            vel: [1.0, 0.0, 0.0],
            p: 2.0,
            ..UniformState::default()
        },
    );
    let collab = Collaborators::new(
        Box::new(CentralOperators),
        Box::new(JacobiProjection::new(JacobiConfig::default()).unwrap()),
        Box::new(TableBoundary::new(BcTable::periodic())),
    );
    let config = AdvanceConfig::builder().cfl(0.5).verbose(1).build().unwrap();
    let mut adv = advancer(config, collab, CflBound::default());
    let mut clock = StepClock::new(0.0, -1.0);

    let out = adv.advance(&mut store, &mut clock).unwrap();

    // c = |u| / dx = 8, dt = 0.5 / 8
    assert!((out.dt - 0.0625).abs() < 1e-15);
    assert_eq!(clock.prev_dt, out.dt);
    assert_eq!(out.iterations, 1);
    assert!(out.converged);
    assert!(out.nans.is_clean());
    assert_eq!(out.metrics.projection_iterations, 0);

    let live = &store.live;
    assert_eq!(live.vel.local_norm0(0).unwrap(), 1.0);
    assert_eq!(live.vel.local_norm1(0).unwrap(), 512.0);
    assert_eq!(live.vel.local_norm0(1).unwrap(), 0.0);
    assert_eq!(live.vel.local_norm0(2).unwrap(), 0.0);
    assert_eq!(live.p.local_norm0(0).unwrap(), 2.0);
    assert_eq!(live.p.local_norm1(0).unwrap(), 1024.0);

    clock.finish_step();
    assert_eq!(clock.nstep.0, 1);
    assert!((clock.time - 0.0625).abs() < 1e-15);
}

#[test]
fn fixed_dt_wins_over_violated_bound() {
    let mut store = uniform_store(4, 4, 1, moving([1.0, 0.0, 0.0]));
    let config = AdvanceConfig::builder().fixed_dt(0.05).build().unwrap();
    let mut adv = advancer(config, mock_collab(), FixedBound(0.01));
    let mut clock = StepClock::new(0.0, -1.0);

    let out = adv.advance(&mut store, &mut clock).unwrap();
    assert_eq!(out.dt, 0.05);
    assert_eq!(clock.dt, 0.05);
    assert_eq!(out.metrics.cfl_violations, 1);
}

#[test]
fn fixed_dt_within_bound_is_not_a_violation() {
    let mut store = uniform_store(4, 4, 1, UniformState::default());
    let config = AdvanceConfig::builder().fixed_dt(0.05).build().unwrap();
    let mut adv = advancer(config, mock_collab(), FixedBound(1.0));
    let out = adv.advance(&mut store, &mut StepClock::new(0.0, -1.0)).unwrap();
    assert_eq!(out.dt, 0.05);
    assert_eq!(out.metrics.cfl_violations, 0);
}

#[test]
fn quiescent_field_without_cap_is_rejected() {
    let mut store = uniform_store(4, 4, 1, UniformState::default());
    let mut adv = advancer(AdvanceConfig::default(), mock_collab(), CflBound::default());
    let err = adv
        .advance(&mut store, &mut StepClock::new(0.0, -1.0))
        .unwrap_err();
    assert!(matches!(err, StepError::UnboundedStep { .. }));
}

// ── Steady state ─────────────────────────────────────────────────

#[test]
fn unchanging_state_converges_on_second_iteration() {
    init_logging();
    let mut store = uniform_store(4, 2, 1, moving([0.5, -0.25, 0.0]));
    let projection = IdentityProjection::new();
    let calls = projection.counter();
    let collab = Collaborators::new(
        Box::new(ConstantOperators::zero()),
        Box::new(projection),
        Box::new(PeriodicBoundary::default()),
    );
    let config = AdvanceConfig::builder().steady_state(1e-5).build().unwrap();
    let mut adv = advancer(config, collab, FixedBound(0.1));

    let out = adv.advance(&mut store, &mut StepClock::new(0.0, -1.0)).unwrap();
    assert!(out.converged);
    assert_eq!(out.iterations, 2);
    assert_eq!(calls.load(Ordering::Relaxed), 4);
    let last = out.metrics.last_steady.unwrap();
    assert!(last.absolute_rate_met);
    assert!(last.relative_change_met);
    assert_eq!(last.rate, [0.0; 3]);
}

#[test]
fn steady_iteration_cap_is_an_error() {
    let mut store = uniform_store(4, 4, 1, moving([1.0, 0.0, 0.0]));
    let collab = mock_collab().with_forcing(Box::new(ConstantForcing::new([1.0, 0.0, 0.0])));
    let config = AdvanceConfig::builder()
        .steady_state(1e-5)
        .max_steady_iterations(3)
        .build()
        .unwrap();
    let mut adv = advancer(config, collab, FixedBound(0.1));

    let err = adv
        .advance(&mut store, &mut StepClock::new(0.0, -1.0))
        .unwrap_err();
    assert_eq!(err, StepError::SteadyStateNotReached { iterations: 3 });
    // three forced iterations of dt * 1
    assert!((store.live.vel.local_norm0(0).unwrap() - 1.3).abs() < 1e-12);
}

#[test]
fn steady_state_ignores_stop_time() {
    let mut store = uniform_store(4, 4, 1, moving([1.0, 0.0, 0.0]));
    let config = AdvanceConfig::builder().steady_state(1e-5).build().unwrap();
    let bound = CflBound::default();
    let mut adv = advancer(config, mock_collab(), bound);
    let mut clock = StepClock::new(0.99, 1.0);
    let out = adv.advance(&mut store, &mut clock).unwrap();
    // 0.5 / (1 / 0.25), not the 0.01 left before the stop time
    assert!((out.dt - 0.125).abs() < 1e-15);
}

// ── Failures ─────────────────────────────────────────────────────

#[test]
fn projection_failure_in_corrector_propagates() {
    let mut store = uniform_store(4, 4, 1, moving([1.0, 0.0, 0.0]));
    let collab = Collaborators::new(
        Box::new(ConstantOperators::zero()),
        Box::new(FailingProjection::new(1)),
        Box::new(PeriodicBoundary::default()),
    );
    let mut adv = advancer(AdvanceConfig::default(), collab, FixedBound(0.1));
    let err = adv
        .advance(&mut store, &mut StepClock::new(0.0, -1.0))
        .unwrap_err();
    match err {
        StepError::Solver(SolverError::Failed { solver, .. }) => {
            assert_eq!(solver, "failing_projection");
        }
        other => panic!("expected a solver failure, got {other:?}"),
    }
}

#[test]
fn diffusion_failure_propagates() {
    let mut store = uniform_store(4, 4, 1, UniformState::default());
    let collab = mock_collab().with_diffusion(Box::new(FailingDiffusion));
    let config = AdvanceConfig::builder().explicit_diffusion(false).build().unwrap();
    let mut adv = advancer(config, collab, FixedBound(0.1));
    let err = adv
        .advance(&mut store, &mut StepClock::new(0.0, -1.0))
        .unwrap_err();
    assert!(matches!(
        err,
        StepError::Solver(SolverError::NotConverged { iterations: 100, .. })
    ));
}

#[test]
fn implicit_diffusion_requires_a_solver() {
    let config = AdvanceConfig::builder().explicit_diffusion(false).build().unwrap();
    let result = Advancer::new(
        config,
        mock_collab(),
        Box::new(FixedBound(0.1)),
        Box::new(LocalComm),
    );
    assert!(matches!(result, Err(ConfigError::MissingDiffusionSolver)));
}

#[test]
fn zero_density_is_an_invariant_violation() {
    let mut store = uniform_store(
        4,
        4,
        1,
        UniformState {
            ro: 0.0,
            ..UniformState::default()
        },
    );
    let mut adv = advancer(AdvanceConfig::default(), mock_collab(), FixedBound(0.1));
    let err = adv
        .advance(&mut store, &mut StepClock::new(0.0, -1.0))
        .unwrap_err();
    assert!(matches!(err, StepError::Invariant(_)));
}

#[test]
fn nan_pressure_is_reported_not_raised() {
    let mut store = uniform_store(4, 2, 1, UniformState::default());
    let lo = store.live.p.boxes()[3].valid().lo();
    store.live.p.boxes_mut()[3].set(lo + IntVect::new(1, 0, 1), 0, f64::NAN);
    let mut adv = advancer(AdvanceConfig::default(), mock_collab(), FixedBound(0.1));
    let out = adv.advance(&mut store, &mut StepClock::new(0.0, -1.0)).unwrap();
    assert_eq!(out.nans.fields, vec!["p"]);
}

// ── Multiple workers ─────────────────────────────────────────────

#[test]
fn workers_agree_on_steady_convergence() {
    let geom = Geometry::periodic_cube(4).unwrap();
    let layout = BoxLayout::chop(geom, 2)
        .unwrap()
        .distribute(2)
        .unwrap()
        .into_shared();

    let outcomes: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = ChannelComm::group(2)
            .into_iter()
            .enumerate()
            .map(|(rank, comm)| {
                let layout = layout.clone();
                s.spawn(move || {
                    let mut store = FieldStore::new(layout, rank, 1).unwrap();
                    store.live.vel.fill(0.5);
                    store.live.ro.fill(1.0);
                    let config = AdvanceConfig::builder().steady_state(1e-5).build().unwrap();
                    let mut adv = Advancer::new(
                        config,
                        mock_collab(),
                        Box::new(FixedBound(0.1)),
                        Box::new(comm),
                    )
                    .unwrap();
                    adv.advance(&mut store, &mut StepClock::new(0.0, -1.0))
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(outcomes.len(), 2);
    for out in &outcomes {
        assert!(out.converged);
        assert_eq!(out.iterations, 2);
        assert_eq!(out.dt, 0.1);
    }
}

fn vortex_store(layout: Arc<BoxLayout>, rank: usize) -> FieldStore {
    let mut store = FieldStore::new(layout, rank, 1).unwrap();
    store.live.ro.fill(1.0);
    let g = store.live.vel.layout().geometry().clone();
    store.live.vel.set_valid(move |iv, c| {
        let [x, y, z] = g.cell_center(iv).map(|s| 2.0 * PI * s);
        match c {
            0 => x.sin() * y.cos() * z.cos(),
            1 => -x.cos() * y.sin() * z.cos(),
            _ => 0.3 * (x + z).sin(),
        }
    });
    store
}

fn reference_advancer(comm: Box<dyn Communicator>) -> Advancer {
    let collab = Collaborators::new(
        Box::new(CentralOperators),
        Box::new(JacobiProjection::new(JacobiConfig::default()).unwrap()),
        Box::new(TableBoundary::new(BcTable::periodic())),
    );
    let config = AdvanceConfig::builder().fixed_dt(0.01).build().unwrap();
    Advancer::new(config, collab, Box::new(CflBound::default()), comm).unwrap()
}

#[test]
fn two_workers_reproduce_one_on_a_vortex() {
    init_logging();
    let layout = |workers| {
        BoxLayout::chop(Geometry::periodic_cube(8).unwrap(), 4)
            .unwrap()
            .distribute(workers)
            .unwrap()
            .into_shared()
    };

    let mut single = vortex_store(layout(1), 0);
    let expected = reference_advancer(Box::new(LocalComm))
        .advance(&mut single, &mut StepClock::new(0.0, -1.0))
        .unwrap();
    assert!(expected.metrics.projection_iterations > 0);

    let shared = layout(2);
    let results: Vec<(FieldStore, AdvanceOutcome)> = std::thread::scope(|s| {
        let handles: Vec<_> = ChannelComm::group(2)
            .into_iter()
            .enumerate()
            .map(|(rank, comm)| {
                let layout = shared.clone();
                s.spawn(move || {
                    let mut store = vortex_store(layout, rank);
                    let out = reference_advancer(Box::new(comm))
                        .advance(&mut store, &mut StepClock::new(0.0, -1.0))
                        .unwrap();
                    (store, out)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut compared = 0;
    for (store, out) in &results {
        assert_eq!(out.dt, expected.dt);
        assert_eq!(
            out.metrics.projection_iterations,
            expected.metrics.projection_iterations
        );
        for (field, reference) in [
            (&store.live.vel, &single.live.vel),
            (&store.live.p, &single.live.p),
            (&store.live.gp, &single.live.gp),
        ] {
            for b in field.boxes() {
                let r = &reference.boxes()[b.index()];
                for iv in b.valid().cells() {
                    for c in 0..field.ncomp() {
                        let (got, want) = (b.get(iv, c), r.get(iv, c));
                        assert!(
                            (got - want).abs() <= 1e-12 * (1.0 + want.abs()),
                            "{} box {} cell {iv} comp {c}: {got} vs {want}",
                            field.name(),
                            b.index()
                        );
                        compared += 1;
                    }
                }
            }
        }
    }
    // every cell of vel, gp and p seen once
    assert_eq!(compared, 512 * 7);
}

#[test]
fn failing_worker_releases_its_peer() {
    let layout = BoxLayout::chop(Geometry::periodic_cube(4).unwrap(), 2)
        .unwrap()
        .distribute(2)
        .unwrap()
        .into_shared();

    let results: Vec<Result<AdvanceOutcome, StepError>> = std::thread::scope(|s| {
        let handles: Vec<_> = ChannelComm::group(2)
            .into_iter()
            .enumerate()
            .map(|(rank, comm)| {
                let layout = layout.clone();
                s.spawn(move || {
                    let mut store = FieldStore::new(layout, rank, 1).unwrap();
                    store.live.vel.fill(0.5);
                    store.live.ro.fill(1.0);
                    let projection: Box<dyn Projection> = if rank == 1 {
                        Box::new(FailingProjection::new(0))
                    } else {
                        Box::new(IdentityProjection::new())
                    };
                    let collab = Collaborators::new(
                        Box::new(ConstantOperators::zero()),
                        projection,
                        Box::new(PeriodicBoundary::default()),
                    );
                    let mut adv = Advancer::new(
                        AdvanceConfig::default(),
                        collab,
                        Box::new(FixedBound(0.1)),
                        Box::new(comm),
                    )
                    .unwrap();
                    adv.advance(&mut store, &mut StepClock::new(0.0, -1.0))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(matches!(results[1], Err(StepError::Solver(_))));
    assert!(matches!(
        results[0],
        Err(StepError::Comm(CommError::Disconnected { rank: 0, .. }))
    ));
}
