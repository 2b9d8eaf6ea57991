//! End-to-end tests: the outer loop driving the reference collaborators
//! on small periodic problems.

use std::f64::consts::PI;

use incflow::prelude::*;
use incflow::reference::ActuatorDisk;
use incflow_test_utils::{init_logging, uniform_store, UniformState};

fn energy(vel: &MultiField) -> f64 {
    vel.boxes()
        .iter()
        .flat_map(|b| b.valid().cells().map(move |iv| (0..3).map(|c| b.get(iv, c).powi(2)).sum::<f64>()))
        .sum()
}

fn mean(vel: &MultiField, comp: usize) -> f64 {
    let (sum, n) = vel.boxes().iter().fold((0.0, 0usize), |(s, n), b| {
        let cells = b.valid();
        (s + cells.cells().map(|iv| b.get(iv, comp)).sum::<f64>(), n + cells.num_cells())
    });
    sum / n as f64
}

#[test]
fn planar_taylor_green_vortex_decays() {
    init_logging();
    let mut store = uniform_store(
        16,
        8,
        1,
        UniformState {
            mu: 0.05,
            ..UniformState::default()
        },
    );
    let geom = store.live.vel.layout().geometry().clone();
    let g = geom.clone();
    store.live.vel.set_valid(move |iv, c| {
        let [x, y, _] = g.cell_center(iv).map(|s| 2.0 * PI * s);
        match c {
            0 => x.sin() * y.cos(),
            1 => -x.cos() * y.sin(),
            _ => 0.0,
        }
    });
    fill_boundary(&mut store.live.vel);
    let e0 = energy(&store.live.vel);

    let collab = Collaborators::new(
        Box::new(CentralOperators),
        Box::new(JacobiProjection::new(JacobiConfig::default()).unwrap()),
        Box::new(TableBoundary::new(BcTable::periodic())),
    );
    let config = AdvanceConfig::builder().verbose(1).build().unwrap();
    let mut advancer =
        Advancer::new(config, collab, Box::new(CflBound::default()), Box::new(LocalComm)).unwrap();
    let mut clock = StepClock::new(0.0, -1.0);

    let mut previous = e0;
    for _ in 0..3 {
        let out = advancer.advance(&mut store, &mut clock).unwrap();
        clock.finish_step();
        assert!(out.nans.is_clean());
        let e = energy(&store.live.vel);
        assert!(e < previous, "energy grew: {previous} -> {e}");
        previous = e;
    }
    assert_eq!(clock.nstep, StepIndex(3));
    assert!(previous > 0.8 * e0);
    for c in 0..3 {
        assert!(mean(&store.live.vel, c).abs() < 1e-10);
    }
    assert_eq!(store.live.vel.local_norm0(2).unwrap(), 0.0);
}

#[test]
fn actuator_disk_removes_streamwise_momentum() {
    init_logging();
    let domain = IndexBox::from_extent([10, 4, 4]).unwrap();
    let geom = Geometry::new(domain, [0.0; 3], [1.0; 3], [true; 3]).unwrap();
    let layout = BoxLayout::chop(geom, 5).unwrap().into_shared();
    let mut store = FieldStore::new(layout, 0, 1).unwrap();
    store.live.vel.fill_comp(0, 1, 1.0, 1).unwrap();
    store.live.ro.fill(1.0);

    let disk = ActuatorDisk::builder()
        .center([5.0, 2.0, 2.0])
        .diameter(2.0)
        .thickness(1.0)
        .upstream_offset(3.0)
        .thrust_table(vec![0.0, 5.0, 10.0], vec![0.9, 0.8, 0.4])
        .build()
        .unwrap();
    let forcing = ForcingSet::new().with(ForcingTerm::ActuatorDisk(disk));
    let bound = CflBound::new(forcing.gravity());
    let collab = Collaborators::new(
        Box::new(CentralOperators),
        Box::new(JacobiProjection::new(JacobiConfig::default()).unwrap()),
        Box::new(TableBoundary::new(BcTable::periodic())),
    )
    .with_forcing(Box::new(forcing));
    let mut advancer = Advancer::new(
        AdvanceConfig::default(),
        collab,
        Box::new(bound),
        Box::new(LocalComm),
    )
    .unwrap();

    let out = advancer
        .advance(&mut store, &mut StepClock::new(0.0, -1.0))
        .unwrap();
    assert_eq!(out.dt, 0.5);
    assert!(out.metrics.projection_iterations > 0);

    // about dt * 0.5 ct / thickness over 8 of 160 cells
    let u_mean = mean(&store.live.vel, 0);
    assert!(u_mean > 0.95 && u_mean < 0.999, "mean u = {u_mean}");
    let inside = IntVect::new(4, 1, 1);
    let b = store
        .live
        .vel
        .boxes()
        .iter()
        .find(|b| b.valid().contains(inside))
        .unwrap();
    assert!(b.get(inside, 0) < u_mean);
}
