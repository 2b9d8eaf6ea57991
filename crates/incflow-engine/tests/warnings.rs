//! Recoverable conditions are reported through `log::warn!`.
//!
//! Kept in its own test binary: the capturing logger is process-global.

use std::sync::Mutex;

use incflow_engine::{AdvanceConfig, Advancer, Collaborators, StepClock};
use incflow_grid::{IntVect, LocalComm};
use incflow_test_utils::{
    uniform_store, ConstantOperators, FixedBound, IdentityProjection, PeriodicBoundary,
    UniformState,
};
use log::{Level, LevelFilter, Log, Metadata, Record};

struct Capture(Mutex<Vec<(Level, String)>>);

impl Capture {
    fn take(&self) -> Vec<(Level, String)> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    fn warnings(&self) -> Vec<String> {
        self.take()
            .into_iter()
            .filter(|(level, _)| *level == Level::Warn)
            .map(|(_, msg)| msg)
            .collect()
    }
}

impl Log for Capture {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.0
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture(Mutex::new(Vec::new()));

fn advancer(fixed_dt: f64, bound: f64) -> Advancer {
    let collab = Collaborators::new(
        Box::new(ConstantOperators::zero()),
        Box::new(IdentityProjection::new()),
        Box::new(PeriodicBoundary::default()),
    );
    let config = AdvanceConfig::builder().fixed_dt(fixed_dt).build().unwrap();
    Advancer::new(config, collab, Box::new(FixedBound(bound)), Box::new(LocalComm)).unwrap()
}

#[test]
fn violations_and_nans_are_warned_not_raised() {
    log::set_logger(&CAPTURE).unwrap();
    log::set_max_level(LevelFilter::Trace);
    let state = UniformState {
        vel: [1.0, 0.0, 0.0],
        ..UniformState::default()
    };

    // fixed step larger than the stable bound
    let mut store = uniform_store(4, 4, 1, state);
    let out = advancer(0.05, 0.01)
        .advance(&mut store, &mut StepClock::new(0.0, -1.0))
        .unwrap();
    assert_eq!(out.dt, 0.05);
    let warnings = CAPTURE.warnings();
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert!(warnings[0].starts_with("fixed_dt does not satisfy CFL condition"));
    assert!(warnings[0].contains("5e-2"), "{}", warnings[0]);

    // fixed step within the bound
    let mut store = uniform_store(4, 4, 1, state);
    advancer(0.05, 1.0)
        .advance(&mut store, &mut StepClock::new(0.0, -1.0))
        .unwrap();
    assert!(CAPTURE.warnings().is_empty());

    // non-finite pressure
    let mut store = uniform_store(4, 4, 1, state);
    let lo = store.live.p.boxes()[0].valid().lo();
    store.live.p.boxes_mut()[0].set(lo + IntVect::new(1, 1, 1), 0, f64::NAN);
    let out = advancer(0.05, 1.0)
        .advance(&mut store, &mut StepClock::new(0.0, -1.0))
        .unwrap();
    assert_eq!(out.nans.fields, vec!["p"]);
    assert_eq!(CAPTURE.warnings(), vec!["p contains NaNs".to_string()]);
}
