//! Decaying Taylor-Green vortex driven step by step.
//!
//! Demonstrates: build a level → advance → move the clock → read
//! diagnostics → repeat until the stop time.
//!
//! Run with `RUST_LOG=info` to see the step banners.

use incflow_bench::{kinetic_energy, reference_profile};

fn main() {
    env_logger::init();
    println!("=== incflow Taylor-Green example ===\n");

    let mut level = reference_profile(16, 42).unwrap();
    level.clock.stop_time = 0.25;
    let e0 = kinetic_energy(&level.store.live.vel);

    while level.clock.time < level.clock.stop_time {
        let out = level
            .advancer
            .advance(&mut level.store, &mut level.clock)
            .unwrap();
        level.clock.finish_step();
        if !out.nans.is_clean() {
            log::error!("non-finite fields: {:?}", out.nans.fields);
            break;
        }

        let step = level.clock.nstep.0;
        if step % 10 == 0 || level.clock.time >= level.clock.stop_time {
            let e = kinetic_energy(&level.store.live.vel);
            println!(
                "  step {:>4}: t={:>8.5}, dt={:>9.3e}, E/E0={:>8.5}, projection iters={:>4}, time={:>6}μs",
                step,
                level.clock.time,
                out.dt,
                e / e0,
                out.metrics.projection_iterations,
                out.metrics.total_us,
            );
        }
    }

    println!("\nDone after {} steps.", level.clock.nstep);
}
