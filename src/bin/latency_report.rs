//! Profiling wrapper: per-operation latency percentiles for the engine
//! under the deterministic workload.
//!
//! Pins to the last CPU core, generates each operation outside the timed
//! section, and records the engine call into an HDR histogram.

use std::time::Instant;

use hdrhistogram::Histogram;

use ticklob::workload::{Driver, WorkloadConfig};

const OPS: u64 = 1_000_000;

fn pin_to_last_core() {
    if let Some(core_ids) = core_affinity::get_core_ids() {
        if let Some(last_core) = core_ids.last() {
            core_affinity::set_for_current(*last_core);
        }
    }
}

fn main() {
    pin_to_last_core();

    let config = WorkloadConfig { ops: OPS, ..Default::default() };
    let mut driver = Driver::new(config);

    // Warm the pool, the ladders, and the branch predictor before measuring.
    let warmup = OPS / 10;
    for _ in 0..warmup {
        if let Some(op) = driver.next_op() {
            driver.apply(op);
        }
    }

    let mut histogram = match Histogram::<u64>::new_with_bounds(1, 10_000_000, 3) {
        Ok(h) => h,
        Err(err) => {
            eprintln!("latency_report: histogram setup failed: {err}");
            std::process::exit(1);
        }
    };

    println!("Running {OPS} timed operations...");

    let run_start = Instant::now();
    for _ in 0..OPS {
        let Some(op) = driver.next_op() else { continue };

        let start = Instant::now();
        driver.apply(op);
        let nanos = start.elapsed().as_nanos() as u64;

        histogram.record(nanos).unwrap_or(());
    }
    let elapsed = run_start.elapsed().as_secs_f64();

    let stats = driver.stats();

    println!("\n=== Latency Report (ns) ===");
    println!("p50:    {}", histogram.value_at_quantile(0.50));
    println!("p90:    {}", histogram.value_at_quantile(0.90));
    println!("p99:    {}", histogram.value_at_quantile(0.99));
    println!("p99.9:  {}", histogram.value_at_quantile(0.999));
    println!("max:    {}", histogram.max());
    println!("\n=== Throughput ===");
    println!("Ops/sec: {:.0}", OPS as f64 / elapsed);
    println!("Trades: {}", stats.trades);
    println!("Live orders: {}", stats.engine_live);
}
