//! Benchmark driver: run a deterministic operation mix against the engine
//! and report throughput and fill totals.

use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, ValueEnum};

use ticklob::workload::{self, Mode, WorkloadConfig};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    /// Non-crossing add/cancel/replace churn.
    Maintenance,
    /// Crossing traffic; see --cross.
    Match,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Maintenance => Mode::Maintenance,
            ModeArg::Match => Mode::Match,
        }
    }
}

impl std::fmt::Display for ModeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ModeArg::Maintenance => "maintenance",
            ModeArg::Match => "match",
        })
    }
}

#[derive(Parser)]
#[command(name = "workload", about = "Deterministic matching engine workload driver")]
struct Cli {
    /// Traffic shape.
    #[arg(long, value_enum, default_value_t = ModeArg::Match)]
    mode: ModeArg,

    /// Number of operations to run.
    #[arg(long, default_value_t = 5_000_000)]
    ops: u64,

    /// RNG seed; identical seeds reproduce identical runs.
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Percent of match-mode orders priced aggressively (0..=100).
    #[arg(long, default_value_t = 50)]
    cross: u8,

    /// Percent of operations that submit a new order.
    #[arg(long, default_value_t = 60)]
    add: u8,

    /// Percent of operations that cancel a live order.
    #[arg(long, default_value_t = 25)]
    cancel: u8,

    /// Percent of operations that replace a live order.
    #[arg(long, default_value_t = 15)]
    replace: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = WorkloadConfig {
        mode: cli.mode.into(),
        ops: cli.ops,
        seed: cli.seed,
        cross_pct: cli.cross,
        add_pct: cli.add,
        cancel_pct: cli.cancel,
        replace_pct: cli.replace,
    };

    if let Err(err) = config.validate() {
        eprintln!("workload: {err}");
        return ExitCode::FAILURE;
    }

    let start = Instant::now();
    let stats = workload::run(&config);
    let elapsed = start.elapsed().as_secs_f64();

    println!("Ops: {}", stats.ops);
    println!("Seconds: {elapsed:.3}");
    println!("Ops/sec: {:.0}", stats.ops as f64 / elapsed);
    println!("Trades: {}", stats.trades);
    println!("Total filled qty: {}", stats.total_qty);
    println!("Live orders: {}", stats.engine_live);

    ExitCode::SUCCESS
}
