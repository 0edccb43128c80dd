//! Deterministic workload generation for benchmarks and reproducibility
//! tests.
//!
//! The [`Driver`] rolls a seeded ChaCha8 stream against a configurable
//! add/cancel/replace mix and mirrors the engine's live population in a
//! [`LiveSet`], pruning it from the sink's closed-order list after every
//! operation. Generation ([`Driver::next_op`]) is split from execution
//! ([`Driver::apply`]) so the profiling harness can time engine work without
//! timing the RNG. For a fixed config the resulting trade count, filled qty,
//! and live counts are bitwise reproducible.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::engine::Engine;
use crate::ladder::Band;
use crate::order::{Order, OrderId, Price, Qty, Side};
use crate::sink::RecordingSink;

/// Shape of the generated traffic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Bids price strictly below the band midpoint and asks strictly above
    /// it, so no order ever crosses: pure book-maintenance churn.
    Maintenance,
    /// Orders land on the aggressive half of the band with probability
    /// `cross_pct`/100, driving real matching traffic.
    Match,
}

/// An invalid workload configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkloadError {
    #[error("operation mix {add}/{cancel}/{replace} must sum to 100")]
    BadMix { add: u8, cancel: u8, replace: u8 },
    #[error("cross percentage {0} must be in 0..=100")]
    BadCross(u8),
    #[error("workload needs at least one operation")]
    NoOps,
}

/// Full description of a workload run.
#[derive(Clone, Copy, Debug)]
pub struct WorkloadConfig {
    pub mode: Mode,
    pub ops: u64,
    pub seed: u64,
    /// Probability (percent) that a Match-mode order prices aggressively.
    pub cross_pct: u8,
    pub add_pct: u8,
    pub cancel_pct: u8,
    pub replace_pct: u8,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Match,
            ops: 5_000_000,
            seed: 12345,
            cross_pct: 50,
            add_pct: 60,
            cancel_pct: 25,
            replace_pct: 15,
        }
    }
}

impl WorkloadConfig {
    pub fn validate(&self) -> Result<(), WorkloadError> {
        let sum = u32::from(self.add_pct) + u32::from(self.cancel_pct) + u32::from(self.replace_pct);
        if sum != 100 {
            return Err(WorkloadError::BadMix {
                add: self.add_pct,
                cancel: self.cancel_pct,
                replace: self.replace_pct,
            });
        }
        if self.cross_pct > 100 {
            return Err(WorkloadError::BadCross(self.cross_pct));
        }
        if self.ops == 0 {
            return Err(WorkloadError::NoOps);
        }
        Ok(())
    }
}

/// Counters reported by a workload run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkloadStats {
    pub ops: u64,
    pub trades: u64,
    pub total_qty: u64,
    /// Resting orders per the engine's index.
    pub engine_live: usize,
    /// Resting orders per the driver's own tracking.
    pub tracker_live: usize,
}

/// One generated operation.
#[derive(Clone, Copy, Debug)]
pub enum Op {
    Submit(Order),
    Cancel(OrderId),
    Replace { id: OrderId, price: Price, qty: Qty },
}

/// The driver's mirror of which ids are resting: a swap-remove id vector
/// plus a dense id -> position array, giving O(1) add/remove/contains and
/// uniform random picks.
pub struct LiveSet {
    ids: Vec<OrderId>,
    pos: Vec<i32>,
}

const NO_POS: i32 = -1;

impl LiveSet {
    pub fn new(max_order_id: OrderId) -> Self {
        Self {
            ids: Vec::new(),
            pos: vec![NO_POS; max_order_id as usize + 1],
        }
    }

    #[inline]
    pub fn contains(&self, id: OrderId) -> bool {
        self.pos.get(id as usize).map_or(false, |&p| p != NO_POS)
    }

    #[inline]
    pub fn add(&mut self, id: OrderId) {
        let idx = id as usize;
        if idx >= self.pos.len() {
            self.pos.resize(idx + 1, NO_POS);
        }
        if self.pos[idx] != NO_POS {
            return;
        }
        self.pos[idx] = self.ids.len() as i32;
        self.ids.push(id);
    }

    #[inline]
    pub fn remove(&mut self, id: OrderId) {
        let Some(&p) = self.pos.get(id as usize) else { return };
        if p == NO_POS {
            return;
        }

        let last = self.ids.len() - 1;
        let p = p as usize;
        if p != last {
            let moved = self.ids[last];
            self.ids[p] = moved;
            self.pos[moved as usize] = p as i32;
        }
        self.ids.pop();
        self.pos[id as usize] = NO_POS;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Uniformly random live id. Must not be called on an empty set.
    #[inline]
    pub fn pick(&self, rng: &mut ChaCha8Rng) -> OrderId {
        self.ids[rng.gen_range(0..self.ids.len())]
    }
}

/// Price generator over the interior half of the band, split at the
/// midpoint so Maintenance traffic can stay uncrossed.
struct PriceGen {
    mid: Price,
    spread: Price,
}

impl PriceGen {
    fn new(band: Band) -> Self {
        let mid = (band.min_tick() + band.max_tick()) / 2;
        // Quarter of the band each way keeps generated prices interior.
        let spread = ((band.max_tick() - band.min_tick()) / 4).max(1);
        Self { mid, spread }
    }

    /// A price that cannot cross the opposite half.
    fn passive(&self, rng: &mut ChaCha8Rng, side: Side) -> Price {
        match side {
            Side::Buy => rng.gen_range(self.mid - self.spread..self.mid),
            Side::Sell => rng.gen_range(self.mid + 1..=self.mid + self.spread),
        }
    }

    /// A price on the opposite half, likely to cross.
    fn aggressive(&self, rng: &mut ChaCha8Rng, side: Side) -> Price {
        match side {
            Side::Buy => rng.gen_range(self.mid..=self.mid + self.spread),
            Side::Sell => rng.gen_range(self.mid - self.spread..=self.mid),
        }
    }

    fn next(&self, rng: &mut ChaCha8Rng, side: Side, mode: Mode, cross_pct: u8) -> Price {
        match mode {
            Mode::Maintenance => self.passive(rng, side),
            Mode::Match => {
                if rng.gen_range(0..100u8) < cross_pct {
                    self.aggressive(rng, side)
                } else {
                    self.passive(rng, side)
                }
            }
        }
    }
}

/// Owns an engine plus everything needed to feed it deterministic traffic.
pub struct Driver {
    config: WorkloadConfig,
    engine: Engine,
    sink: RecordingSink,
    live: LiveSet,
    rng: ChaCha8Rng,
    prices: PriceGen,
    /// Side each id went in on; replace preserves side, so its new price
    /// must stay side-consistent.
    sides: Vec<Side>,
    next_id: OrderId,
}

impl Driver {
    pub fn new(config: WorkloadConfig) -> Self {
        Self::with_band(config, Band::default())
    }

    pub fn with_band(config: WorkloadConfig, band: Band) -> Self {
        let max_order_id = config.ops + 10;
        let expected_orders = (config.ops / 16).clamp(1_024, 1 << 20) as usize;

        Self {
            config,
            engine: Engine::with_band(band, expected_orders, max_order_id),
            sink: RecordingSink::new(),
            live: LiveSet::new(max_order_id),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            prices: PriceGen::new(band),
            sides: vec![Side::Buy; max_order_id as usize + 1],
            next_id: 1,
        }
    }

    /// Roll the next operation. `None` means the roll picked cancel or
    /// replace while nothing was live; the slot still consumes randomness,
    /// keeping the stream aligned across runs.
    pub fn next_op(&mut self) -> Option<Op> {
        let roll = u32::from(self.rng.gen_range(1..=100u8));
        let add_cut = u32::from(self.config.add_pct);
        let cancel_cut = add_cut + u32::from(self.config.cancel_pct);

        if roll <= add_cut {
            let side = if self.rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
            let price = self
                .prices
                .next(&mut self.rng, side, self.config.mode, self.config.cross_pct);
            let qty: Qty = self.rng.gen_range(1..=10);
            let id = self.next_id;
            self.next_id += 1;
            if id as usize >= self.sides.len() {
                // Benchmarks may drive a Driver past its configured ops.
                self.sides.resize(id as usize + 1, Side::Buy);
            }
            self.sides[id as usize] = side;
            Some(Op::Submit(Order::new(id, side, price, qty)))
        } else if roll <= cancel_cut {
            if self.live.is_empty() {
                return None;
            }
            Some(Op::Cancel(self.live.pick(&mut self.rng)))
        } else {
            if self.live.is_empty() {
                return None;
            }
            let id = self.live.pick(&mut self.rng);
            let side = self.sides[id as usize];
            let price = self
                .prices
                .next(&mut self.rng, side, self.config.mode, self.config.cross_pct);
            let qty: Qty = self.rng.gen_range(1..=10);
            Some(Op::Replace { id, price, qty })
        }
    }

    /// Execute one operation against the engine and keep the live-set
    /// mirror in sync, pruning makers the engine just closed.
    pub fn apply(&mut self, op: Op) {
        match op {
            Op::Submit(order) => {
                let result = self.engine.submit(order, &mut self.sink);
                if result.rested() {
                    self.live.add(order.id);
                }
            }
            Op::Cancel(id) => {
                self.engine.cancel(id);
                self.live.remove(id);
            }
            Op::Replace { id, price, qty } => {
                let result = self.engine.replace(id, price, qty, &mut self.sink);
                if result.rested() {
                    self.live.add(id);
                } else {
                    self.live.remove(id);
                }
            }
        }

        for id in self.sink.closed_order_ids.drain(..) {
            self.live.remove(id);
        }
    }

    #[inline]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    #[inline]
    pub fn live(&self) -> &LiveSet {
        &self.live
    }

    pub fn stats(&self) -> WorkloadStats {
        WorkloadStats {
            ops: self.config.ops,
            trades: self.sink.trade_count,
            total_qty: self.sink.total_qty,
            engine_live: self.engine.live_orders(),
            tracker_live: self.live.len(),
        }
    }
}

/// Run `config` to completion against a fresh engine and report the outcome.
///
/// The caller is expected to have validated the config; an invalid mix here
/// only skews the roll table, it cannot break the engine.
pub fn run(config: &WorkloadConfig) -> WorkloadStats {
    run_with_band(config, Band::default())
}

/// As [`run`], over a custom band.
pub fn run_with_band(config: &WorkloadConfig, band: Band) -> WorkloadStats {
    let mut driver = Driver::with_band(*config, band);
    for _ in 0..config.ops {
        if let Some(op) = driver.next_op() {
            driver.apply(op);
        }
    }
    driver.stats()
}
