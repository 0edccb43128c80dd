//! # Ticklob
//!
//! A single-symbol, price-time-priority limit order matching engine over a
//! bounded tick band.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: one thread owns the book exclusively; operations run
//!   to completion with no internal concurrency
//! - **O(1) Hot Path**: submit, cancel, and replace touch a fixed number of
//!   array slots and list links per fill
//! - **Dense Ladders**: price levels live in flat per-side arrays indexed by
//!   `tick - min_tick`, with lazily walked best cursors
//! - **Pooled Nodes**: resting orders come from a freelist-backed pool of
//!   `u32`-addressed nodes; no allocation per order in steady state
//!
//! ## Architecture
//!
//! ```text
//! submit/cancel/replace --> [Engine] --> on_trade / closed ids --> [TradeSink]
//!                              |
//!                  [Ladder] [NodePool] [IdIndex]
//! ```
//!
//! The workload module drives the engine with deterministic, seeded traffic
//! for the benchmark binaries and the reproducibility tests.

pub mod engine;
pub mod index;
pub mod ladder;
pub mod order;
pub mod pool;
pub mod price_level;
pub mod sink;
pub mod workload;

// Re-exports for convenience
pub use engine::Engine;
pub use index::{IdIndex, OrderRef};
pub use ladder::{Band, Ladder, MAX_TICK, MIN_TICK};
pub use order::{AddResult, Order, OrderId, Price, Qty, ReplaceResult, Side};
pub use pool::{NodeIdx, NodePool, OrderNode, NULL_IDX};
pub use price_level::PriceLevel;
pub use sink::{CapturingSink, RecordingSink, Trade, TradeSink};
pub use workload::{Driver, LiveSet, Mode, Op, WorkloadConfig, WorkloadError, WorkloadStats};
