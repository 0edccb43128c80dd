//! Stress: capacity growth, single-level contention, rapid churn, and
//! lifecycle edge cases, with full-book audits along the way.

use ticklob::{AddResult, CapturingSink, Engine, Order, OrderId, Price, Qty, RecordingSink, Side};

fn buy(id: OrderId, price: Price, qty: Qty) -> Order {
    Order::new(id, Side::Buy, price, qty)
}

fn sell(id: OrderId, price: Price, qty: Qty) -> Order {
    Order::new(id, Side::Sell, price, qty)
}

// ============================================================================
// Capacity
// ============================================================================

#[test]
fn pool_grows_far_past_reservation_hint() {
    // Tiny hints; everything still lands.
    let mut eng = Engine::new(8, 8);
    let mut sink = RecordingSink::new();

    const ORDERS: u64 = 50_000;
    for i in 0..ORDERS {
        let (side, price) = if i % 2 == 0 {
            (Side::Buy, 900 + (i % 90) as Price)
        } else {
            (Side::Sell, 1010 + (i % 90) as Price)
        };
        let result = eng.submit(Order::new(i, side, price, 10), &mut sink);
        assert_eq!(result, AddResult::FullyRested, "order {i} should rest");
    }

    assert_eq!(eng.live_orders(), ORDERS as usize);
    assert_eq!(sink.trade_count, 0);
    eng.audit();
}

#[test]
fn pool_slots_recycle_after_cancel() {
    let mut eng = Engine::new(1_024, 1 << 20);
    let mut sink = RecordingSink::new();

    const CYCLE: u64 = 1_000;
    for round in 0..5u64 {
        let base = round * CYCLE;
        for i in 0..CYCLE {
            eng.submit(buy(base + i, 950, 10), &mut sink);
        }
        assert_eq!(eng.live_orders(), CYCLE as usize);

        for i in 0..CYCLE {
            assert!(eng.cancel(base + i));
        }
        assert_eq!(eng.live_orders(), 0);
    }
    eng.audit();
}

// ============================================================================
// Contention
// ============================================================================

#[test]
fn thousand_makers_at_one_level_sweep_in_fifo_order() {
    let mut eng = Engine::new(2_048, 1 << 16);
    let mut sink = CapturingSink::new();

    const MAKERS: u64 = 1_000;
    for i in 0..MAKERS {
        eng.submit(sell(i, 1000, 10), &mut sink);
    }
    assert_eq!(eng.live_orders(), MAKERS as usize);

    eng.submit(buy(MAKERS, 1000, (MAKERS * 10) as Qty), &mut sink);

    assert_eq!(sink.trades.len(), MAKERS as usize);
    for (i, trade) in sink.trades.iter().enumerate() {
        assert_eq!(trade.maker, i as OrderId, "fill {i} broke time priority");
        assert_eq!(trade.qty, 10);
        assert_eq!(trade.price, 1000);
    }
    assert_eq!(sink.closed_order_ids.len(), MAKERS as usize);
    assert_eq!(eng.live_orders(), 0);
    eng.audit();
}

#[test]
fn partial_sweep_leaves_the_queue_front_intact() {
    let mut eng = Engine::new(256, 1 << 12);
    let mut sink = CapturingSink::new();

    for i in 0..100u64 {
        eng.submit(sell(i, 1000, 10), &mut sink);
    }

    // 50 makers' worth plus half of the 51st.
    eng.submit(buy(1_000, 1000, 505), &mut sink);

    assert_eq!(sink.trades.len(), 51);
    assert_eq!(sink.closed_order_ids.len(), 50);
    assert_eq!(eng.live_orders(), 50);

    // Maker 50 keeps the front with its remainder.
    let (qty, count) = eng.depth_at(Side::Sell, 1000);
    assert_eq!(qty, 495);
    assert_eq!(count, 50);

    eng.submit(buy(1_001, 1000, 5), &mut sink);
    assert_eq!(sink.trades.last().map(|t| t.maker), Some(50));
    eng.audit();
}

// ============================================================================
// Churn
// ============================================================================

#[test]
fn rapid_add_cancel_cycles() {
    let mut eng = Engine::new(64, 1 << 20);
    let mut sink = RecordingSink::new();

    for cycle in 0..10_000u64 {
        let side = if cycle % 2 == 0 { Side::Buy } else { Side::Sell };
        let price = if side == Side::Buy { 990 } else { 1010 };

        assert_eq!(
            eng.submit(Order::new(cycle, side, price, 10), &mut sink),
            AddResult::FullyRested
        );
        assert!(eng.cancel(cycle));
    }

    assert_eq!(eng.live_orders(), 0);
    assert_eq!(eng.best_bid(), None);
    assert_eq!(eng.best_ask(), None);
    eng.audit();
}

#[test]
fn rapid_match_cycles() {
    let mut eng = Engine::new(64, 1 << 20);
    let mut sink = RecordingSink::new();

    const CYCLES: u64 = 5_000;
    for cycle in 0..CYCLES {
        eng.submit(sell(cycle * 2, 1000, 10), &mut sink);
        assert_eq!(
            eng.submit(buy(cycle * 2 + 1, 1000, 10), &mut sink),
            AddResult::FullyMatched
        );
    }

    assert_eq!(sink.trade_count, CYCLES);
    assert_eq!(sink.total_qty, CYCLES * 10);
    assert_eq!(eng.live_orders(), 0);
    eng.audit();
}

#[test]
fn replace_churn_keeps_one_live_order() {
    let mut eng = Engine::new(64, 1 << 12);
    let mut sink = RecordingSink::new();

    eng.submit(buy(1, 950, 10), &mut sink);

    for step in 0..2_000u32 {
        let price = 900 + (step % 100) as Price;
        let result = eng.replace(1, price, 1 + (step % 10), &mut sink);
        assert!(result.success);
        assert!(result.rested());
    }

    assert_eq!(eng.live_orders(), 1);
    assert_eq!(sink.trade_count, 0);
    eng.audit();
}

// ============================================================================
// Lifecycle edges
// ============================================================================

#[test]
fn cancel_after_partial_fill_releases_remainder() {
    let mut eng = Engine::new(64, 256);
    let mut sink = RecordingSink::new();

    eng.submit(sell(1, 1000, 1_000), &mut sink);
    eng.submit(buy(2, 1000, 300), &mut sink);

    assert_eq!(eng.depth_at(Side::Sell, 1000), (700, 1));
    assert!(eng.cancel(1));
    assert_eq!(eng.depth_at(Side::Sell, 1000), (0, 0));
    assert_eq!(eng.best_ask(), None);
    eng.audit();
}

#[test]
fn replace_preserves_side_across_churn() {
    let mut eng = Engine::new(64, 256);
    let mut sink = RecordingSink::new();

    eng.submit(sell(1, 1010, 10), &mut sink);
    for price in [1020u32, 1005, 1090, 1011] {
        assert!(eng.replace(1, price, 10, &mut sink).rested());
        assert_eq!(eng.best_ask(), Some(price));
        assert_eq!(eng.best_bid(), None);
    }
    eng.audit();
}

#[test]
fn whole_band_can_be_populated() {
    let mut eng = Engine::new(512, 1 << 12);
    let mut sink = RecordingSink::new();

    // One bid at every tick of the lower half, one ask at every tick of the
    // upper half.
    let mut id = 0u64;
    for price in 900..=999u32 {
        eng.submit(buy(id, price, 10), &mut sink);
        id += 1;
    }
    for price in 1001..=1100u32 {
        eng.submit(sell(id, price, 10), &mut sink);
        id += 1;
    }

    assert_eq!(eng.live_orders(), 200);
    assert_eq!(eng.best_bid(), Some(999));
    assert_eq!(eng.best_ask(), Some(1001));
    assert_eq!(sink.trade_count, 0);

    // Sweep the full ask side.
    let result = eng.submit(buy(id, 1100, 1_000), &mut sink);
    assert_eq!(result, AddResult::FullyMatched);
    assert_eq!(eng.best_ask(), None);
    assert_eq!(eng.live_orders(), 100);
    eng.audit();
}
