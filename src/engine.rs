//! Matching engine - submit / cancel / replace over the tick-band book.
//!
//! Crossing walks the opposite ladder from its best cursor, consuming maker
//! nodes head first and emitting one trade per fill. Remainders rest at the
//! tail of the own-side level. Cancel and replace reach their node in O(1)
//! through the id index.

use crate::index::{IdIndex, OrderRef};
use crate::ladder::{Band, Ladder};
use crate::order::{AddResult, Order, OrderId, Price, Qty, ReplaceResult, Side};
use crate::pool::{NodePool, NULL_IDX};
use crate::sink::TradeSink;

/// Single-symbol price-time-priority matching engine.
///
/// Owns the ladders, the node pool, and the id index; the trade sink is
/// borrowed per call. All operations run to completion on the calling
/// thread and reject bad input in band - nothing here panics on user data.
pub struct Engine {
    band: Band,
    bids: Ladder,
    asks: Ladder,
    index: IdIndex,
    pool: NodePool,
}

impl Engine {
    /// Engine over the default tick band.
    ///
    /// `expected_orders` pre-reserves the node pool; `max_order_id` sizes
    /// the id index. Both are hints, not caps.
    pub fn new(expected_orders: usize, max_order_id: OrderId) -> Self {
        Self::with_band(Band::default(), expected_orders, max_order_id)
    }

    /// Engine over a custom tick band.
    pub fn with_band(band: Band, expected_orders: usize, max_order_id: OrderId) -> Self {
        Self {
            band,
            bids: Ladder::new(Side::Buy, band.num_levels()),
            asks: Ladder::new(Side::Sell, band.num_levels()),
            index: IdIndex::new(max_order_id),
            pool: NodePool::new(expected_orders),
        }
    }

    #[inline]
    pub fn band(&self) -> Band {
        self.band
    }

    /// Submit an incoming limit order.
    ///
    /// Rejects (with no side effects) on zero qty, a price outside the
    /// band, or an id that is currently resting. Otherwise crosses against
    /// the opposite side and rests any remainder.
    pub fn submit<S: TradeSink>(&mut self, order: Order, sink: &mut S) -> AddResult {
        if order.qty == 0 || !self.band.contains(order.price) || self.index.contains(order.id) {
            return AddResult::Rejected;
        }

        let remaining = self.cross(order, sink);

        if remaining == 0 {
            return AddResult::FullyMatched;
        }

        self.rest(Order { qty: remaining, ..order });

        if remaining < order.qty {
            AddResult::PartiallyRested
        } else {
            AddResult::FullyRested
        }
    }

    /// Cancel a resting order by id. Returns false when the id is not
    /// resting (already filled, cancelled, or never rested).
    pub fn cancel(&mut self, id: OrderId) -> bool {
        let Some(order_ref) = self.index.remove(id) else {
            return false;
        };

        let idx = self.band.index_of(order_ref.price);
        let (ladder, pool) = match order_ref.side {
            Side::Buy => (&mut self.bids, &mut self.pool),
            Side::Sell => (&mut self.asks, &mut self.pool),
        };

        let emptied = ladder.level_mut(idx).remove(pool, order_ref.node);
        pool.free(order_ref.node);

        if emptied && ladder.best() == Some(idx) {
            ladder.advance_best();
        }

        true
    }

    /// Replace a resting order: cancel it, then submit `{id, same side,
    /// new_price, new_qty}` as a fresh incoming order that may cross.
    ///
    /// The old order is off the book before crossing starts, so a replace
    /// never trades against itself. A missing id fails the whole operation
    /// with no submit. Side cannot change through replace.
    pub fn replace<S: TradeSink>(
        &mut self,
        id: OrderId,
        new_price: Price,
        new_qty: Qty,
        sink: &mut S,
    ) -> ReplaceResult {
        let Some(order_ref) = self.index.get(id) else {
            return ReplaceResult::not_found();
        };
        let side = order_ref.side;

        let _cancelled = self.cancel(id);
        debug_assert!(_cancelled);

        let add_result = self.submit(Order::new(id, side, new_price, new_qty), sink);
        ReplaceResult { success: true, add_result }
    }

    /// Consume marketable liquidity on the opposite side. Returns the
    /// incoming order's unfilled remainder.
    fn cross<S: TradeSink>(&mut self, taker: Order, sink: &mut S) -> Qty {
        let band = self.band;
        let limit = band.index_of(taker.price);
        let mut remaining = taker.qty;

        let (opposite, pool, index) = match taker.side {
            Side::Buy => (&mut self.asks, &mut self.pool, &mut self.index),
            Side::Sell => (&mut self.bids, &mut self.pool, &mut self.index),
        };

        while remaining > 0 {
            let Some(best) = opposite.best() else { break };

            let marketable = match taker.side {
                Side::Buy => best <= limit,
                Side::Sell => best >= limit,
            };
            if !marketable {
                break;
            }

            let price = band.tick_at(best);
            let level = opposite.level_mut(best);

            // Head first: strict time priority within the level.
            while remaining > 0 {
                let head = level.peek_front();
                if head == NULL_IDX {
                    break;
                }

                let maker = pool.get_mut(head);
                let maker_id = maker.id;
                let fill = remaining.min(maker.qty);

                maker.qty -= fill;
                let maker_done = maker.qty == 0;
                remaining -= fill;
                level.subtract_qty(fill);

                sink.on_trade(fill, price, taker.id, maker_id);

                if maker_done {
                    // Free the maker before the next fill so no stale
                    // handle survives into it.
                    index.remove(maker_id);
                    level.pop_front(pool);
                    pool.free(head);
                    sink.on_order_closed(maker_id);
                } else {
                    break;
                }
            }

            if opposite.level(best).is_empty() {
                opposite.advance_best();
            } else {
                break;
            }
        }

        remaining
    }

    /// Rest a remainder at the tail of its own-side level and index it.
    fn rest(&mut self, order: Order) {
        let idx = self.band.index_of(order.price);
        let node = self.pool.alloc(order);

        let ladder = match order.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        ladder.level_mut(idx).push_back(&mut self.pool, node);
        ladder.tighten_best(idx);

        let _inserted = self.index.insert(
            order.id,
            OrderRef { side: order.side, price: order.price, node },
        );
        debug_assert!(_inserted, "resting an id that is already indexed");
    }

    // ------------------------------------------------------------------
    // Observability
    // ------------------------------------------------------------------

    /// Number of currently resting orders.
    #[inline]
    pub fn live_orders(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best().map(|idx| self.band.tick_at(idx))
    }

    #[inline]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best().map(|idx| self.band.tick_at(idx))
    }

    /// Resting (total qty, order count) at a price. Out-of-band prices
    /// report empty.
    pub fn depth_at(&self, side: Side, price: Price) -> (u64, u32) {
        if !self.band.contains(price) {
            return (0, 0);
        }
        let idx = self.band.index_of(price);
        let level = match side {
            Side::Buy => self.bids.level(idx),
            Side::Sell => self.asks.level(idx),
        };
        (level.total_qty, level.count)
    }

    /// Fold the full book state into a hash. Two engines that processed
    /// the same operation stream hash identically.
    pub fn state_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.best_bid().hash(&mut hasher);
        self.best_ask().hash(&mut hasher);
        self.live_orders().hash(&mut hasher);

        for ladder in [&self.bids, &self.asks] {
            for idx in 0..self.band.num_levels() {
                let level = ladder.level(idx);
                if level.is_empty() {
                    continue;
                }
                idx.hash(&mut hasher);
                level.total_qty.hash(&mut hasher);
                level.count.hash(&mut hasher);

                let mut node = level.head;
                while node != NULL_IDX {
                    let n = self.pool.get(node);
                    n.id.hash(&mut hasher);
                    n.qty.hash(&mut hasher);
                    node = n.next;
                }
            }
        }

        hasher.finish()
    }

    /// Walk the whole book and panic on any internal inconsistency:
    /// level totals vs node sums, link integrity, index membership, best
    /// cursor exactness, and an uncrossed book. Test and debugging aid.
    pub fn audit(&self) {
        let mut resting = 0usize;

        for (side, ladder) in [(Side::Buy, &self.bids), (Side::Sell, &self.asks)] {
            let mut best_nonempty: Option<usize> = None;

            for idx in 0..self.band.num_levels() {
                let level = ladder.level(idx);
                let mut sum = 0u64;
                let mut count = 0u32;
                let mut node_idx = level.head;
                let mut prev = NULL_IDX;

                while node_idx != NULL_IDX {
                    let node = self.pool.get(node_idx);
                    assert!(node.qty > 0, "resting node {} has zero qty", node.id);
                    assert_eq!(node.side, side, "node {} on the wrong ladder", node.id);
                    assert_eq!(
                        node.price,
                        self.band.tick_at(idx),
                        "node {} filed at the wrong level",
                        node.id
                    );
                    assert_eq!(node.prev, prev, "broken back-link at node {}", node.id);

                    let Some(order_ref) = self.index.get(node.id) else {
                        panic!("resting id {} missing from index", node.id);
                    };
                    assert_eq!(order_ref.node, node_idx, "index points id {} elsewhere", node.id);

                    sum += u64::from(node.qty);
                    count += 1;
                    prev = node_idx;
                    node_idx = node.next;
                }

                assert_eq!(level.tail, prev, "tail out of sync at level {idx}");
                assert_eq!(level.total_qty, sum, "qty total out of sync at level {idx}");
                assert_eq!(level.count, count, "count out of sync at level {idx}");

                if !level.is_empty() {
                    best_nonempty = Some(match (side, best_nonempty) {
                        (Side::Buy, _) => idx,
                        (Side::Sell, None) => idx,
                        (Side::Sell, Some(b)) => b,
                    });
                    resting += count as usize;
                }
            }

            assert_eq!(ladder.best(), best_nonempty, "stale best cursor on {side:?}");
        }

        assert_eq!(self.index.len(), resting, "index size != resting nodes");
        assert_eq!(self.pool.live() as usize, resting, "pool live != resting nodes");

        if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) {
            assert!(bid < ask, "book is crossed: bid {bid} >= ask {ask}");
        }
    }
}
