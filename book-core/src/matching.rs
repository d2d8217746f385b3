//! The matching engine (component E): the price-time matching loop,
//! trade emission, and trade statistics.
//!
//! Price-time priority falls out of three properties the other
//! components already guarantee: best-bucket selection by map ordering
//! (`PriceLevelIndex::best`), FIFO consumption within a bucket, and
//! append-to-tail on insertion. This module adds nothing to that
//! ordering discipline; it only drives the loop and turns fills into
//! trades.
//!
//! Tie-breaking when two resting orders share a price and an identical
//! `timestamp_ns`: the bucket FIFO position is authoritative, never the
//! stamp. This loop never compares timestamps; it only ever asks the
//! index for "the head of the best bucket."

use crate::record::OrderRecord;
use crate::slab::{Handle, NULL_HANDLE};
use crate::types::{Price, Quantity, Side};
use std::sync::atomic::{AtomicU64, Ordering};

/// An immutable record of one match between a taker and a resting maker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trade {
    pub trade_id: u64,
    pub buy_order_id: u64,
    pub sell_order_id: u64,
    /// The maker's (resting order's) price.
    pub price: Price,
    pub quantity: Quantity,
    pub timestamp_ns: u64,
}

/// The outcome of a single `submit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub trades: Vec<Trade>,
    pub filled_qty: Quantity,
    pub remaining_qty: Quantity,
    pub fully_filled: bool,
}

/// Monotonic trade-id counter and relaxed-ordering trade statistics,
/// shared across the engine's lifetime. Global, process-wide atomics:
/// the values are for identity and bookkeeping, not synchronization.
pub struct MatchingStats {
    next_trade_id: AtomicU64,
    total_trades: AtomicU64,
    total_volume: AtomicU64,
}

impl MatchingStats {
    pub fn new() -> Self {
        Self {
            next_trade_id: AtomicU64::new(1),
            total_trades: AtomicU64::new(0),
            total_volume: AtomicU64::new(0),
        }
    }

    fn next_trade_id(&self) -> u64 {
        self.next_trade_id.fetch_add(1, Ordering::Relaxed)
    }

    fn record_trade(&self, quantity: Quantity) {
        self.total_trades.fetch_add(1, Ordering::Relaxed);
        self.total_volume.fetch_add(quantity, Ordering::Relaxed);
    }

    pub fn total_trades(&self) -> u64 {
        self.total_trades.load(Ordering::Relaxed)
    }

    pub fn total_volume(&self) -> u64 {
        self.total_volume.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.total_trades.store(0, Ordering::Relaxed);
        self.total_volume.store(0, Ordering::Relaxed);
    }
}

impl Default for MatchingStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the matching loop needs from the book storage, kept narrow
/// so the loop can't reach past the price-level/slab/directory seam.
pub(crate) trait MatchingStorage {
    fn best_opposite(&self, side: Side) -> Handle;
    fn record(&self, handle: Handle) -> &OrderRecord;
    fn record_mut(&mut self, handle: Handle) -> &mut OrderRecord;
    /// Removes a fully-filled resting order from the index, directory,
    /// and slab.
    fn remove_filled(&mut self, handle: Handle);
}

/// Runs the price-time matching loop for `taker` against the opposite
/// side of `storage`, applying fills in place and returning the trades
/// produced plus the taker's fill summary. `taker` is not itself touched
/// in the index/directory/slab — callers decide whether a Limit residual
/// rests afterward.
pub(crate) fn match_incoming<S: MatchingStorage>(
    storage: &mut S,
    stats: &MatchingStats,
    taker: &mut OrderRecord,
    now_ns: u64,
) -> MatchResult {
    let opposite = taker.side.opposite();
    let mut trades = Vec::new();

    loop {
        if taker.remaining() == 0 {
            break;
        }
        let maker_handle = storage.best_opposite(opposite);
        if maker_handle == NULL_HANDLE {
            break;
        }

        if taker.order_type == crate::types::OrderType::Limit
            && !taker.can_match_with(storage.record(maker_handle))
        {
            break;
        }

        let maker = storage.record_mut(maker_handle);
        let fill = taker.remaining().min(maker.remaining());
        debug_assert!(fill > 0, "matched maker/taker pair produced a zero fill");

        let trade_price = maker.price;
        maker.apply_fill(fill);
        taker.apply_fill(fill);

        let (buy_id, sell_id) = match taker.side {
            Side::Buy => (taker.order_id, maker.order_id),
            Side::Sell => (maker.order_id, taker.order_id),
        };
        trades.push(Trade {
            trade_id: stats.next_trade_id(),
            buy_order_id: buy_id,
            sell_order_id: sell_id,
            price: trade_price,
            quantity: fill,
            timestamp_ns: now_ns,
        });
        stats.record_trade(fill);

        if storage.record(maker_handle).is_fully_filled() {
            storage.remove_filled(maker_handle);
        }
    }

    let filled_qty = taker.filled_quantity;
    let remaining_qty = taker.remaining();
    MatchResult {
        trades,
        filled_qty,
        remaining_qty,
        fully_filled: remaining_qty == 0,
    }
}
