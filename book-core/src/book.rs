//! The book façade (component F): the public surface of the core.
//!
//! `OrderBook` owns a `Spinlock<BookInner>` plus the lock-free id and
//! statistics counters described in the design notes (monotonic,
//! process-wide, relaxed ordering — identity, not synchronization).
//! Every externally observable mutation acquires the spinlock and
//! releases it before returning (§5); everything inside the lock is
//! purely sequential, so `BookInner` itself needs no further
//! synchronization of its own.
//!
//! `BookStorage` generalizes the book's storage capability set — insert,
//! unlink, best, find, depth, clear, size — so the façade is not welded
//! to one allocator choice. `SlabBookStorage` is the only production
//! implementation; it composes the slab, the price-level index, and the
//! order directory from the sibling modules.

use crate::directory::OrderDirectory;
use crate::error::BookError;
use crate::index::{PriceLevel, PriceLevelIndex};
use crate::matching::{match_incoming, MatchResult, MatchingStats, MatchingStorage};
use crate::record::{Order, OrderRecord};
use crate::slab::{FixedSlab, Handle, Slab, NULL_HANDLE};
use crate::sync::Spinlock;
use crate::syncer::{NullSyncer, OrderBookSyncer};
use crate::types::{OrderStatus, OrderType, Price, Quantity, Side};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// The storage capability set the matching loop and façade need: insert,
/// unlink, best, find, depth, clear, size. A tagged-interface
/// abstraction rather than compile-time storage polymorphism, so the
/// façade can be parameterized over it without exposing the mechanism
/// externally.
pub trait BookStorage {
    fn insert_resting(&mut self, record: OrderRecord) -> Result<Handle, BookError>;
    fn unlink_and_destroy(&mut self, handle: Handle);
    fn best(&self, side: Side) -> Handle;
    fn find_handle(&self, order_id: u64) -> Option<Handle>;
    fn record(&self, handle: Handle) -> &OrderRecord;
    fn depth(&self, side: Side, max_levels: usize) -> Vec<PriceLevel>;
    fn clear(&mut self);
    fn size(&self) -> usize;
}

/// Slab-backed production storage: a `Slab`, a `PriceLevelIndex`, and an
/// `OrderDirectory` kept in lockstep.
pub struct SlabBookStorage {
    slab: Slab,
    index: PriceLevelIndex,
    directory: OrderDirectory,
}

impl SlabBookStorage {
    fn new() -> Self {
        Self {
            slab: Slab::new(),
            index: PriceLevelIndex::new(),
            directory: OrderDirectory::new(),
        }
    }
}

impl BookStorage for SlabBookStorage {
    fn insert_resting(&mut self, record: OrderRecord) -> Result<Handle, BookError> {
        let order_id = record.order_id;
        let handle = self.slab.construct(record);
        self.index.insert_tail(&mut self.slab, handle);
        if !self.directory.insert(order_id, handle) {
            self.index.unlink(&mut self.slab, handle);
            unsafe { self.slab.destroy(handle) };
            return Err(BookError::DuplicateId);
        }
        Ok(handle)
    }

    fn unlink_and_destroy(&mut self, handle: Handle) {
        let order_id = unsafe { self.slab.get(handle) }.order_id;
        debug_assert_eq!(
            self.directory.get(order_id),
            Some(handle),
            "{}",
            BookError::BookInconsistency("handle being destroyed is not the directory's resident for its order_id")
        );
        self.index.unlink(&mut self.slab, handle);
        self.directory.remove(order_id);
        unsafe { self.slab.destroy(handle) };
    }

    fn best(&self, side: Side) -> Handle {
        self.index.best(side)
    }

    fn find_handle(&self, order_id: u64) -> Option<Handle> {
        self.directory.get(order_id)
    }

    fn record(&self, handle: Handle) -> &OrderRecord {
        unsafe { self.slab.get(handle) }
    }

    fn depth(&self, side: Side, max_levels: usize) -> Vec<PriceLevel> {
        self.index.aggregate_depth(&self.slab, side, max_levels)
    }

    fn clear(&mut self) {
        self.index.clear();
        self.directory.clear();
        self.slab = Slab::new();
    }

    fn size(&self) -> usize {
        self.directory.len()
    }
}

/// Bridges `SlabBookStorage` to the matching loop's narrower
/// `MatchingStorage` seam.
impl MatchingStorage for SlabBookStorage {
    fn best_opposite(&self, side: Side) -> Handle {
        self.index.best(side)
    }

    fn record(&self, handle: Handle) -> &OrderRecord {
        BookStorage::record(self, handle)
    }

    fn record_mut(&mut self, handle: Handle) -> &mut OrderRecord {
        unsafe { self.slab.get_mut(handle) }
    }

    fn remove_filled(&mut self, handle: Handle) {
        self.unlink_and_destroy(handle);
    }
}

/// Fixed-capacity storage: a `FixedSlab` in place of the growable `Slab`.
/// Never grows past the capacity fixed at construction; `insert_resting`
/// reports `BookError::AllocationExhausted` instead (§4B/§4F/§7) once the
/// slab is full, rather than growing like `SlabBookStorage` does.
pub struct FixedSlabBookStorage {
    slab: FixedSlab,
    index: PriceLevelIndex,
    directory: OrderDirectory,
    capacity: usize,
}

impl FixedSlabBookStorage {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slab: FixedSlab::with_capacity(capacity),
            index: PriceLevelIndex::new(),
            directory: OrderDirectory::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn allocated_count(&self) -> usize {
        self.slab.allocated_count()
    }
}

impl BookStorage for FixedSlabBookStorage {
    fn insert_resting(&mut self, record: OrderRecord) -> Result<Handle, BookError> {
        let order_id = record.order_id;
        let Some(handle) = self.slab.construct(record) else {
            return Err(BookError::AllocationExhausted);
        };
        self.index.insert_tail(&mut self.slab, handle);
        if !self.directory.insert(order_id, handle) {
            self.index.unlink(&mut self.slab, handle);
            unsafe { self.slab.destroy(handle) };
            return Err(BookError::DuplicateId);
        }
        Ok(handle)
    }

    fn unlink_and_destroy(&mut self, handle: Handle) {
        let order_id = unsafe { self.slab.get(handle) }.order_id;
        debug_assert_eq!(
            self.directory.get(order_id),
            Some(handle),
            "{}",
            BookError::BookInconsistency("handle being destroyed is not the directory's resident for its order_id")
        );
        self.index.unlink(&mut self.slab, handle);
        self.directory.remove(order_id);
        unsafe { self.slab.destroy(handle) };
    }

    fn best(&self, side: Side) -> Handle {
        self.index.best(side)
    }

    fn find_handle(&self, order_id: u64) -> Option<Handle> {
        self.directory.get(order_id)
    }

    fn record(&self, handle: Handle) -> &OrderRecord {
        unsafe { self.slab.get(handle) }
    }

    fn depth(&self, side: Side, max_levels: usize) -> Vec<PriceLevel> {
        self.index.aggregate_depth(&self.slab, side, max_levels)
    }

    fn clear(&mut self) {
        self.index.clear();
        self.directory.clear();
        self.slab = FixedSlab::with_capacity(self.capacity);
    }

    fn size(&self) -> usize {
        self.directory.len()
    }
}

impl MatchingStorage for FixedSlabBookStorage {
    fn best_opposite(&self, side: Side) -> Handle {
        self.index.best(side)
    }

    fn record(&self, handle: Handle) -> &OrderRecord {
        BookStorage::record(self, handle)
    }

    fn record_mut(&mut self, handle: Handle) -> &mut OrderRecord {
        unsafe { self.slab.get_mut(handle) }
    }

    fn remove_filled(&mut self, handle: Handle) {
        self.unlink_and_destroy(handle);
    }
}

struct BookInner<S: BookStorage> {
    storage: S,
}

/// A top-of-book and aggregated-depth snapshot: ordered bids best-first,
/// ordered asks best-first, with derived spread/mid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketDepth {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub spread: Option<Price>,
    pub mid: Option<Price>,
}

fn monotonic_timestamp_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// The public book. `S` defaults to the slab-backed storage; a fixed-
/// capacity or alternative storage implementation may be substituted by
/// naming `OrderBook<OtherStorage>` directly.
pub struct OrderBook<S: BookStorage = SlabBookStorage> {
    inner: Spinlock<BookInner<S>>,
    next_order_id: AtomicU64,
    stats: MatchingStats,
    syncer: Box<dyn OrderBookSyncer>,
}

impl OrderBook<SlabBookStorage> {
    pub fn new() -> Self {
        Self::with_syncer(Box::new(NullSyncer))
    }
}

impl Default for OrderBook<SlabBookStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBook<FixedSlabBookStorage> {
    /// A book backed by a fixed-capacity slab: `submit`/`submit_passive`
    /// fail with `BookError::AllocationExhausted` once `capacity` resting
    /// orders are live, rather than growing (§4B).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Spinlock::new(BookInner {
                storage: FixedSlabBookStorage::with_capacity(capacity),
            }),
            next_order_id: AtomicU64::new(1),
            stats: MatchingStats::new(),
            syncer: Box::new(NullSyncer),
        }
    }
}

impl<S: BookStorage> OrderBook<S> {
    /// Builds a book notifying `syncer` of every mutation after the book
    /// lock has been released.
    pub fn with_syncer(syncer: Box<dyn OrderBookSyncer>) -> Self
    where
        S: Default,
    {
        Self {
            inner: Spinlock::new(BookInner {
                storage: S::default(),
            }),
            next_order_id: AtomicU64::new(1),
            stats: MatchingStats::new(),
            syncer,
        }
    }

    fn fresh_order_id(&self) -> u64 {
        self.next_order_id.fetch_add(1, Ordering::Relaxed)
    }

    fn validate_submission(price: Price, quantity: Quantity, order_type: OrderType) -> Result<(), BookError> {
        if quantity == 0 {
            return Err(BookError::PreconditionViolation("quantity must be non-zero"));
        }
        if order_type == OrderType::Limit && price <= 0 {
            return Err(BookError::PreconditionViolation(
                "limit price must be a positive tick count",
            ));
        }
        Ok(())
    }

    /// Submits a new order: runs the matcher against the opposite side,
    /// then — for a Limit order with residual quantity — inserts the
    /// residual into the book. Market orders never rest (§4F).
    pub fn submit(
        &self,
        price: Price,
        quantity: Quantity,
        side: Side,
        order_type: OrderType,
    ) -> Result<MatchResult, BookError> {
        Self::validate_submission(price, quantity, order_type)?;
        let order_id = self.fresh_order_id();
        let now_ns = monotonic_timestamp_ns();
        let mut taker = OrderRecord::new(order_id, now_ns, price, quantity, side, order_type);
        tracing::trace!(order_id, ?side, price, quantity, ?order_type, "submit");

        let mut guard = self.inner.lock();
        let result = match_incoming(&mut guard.storage, &self.stats, &mut taker, now_ns);

        if taker.remaining() > 0 && order_type == OrderType::Limit {
            match guard.storage.insert_resting(taker) {
                Ok(_) => {}
                Err(err) => {
                    drop(guard);
                    for trade in &result.trades {
                        self.syncer.on_trade(trade);
                    }
                    return Err(err);
                }
            }
        }
        taker.status = if result.fully_filled {
            OrderStatus::Filled
        } else if result.filled_qty > 0 {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::New
        };
        drop(guard);

        for trade in &result.trades {
            self.syncer.on_trade(trade);
        }
        let view = Order::from(&taker);
        self.syncer.on_submit(&view, &result);
        Ok(result)
    }

    /// Inserts an order directly, skipping the matcher.
    pub fn submit_passive(
        &self,
        price: Price,
        quantity: Quantity,
        side: Side,
    ) -> Result<u64, BookError> {
        Self::validate_submission(price, quantity, OrderType::Limit)?;
        let order_id = self.fresh_order_id();
        let now_ns = monotonic_timestamp_ns();
        let record = OrderRecord::new(order_id, now_ns, price, quantity, side, OrderType::Limit);

        let mut guard = self.inner.lock();
        guard.storage.insert_resting(record)?;
        drop(guard);

        let view = Order::from(&record);
        self.syncer.on_submit(&view, &MatchResult {
            trades: Vec::new(),
            filled_qty: 0,
            remaining_qty: quantity,
            fully_filled: false,
        });
        Ok(order_id)
    }

    /// Cancels a resting order. Returns `false` (book unchanged) if
    /// `order_id` is not currently live.
    pub fn cancel(&self, order_id: u64) -> bool {
        let mut guard = self.inner.lock();
        let Some(handle) = guard.storage.find_handle(order_id) else {
            tracing::trace!(order_id, "cancel: not found");
            return false;
        };
        guard.storage.unlink_and_destroy(handle);
        drop(guard);
        tracing::debug!(order_id, "cancel: removed");
        self.syncer.on_cancel(order_id);
        true
    }

    /// Cancel-then-re-add under the same id. Time priority is
    /// intentionally lost: the re-added order joins the tail of its
    /// bucket, not its original position.
    pub fn modify(&self, order_id: u64, new_quantity: Quantity) -> Result<bool, BookError> {
        if new_quantity == 0 {
            return Err(BookError::PreconditionViolation("quantity must be non-zero"));
        }
        tracing::debug!(order_id, new_quantity, "modify");
        let mut guard = self.inner.lock();
        let Some(handle) = guard.storage.find_handle(order_id) else {
            return Ok(false);
        };
        let (price, side) = {
            let record = guard.storage.record(handle);
            (record.price, record.side)
        };
        guard.storage.unlink_and_destroy(handle);
        let now_ns = monotonic_timestamp_ns();
        let record = OrderRecord::new(order_id, now_ns, price, new_quantity, side, OrderType::Limit);
        guard.storage.insert_resting(record)?;
        drop(guard);

        let view = Order::from(&record);
        self.syncer.on_modify(&view);
        Ok(true)
    }

    /// Read-only snapshot of a live order, if still resident.
    pub fn find(&self, order_id: u64) -> Option<Order> {
        let guard = self.inner.lock();
        let handle = guard.storage.find_handle(order_id)?;
        Some(Order::from(guard.storage.record(handle)))
    }

    pub fn best_bid_price(&self) -> Option<Price> {
        let guard = self.inner.lock();
        let handle = guard.storage.best(Side::Buy);
        (handle != NULL_HANDLE).then(|| guard.storage.record(handle).price)
    }

    pub fn best_ask_price(&self) -> Option<Price> {
        let guard = self.inner.lock();
        let handle = guard.storage.best(Side::Sell);
        (handle != NULL_HANDLE).then(|| guard.storage.record(handle).price)
    }

    /// `best_ask - best_bid`, if both sides have resting liquidity.
    pub fn spread(&self) -> Option<Price> {
        let guard = self.inner.lock();
        let bid = guard.storage.best(Side::Buy);
        let ask = guard.storage.best(Side::Sell);
        if bid == NULL_HANDLE || ask == NULL_HANDLE {
            return None;
        }
        Some(guard.storage.record(ask).price - guard.storage.record(bid).price)
    }

    /// Arithmetic mean of best bid and best ask, if both exist. Rounds
    /// toward zero in tick units, consistent with integer price math.
    pub fn mid(&self) -> Option<Price> {
        let guard = self.inner.lock();
        let bid = guard.storage.best(Side::Buy);
        let ask = guard.storage.best(Side::Sell);
        if bid == NULL_HANDLE || ask == NULL_HANDLE {
            return None;
        }
        let bid_price = guard.storage.record(bid).price;
        let ask_price = guard.storage.record(ask).price;
        Some((bid_price + ask_price) / 2)
    }

    /// Aggregated L2 snapshot of up to `max_levels` per side.
    pub fn depth(&self, max_levels: usize) -> MarketDepth {
        let guard = self.inner.lock();
        let bids = guard.storage.depth(Side::Buy, max_levels);
        let asks = guard.storage.depth(Side::Sell, max_levels);
        let spread = match (bids.first(), asks.first()) {
            (Some(b), Some(a)) => Some(a.price - b.price),
            _ => None,
        };
        let mid = match (bids.first(), asks.first()) {
            (Some(b), Some(a)) => Some((a.price + b.price) / 2),
            _ => None,
        };
        MarketDepth { bids, asks, spread, mid }
    }

    /// Submits each order in sequence, returning results in input order.
    /// A failed submission does not halt the batch.
    pub fn submit_bulk(
        &self,
        orders: &[(Price, Quantity, Side, OrderType)],
    ) -> Vec<Result<MatchResult, BookError>> {
        orders
            .iter()
            .map(|&(price, quantity, side, order_type)| self.submit(price, quantity, side, order_type))
            .collect()
    }

    /// Destroys all records, empties both indices and the directory, and
    /// resets order/trade id counters and statistics.
    pub fn clear(&self) {
        tracing::debug!("clear");
        let mut guard = self.inner.lock();
        guard.storage.clear();
        drop(guard);
        self.next_order_id.store(1, Ordering::Relaxed);
        self.stats.reset();
    }

    /// Count of currently-live (resting) records.
    pub fn size(&self) -> usize {
        self.inner.lock().storage.size()
    }

    pub fn total_trades(&self) -> u64 {
        self.stats.total_trades()
    }

    pub fn total_volume(&self) -> u64 {
        self.stats.total_volume()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> OrderBook {
        OrderBook::new()
    }

    #[test]
    fn scenario_1_passive_book_market_data() {
        let b = book();
        b.submit_passive(10000, 10, Side::Buy).unwrap();
        b.submit_passive(9950, 15, Side::Buy).unwrap();
        b.submit_passive(10100, 10, Side::Sell).unwrap();
        b.submit_passive(10150, 15, Side::Sell).unwrap();

        assert_eq!(b.best_bid_price(), Some(10000));
        assert_eq!(b.best_ask_price(), Some(10100));
        assert_eq!(b.spread(), Some(100));
        assert_eq!(b.mid(), Some(10050));
        assert_eq!(b.size(), 4);
        assert_eq!(b.total_trades(), 0);
    }

    #[test]
    fn scenario_2_aggressive_buy_sweeps_both_ask_levels() {
        let b = book();
        b.submit_passive(10000, 10, Side::Buy).unwrap();
        b.submit_passive(9950, 15, Side::Buy).unwrap();
        b.submit_passive(10100, 10, Side::Sell).unwrap();
        b.submit_passive(10150, 15, Side::Sell).unwrap();

        let result = b.submit(10150, 25, Side::Buy, OrderType::Limit).unwrap();
        assert_eq!(result.trades.len(), 2);
        assert_eq!(result.trades[0].price, 10100);
        assert_eq!(result.trades[0].quantity, 10);
        assert_eq!(result.trades[1].price, 10150);
        assert_eq!(result.trades[1].quantity, 15);
        assert!(result.fully_filled);
        assert_eq!(result.filled_qty, 25);
        assert_eq!(result.remaining_qty, 0);
        assert_eq!(b.best_ask_price(), None);
        assert_eq!(b.size(), 2);
    }

    #[test]
    fn scenario_3_passive_buy_between_levels_rests() {
        let b = book();
        b.submit_passive(10000, 10, Side::Buy).unwrap();
        b.submit_passive(9950, 15, Side::Buy).unwrap();
        b.submit_passive(10100, 10, Side::Sell).unwrap();
        b.submit_passive(10150, 15, Side::Sell).unwrap();

        let result = b.submit(10050, 10, Side::Buy, OrderType::Limit).unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(b.best_bid_price(), Some(10050));
        assert_eq!(b.size(), 5);
    }

    #[test]
    fn scenario_4_fifo_partial_consumption() {
        let b = book();
        let first = b.submit_passive(10000, 5, Side::Buy).unwrap();
        let middle = b.submit_passive(10000, 7, Side::Buy).unwrap();
        let last = b.submit_passive(10000, 9, Side::Buy).unwrap();

        let result = b.submit(9900, 8, Side::Sell, OrderType::Limit).unwrap();
        assert_eq!(result.trades.len(), 2);
        assert_eq!(result.trades[0].quantity, 5);
        assert_eq!(result.trades[1].quantity, 3);

        assert!(b.find(first).is_none());
        let middle_view = b.find(middle).unwrap();
        assert_eq!(middle_view.filled_quantity, 3);
        assert_eq!(middle_view.quantity - middle_view.filled_quantity, 4);
        let last_view = b.find(last).unwrap();
        assert_eq!(last_view.filled_quantity, 0);
        assert_eq!(b.size(), 3);
    }

    #[test]
    fn scenario_5_cancel_then_cancel_again_fails() {
        let b = book();
        b.submit_passive(10000, 5, Side::Buy).unwrap();
        b.submit_passive(10000, 7, Side::Buy).unwrap();
        let last = b.submit_passive(10000, 9, Side::Buy).unwrap();
        b.submit(9900, 8, Side::Sell, OrderType::Limit).unwrap();

        assert!(b.cancel(last));
        assert_eq!(b.size(), 2);
        assert!(!b.cancel(last));
        assert_eq!(b.size(), 2);
    }

    #[test]
    fn scenario_6_modify_loses_priority() {
        let b = book();
        let a = b.submit_passive(10000, 5, Side::Buy).unwrap();
        let bb = b.submit_passive(10000, 5, Side::Buy).unwrap();

        assert!(b.modify(a, 6).unwrap());

        let result = b.submit(9900, 5, Side::Sell, OrderType::Limit).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].buy_order_id, bb);
        assert_eq!(result.trades[0].quantity, 5);
    }

    #[test]
    fn cancel_unknown_id_returns_false() {
        let b = book();
        assert!(!b.cancel(999));
    }

    #[test]
    fn market_buy_against_empty_book_does_not_rest() {
        let b = book();
        let result = b.submit(0, 10, Side::Buy, OrderType::Market).unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.remaining_qty, 10);
        assert_eq!(b.size(), 0);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let b = book();
        assert_eq!(
            b.submit(10000, 0, Side::Buy, OrderType::Limit),
            Err(BookError::PreconditionViolation("quantity must be non-zero"))
        );
    }

    #[test]
    fn clear_resets_everything() {
        let b = book();
        b.submit_passive(10000, 5, Side::Buy).unwrap();
        b.submit_passive(10100, 5, Side::Sell).unwrap();
        b.submit(10100, 5, Side::Buy, OrderType::Limit).unwrap();
        assert!(b.total_trades() > 0);

        b.clear();
        assert_eq!(b.size(), 0);
        assert_eq!(b.best_bid_price(), None);
        assert_eq!(b.best_ask_price(), None);
        assert_eq!(b.total_trades(), 0);
        assert_eq!(b.total_volume(), 0);
    }

    #[test]
    fn depth_reports_bounded_levels_in_priority_order() {
        let b = book();
        b.submit_passive(10000, 5, Side::Buy).unwrap();
        b.submit_passive(10050, 5, Side::Buy).unwrap();
        b.submit_passive(9950, 5, Side::Buy).unwrap();
        b.submit_passive(10100, 5, Side::Sell).unwrap();
        b.submit_passive(10150, 5, Side::Sell).unwrap();

        let depth = b.depth(2);
        assert_eq!(depth.bids.len(), 2);
        assert_eq!(depth.bids[0].price, 10050);
        assert_eq!(depth.bids[1].price, 10000);
        assert_eq!(depth.asks[0].price, 10100);
        assert_eq!(depth.spread, Some(50));
    }

    #[test]
    fn fixed_capacity_book_reports_allocation_exhausted_on_residual_insert() {
        let b = OrderBook::<FixedSlabBookStorage>::with_capacity(2);
        b.submit_passive(10000, 5, Side::Buy).unwrap();
        b.submit_passive(9950, 5, Side::Buy).unwrap();

        // A third resting order has nowhere to go: the trades already
        // executed (none, here) stay committed, but the residual is
        // reported unable to rest.
        assert_eq!(
            b.submit_passive(9900, 5, Side::Buy),
            Err(BookError::AllocationExhausted)
        );
        assert_eq!(b.size(), 2);
    }

    #[test]
    fn fixed_capacity_book_preserves_executed_trades_when_residual_cannot_rest() {
        let b = OrderBook::<FixedSlabBookStorage>::with_capacity(1);
        b.submit_passive(10000, 10, Side::Sell).unwrap();

        // The incoming buy partially fills against the one resting slot,
        // then has nowhere to rest its own residual: the fill already
        // applied must stay committed even though the submission errors.
        let err = b.submit(10000, 15, Side::Buy, OrderType::Limit).unwrap_err();
        assert_eq!(err, BookError::AllocationExhausted);
        assert_eq!(b.total_trades(), 1);
        assert_eq!(b.total_volume(), 10);
        assert_eq!(b.size(), 0);
    }

    #[test]
    fn fixed_capacity_book_reuses_freed_slots() {
        let b = OrderBook::<FixedSlabBookStorage>::with_capacity(1);
        let id = b.submit_passive(10000, 5, Side::Buy).unwrap();
        assert_eq!(
            b.submit_passive(9950, 5, Side::Buy),
            Err(BookError::AllocationExhausted)
        );

        assert!(b.cancel(id));
        assert!(b.submit_passive(9950, 5, Side::Buy).is_ok());
    }

    #[test]
    #[should_panic(expected = "handle being destroyed is not the directory's resident for its order_id")]
    fn unlink_and_destroy_panics_when_directory_disagrees_with_the_slab() {
        let mut storage = SlabBookStorage::new();
        let record = OrderRecord::new(1, 0, 10000, 10, Side::Buy, OrderType::Limit);
        let handle = storage.insert_resting(record).unwrap();

        // Deliberately break the invariant this method's debug_assert_eq!
        // exists to catch: the directory no longer names `handle` as
        // order 1's resident. No normal sequence of façade operations can
        // produce this state; it is only reachable by corrupting it here.
        storage.directory.remove(1);
        storage.directory.insert(1, handle + 1);

        storage.unlink_and_destroy(handle);
    }

    #[test]
    #[should_panic(expected = "handle being destroyed is not the directory's resident for its order_id")]
    fn fixed_slab_unlink_and_destroy_panics_when_directory_disagrees_with_the_slab() {
        let mut storage = FixedSlabBookStorage::with_capacity(4);
        let record = OrderRecord::new(1, 0, 10000, 10, Side::Buy, OrderType::Limit);
        let handle = storage.insert_resting(record).unwrap();

        storage.directory.remove(1);
        storage.directory.insert(1, handle + 1);

        storage.unlink_and_destroy(handle);
    }
}
