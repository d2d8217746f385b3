//! The price-level index (component C): two ordered price→bucket maps,
//! each bucket an intrusive FIFO of order handles.
//!
//! Invariants upheld by this module alone (the matching engine and the
//! façade rely on them):
//! - no bucket is ever stored empty — the map contains no empty buckets;
//! - a bucket's traversal order (`head` → `next` → … → `tail`) equals
//!   insertion order at that price, i.e. time priority;
//! - the map's natural iteration order is the side's price priority
//!   direction: descending for bids, ascending for asks.
//!
//! `BTreeMap` gives the ordering for free; the bucket is the intrusive
//! FIFO described in the design notes, realized as slab handles rather
//! than raw pointers.

use crate::record::OrderRecord;
use crate::slab::{Handle, SlotStore, NULL_HANDLE};
use crate::types::{Price, Quantity, Side};
use std::collections::BTreeMap;

/// A FIFO queue of order handles sharing one price on one side.
#[derive(Debug, Default, Clone, Copy)]
pub struct Bucket {
    head: Handle,
    tail: Handle,
    count: usize,
}

impl Bucket {
    fn empty() -> Self {
        Self {
            head: NULL_HANDLE,
            tail: NULL_HANDLE,
            count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn head(&self) -> Handle {
        self.head
    }
}

/// One side's aggregated level, returned by `aggregate_depth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLevel {
    pub price: Price,
    pub total_quantity: Quantity,
    pub order_count: usize,
}

/// Two-sided price-level index.
pub struct PriceLevelIndex {
    bids: BTreeMap<Price, Bucket>,
    asks: BTreeMap<Price, Bucket>,
}

impl PriceLevelIndex {
    pub fn new() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    fn side_map(&self, side: Side) -> &BTreeMap<Price, Bucket> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn side_map_mut(&mut self, side: Side) -> &mut BTreeMap<Price, Bucket> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Appends `handle` to the tail of the bucket matching the record's
    /// own `side`/`price` (already set on the record at `handle`),
    /// creating the bucket if it is not already present.
    pub fn insert_tail(&mut self, slab: &mut impl SlotStore, handle: Handle) {
        let (side, price) = {
            let record = unsafe { slab.get(handle) };
            (record.side, record.price)
        };
        let map = self.side_map_mut(side);
        let bucket = map.entry(price).or_insert_with(Bucket::empty);

        let prev_tail = bucket.tail;
        {
            let record = unsafe { slab.get_mut(handle) };
            record.prev = prev_tail;
            record.next = NULL_HANDLE;
        }

        if prev_tail != NULL_HANDLE {
            unsafe { slab.get_mut(prev_tail) }.next = handle;
        } else {
            bucket.head = handle;
        }
        bucket.tail = handle;
        bucket.count += 1;
    }

    /// Splices `handle` out of its bucket by its local links, erasing the
    /// bucket from the map if it becomes empty. The record at `handle`
    /// must still carry the `side`/`price`/`prev`/`next` it was inserted
    /// with.
    pub fn unlink(&mut self, slab: &mut impl SlotStore, handle: Handle) {
        let (side, price, prev, next) = {
            let record = unsafe { slab.get(handle) };
            (record.side, record.price, record.prev, record.next)
        };

        if prev != NULL_HANDLE {
            unsafe { slab.get_mut(prev) }.next = next;
        }
        if next != NULL_HANDLE {
            unsafe { slab.get_mut(next) }.prev = prev;
        }

        let map = self.side_map_mut(side);
        if let Some(bucket) = map.get_mut(&price) {
            if bucket.head == handle {
                bucket.head = next;
            }
            if bucket.tail == handle {
                bucket.tail = prev;
            }
            bucket.count = bucket.count.saturating_sub(1);
            if bucket.count == 0 {
                map.remove(&price);
            }
        }
    }

    /// The handle of the head of the best bucket for `side`, or
    /// `NULL_HANDLE` if that side is empty. "Best" is highest price for
    /// bids, lowest price for asks.
    pub fn best(&self, side: Side) -> Handle {
        let map = self.side_map(side);
        let entry = match side {
            Side::Buy => map.iter().next_back(),
            Side::Sell => map.iter().next(),
        };
        entry.map(|(_, bucket)| bucket.head).unwrap_or(NULL_HANDLE)
    }

    /// The best price for `side`, if any resting order exists there.
    pub fn best_price(&self, side: Side) -> Option<Price> {
        let map = self.side_map(side);
        match side {
            Side::Buy => map.keys().next_back().copied(),
            Side::Sell => map.keys().next().copied(),
        }
    }

    /// Snapshot of the handles resting at `price` on `side`, in FIFO order.
    pub fn orders_at(&self, slab: &impl SlotStore, side: Side, price: Price) -> Vec<Handle> {
        let mut out = Vec::new();
        let Some(bucket) = self.side_map(side).get(&price) else {
            return out;
        };
        let mut cursor = bucket.head;
        while cursor != NULL_HANDLE {
            out.push(cursor);
            cursor = unsafe { slab.get(cursor) }.next;
        }
        out
    }

    /// Walks up to `max_levels` buckets from best outward, summing
    /// remaining quantity and counting records at each price.
    pub fn aggregate_depth(&self, slab: &impl SlotStore, side: Side, max_levels: usize) -> Vec<PriceLevel> {
        let map = self.side_map(side);
        let prices: Box<dyn Iterator<Item = (&Price, &Bucket)>> = match side {
            Side::Buy => Box::new(map.iter().rev()),
            Side::Sell => Box::new(map.iter()),
        };

        prices
            .take(max_levels)
            .map(|(&price, bucket)| {
                let mut total_quantity = 0;
                let mut cursor = bucket.head;
                while cursor != NULL_HANDLE {
                    let record = unsafe { slab.get(cursor) };
                    total_quantity += record.remaining();
                    cursor = record.next;
                }
                PriceLevel {
                    price,
                    total_quantity,
                    order_count: bucket.count,
                }
            })
            .collect()
    }

    pub fn is_side_empty(&self, side: Side) -> bool {
        self.side_map(side).is_empty()
    }

    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }
}

impl Default for PriceLevelIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slab::Slab;
    use crate::types::OrderType;

    fn order(id: u64, side: Side, price: Price, qty: Quantity) -> OrderRecord {
        OrderRecord::new(id, id, price, qty, side, OrderType::Limit)
    }

    #[test]
    fn fifo_order_preserved_within_a_bucket() {
        let mut slab = Slab::new();
        let mut index = PriceLevelIndex::new();

        let ha = slab.construct(order(1, Side::Buy, 100, 5));
        index.insert_tail(&mut slab, ha);

        let hb = slab.construct(order(2, Side::Buy, 100, 7));
        index.insert_tail(&mut slab, hb);

        let snapshot = index.orders_at(&slab, Side::Buy, 100);
        assert_eq!(snapshot, vec![ha, hb]);
        assert_eq!(index.best(Side::Buy), ha);
    }

    #[test]
    fn empty_bucket_is_erased_from_the_map() {
        let mut slab = Slab::new();
        let mut index = PriceLevelIndex::new();

        let ha = slab.construct(order(1, Side::Sell, 100, 5));
        index.insert_tail(&mut slab, ha);
        index.unlink(&mut slab, ha);

        assert!(index.is_side_empty(Side::Sell));
        assert_eq!(index.best_price(Side::Sell), None);
    }

    #[test]
    fn best_bid_is_highest_price_best_ask_is_lowest() {
        let mut slab = Slab::new();
        let mut index = PriceLevelIndex::new();

        for (id, price) in [(1, 100), (2, 105), (3, 95)] {
            let h = slab.construct(order(id, Side::Buy, price, 1));
            index.insert_tail(&mut slab, h);
        }
        assert_eq!(index.best_price(Side::Buy), Some(105));

        for (id, price) in [(4, 100), (5, 95), (6, 105)] {
            let h = slab.construct(order(id, Side::Sell, price, 1));
            index.insert_tail(&mut slab, h);
        }
        assert_eq!(index.best_price(Side::Sell), Some(95));
    }
}
