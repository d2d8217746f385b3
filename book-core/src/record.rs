//! The fixed-layout order record (component A).
//!
//! One `OrderRecord` is the unit the slab allocates and the price-level
//! index links into intrusive FIFOs. It is a plain aggregate: identity,
//! price, quantities, side, type, status, and the `prev`/`next` neighbor
//! handles describing its position in its price bucket's queue.
//!
//! `prev`/`next` are slab handles, not pointers — see `slab.rs`. When a
//! record is not resident in any bucket (free, or not yet inserted) both
//! are `NULL_HANDLE`.

use crate::slab::{Handle, NULL_HANDLE};
use crate::types::{OrderStatus, OrderType, Price, Quantity, Side};

/// A live or recently-live order, as stored in the slab.
///
/// Cache-line sized: asserted to be exactly 64 bytes on a 64-bit target.
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy)]
pub struct OrderRecord {
    /// Unique for the lifetime of the book; never zero for a live order.
    pub order_id: u64,
    /// Monotonic-ish wall-clock stamp assigned at creation. Informational:
    /// bucket FIFO position, not this stamp, governs tie-breaking (§4E).
    pub timestamp_ns: u64,
    /// Limit price in minimum tick units. Unused (zero) for market orders.
    pub price: Price,
    /// Original quantity, fixed at construction.
    pub quantity: Quantity,
    /// Cumulative filled quantity; always `<= quantity`.
    pub filled_quantity: Quantity,
    pub side: Side,
    pub order_type: OrderType,
    pub status: OrderStatus,
    /// Neighbor within the price bucket's FIFO, or `NULL_HANDLE`.
    pub prev: Handle,
    /// Neighbor within the price bucket's FIFO, or `NULL_HANDLE`.
    pub next: Handle,
}

const _: () = assert!(std::mem::size_of::<OrderRecord>() == 64);

impl OrderRecord {
    /// Builds a freshly-submitted record: unfilled, `New`, unlinked.
    pub fn new(
        order_id: u64,
        timestamp_ns: u64,
        price: Price,
        quantity: Quantity,
        side: Side,
        order_type: OrderType,
    ) -> Self {
        Self {
            order_id,
            timestamp_ns,
            price,
            quantity,
            filled_quantity: 0,
            side,
            order_type,
            status: OrderStatus::New,
            prev: NULL_HANDLE,
            next: NULL_HANDLE,
        }
    }

    /// Unfilled quantity remaining.
    #[inline(always)]
    pub fn remaining(&self) -> Quantity {
        self.quantity - self.filled_quantity
    }

    #[inline(always)]
    pub fn is_fully_filled(&self) -> bool {
        self.filled_quantity == self.quantity
    }

    /// Whether `self` (the incoming order) may match `other` (a resting
    /// order on the opposite side) on price alone.
    #[inline(always)]
    pub fn can_match_with(&self, other: &OrderRecord) -> bool {
        if self.side == other.side {
            return false;
        }
        match self.side {
            Side::Buy => self.price >= other.price,
            Side::Sell => self.price <= other.price,
        }
    }

    /// Applies a fill of `qty` against this record, updating its status.
    #[inline(always)]
    pub fn apply_fill(&mut self, qty: Quantity) {
        self.filled_quantity += qty;
        self.status = if self.is_fully_filled() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
    }
}

/// Read-only external view of a live order, returned by `find`/`depth`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Order {
    pub order_id: u64,
    pub timestamp_ns: u64,
    pub price: Price,
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    pub side: Side,
    pub order_type: OrderType,
    pub status: OrderStatus,
}

impl From<&OrderRecord> for Order {
    fn from(record: &OrderRecord) -> Self {
        Self {
            order_id: record.order_id,
            timestamp_ns: record.timestamp_ns,
            price: record.price,
            quantity: record.quantity,
            filled_quantity: record.filled_quantity,
            side: record.side,
            order_type: record.order_type,
            status: record.status,
        }
    }
}
