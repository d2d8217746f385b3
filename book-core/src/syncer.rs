//! Observer hook for external collaborators (market-data relays,
//! journals, the async wrapper's event ring).
//!
//! The core has no wire protocol and no persistence of its own (§6/§7 of
//! the spec), but it still needs a place to notify an embedder that the
//! book changed, without taking a dependency on any particular transport.
//! `OrderBookSyncer` is that seam: the façade calls it after each mutation
//! completes (after the book lock has already been dropped), mirroring
//! the no-op-by-default observer the matching engine carries.

use crate::matching::{MatchResult, Trade};
use crate::record::Order;

/// Notified of book mutations after they complete.
pub trait OrderBookSyncer: Send + Sync {
    /// A new order was accepted (whether or not it rested).
    fn on_submit(&self, order: &Order, result: &MatchResult) {
        let _ = (order, result);
    }
    /// An order was cancelled.
    fn on_cancel(&self, order_id: u64) {
        let _ = order_id;
    }
    /// An order was modified (cancel + re-add under the same id).
    fn on_modify(&self, order: &Order) {
        let _ = order;
    }
    /// A trade was produced during matching.
    fn on_trade(&self, trade: &Trade) {
        let _ = trade;
    }
}

/// No-op syncer: the default when no embedder is listening.
pub struct NullSyncer;

impl OrderBookSyncer for NullSyncer {}
