//! A single-symbol, in-process limit order book and matching engine.
//!
//! Accepts orders, matches them under price-time priority against
//! resting liquidity, maintains the residual book, and exposes
//! real-time market-data views (best bid/ask, spread, mid, depth).
//!
//! The storage layer is a slab allocator (lock-free LIFO free list) plus
//! two price-ordered indices of intrusive FIFO buckets; the matching
//! engine and the public façade are built on top of those. See
//! [`book::OrderBook`] for the entry point.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub mod book;
pub mod directory;
pub mod error;
pub mod index;
pub mod matching;
pub mod record;
pub mod slab;
pub mod sync;
pub mod syncer;
pub mod types;

pub mod prelude {
    pub use crate::book::{BookStorage, FixedSlabBookStorage, MarketDepth, OrderBook, SlabBookStorage};
    pub use crate::error::BookError;
    pub use crate::index::PriceLevel;
    pub use crate::matching::{MatchResult, Trade};
    pub use crate::record::Order;
    pub use crate::syncer::{NullSyncer, OrderBookSyncer};
    pub use crate::types::{price_from_f64, price_to_f64, OrderStatus, OrderType, Price, Quantity, Side, TICK_SCALE};
}
