//! Shared scalar and enum types for the book.
//!
//! Prices are a signed fixed-point scalar in minimum tick units. The scale
//! (ticks per unit, e.g. 1 tick = 0.01) is a build-time constant of the
//! system; all ordering and equality comparisons on `Price` are plain
//! integer comparisons. Conversion to/from floating point only happens at
//! the boundary (`Price::from_f64` / `Price::to_f64`), never in the hot
//! matching path.

/// Minimum price increment, expressed as ticks per whole unit.
///
/// Changing this rescales every `Price` in the system; it is a
/// compile-time constant rather than a runtime parameter because the core
/// never needs to compare books quoted at different scales.
pub const TICK_SCALE: i64 = 100;

/// A price expressed in minimum tick units.
pub type Price = i64;

/// An order or trade quantity. Always non-negative; `quantity > 0` is a
/// precondition on order submission, not an invariant enforced by the type.
pub type Quantity = u64;

/// Converts a floating-point price into tick units, rounding to the
/// nearest tick. Only used at the boundary of the core (CLI/binding glue).
pub fn price_from_f64(value: f64) -> Price {
    (value * TICK_SCALE as f64).round() as Price
}

/// Converts a tick-unit price back into floating point for display.
pub fn price_to_f64(price: Price) -> f64 {
    price as f64 / TICK_SCALE as f64
}

/// Direction of an order: which side of the book it rests on, and which
/// side of the book it matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Acquires the asset; matches against resting asks, rests among bids.
    Buy,
    /// Disposes of the asset; matches against resting bids, rests among asks.
    Sell,
}

impl Side {
    /// The side an order of `self` matches against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// How an order's price constrains matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderType {
    /// Matches only at a price no worse than its limit; residual rests.
    Limit,
    /// Matches at any price; never rests.
    Market,
}

/// Lifecycle state of an order record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    /// Accepted, unmatched.
    New,
    /// Matched for part, but not all, of its quantity.
    PartiallyFilled,
    /// Matched for its full quantity.
    Filled,
    /// Removed from the book before being fully filled.
    Cancelled,
}
