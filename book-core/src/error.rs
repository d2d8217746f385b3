//! Error kinds surfaced by the public façade.
//!
//! Precondition and not-found failures surface as a plain `Result` from
//! the offending call and leave the book unchanged; allocation exhaustion
//! during residual insertion surfaces via `MatchResult` (the trades that
//! already executed remain committed). `BookInconsistency` is a fatal,
//! assertion-class error: it denotes an internal invariant violation and
//! is reachable only from deliberately corrupted test fixtures, never
//! from normal operation.

use thiserror::Error;

/// Failure returned by a book-mutating operation.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum BookError {
    /// Submitted order failed a precondition: zero quantity or a
    /// malformed (non-finite, non-positive-tick) price.
    #[error("precondition violated: {0}")]
    PreconditionViolation(&'static str),

    /// `cancel`/`modify`/`find` referenced an order-id not currently live.
    #[error("order not found")]
    NotFound,

    /// An order-id already resident was submitted again. Should not occur
    /// given the monotonic id counter; reachable only via `submit_passive`
    /// misuse.
    #[error("duplicate order id")]
    DuplicateId,

    /// The fixed-capacity slab variant has no free slots.
    #[error("allocator exhausted")]
    AllocationExhausted,

    /// An internal invariant was violated. This is a fatal, assertion-class
    /// condition: it must never be observed outside of deliberately broken
    /// test fixtures.
    #[error("book inconsistency: {0}")]
    BookInconsistency(&'static str),
}
