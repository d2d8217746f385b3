use book_core::prelude::*;

/// Installs a `tracing` subscriber that writes to the test harness's
/// captured output. Safe to call from multiple tests; only the first
/// call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Submits `n` resting limit orders on `side`, walking price by `step`
/// ticks per order starting from `base_price`, `qty` each. Returns the
/// assigned order ids in submission order.
pub fn passive_ladder(
    book: &OrderBook,
    side: Side,
    base_price: Price,
    step: Price,
    qty: Quantity,
    n: u64,
) -> Vec<u64> {
    (0..n as i64)
        .map(|i| {
            book.submit_passive(base_price + i * step, qty, side)
                .unwrap()
        })
        .collect()
}
