use book_core::prelude::*;

/// Fills `book` with `n` resting Sell orders walking price upward from
/// `base_price`, `qty` each.
pub fn seed_asks(book: &OrderBook, n: u64, base_price: Price, qty: Quantity) {
    for i in 0..n {
        book.submit_passive(base_price + (i % 500) as Price, qty, Side::Sell)
            .unwrap();
    }
}

/// Fills `book` with `n` resting Buy orders all at `price`.
pub fn seed_bids(book: &OrderBook, n: u64, price: Price, qty: Quantity) {
    for _ in 0..n {
        book.submit_passive(price, qty, Side::Buy).unwrap();
    }
}
