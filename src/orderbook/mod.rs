//! Local order book and its shared read view.
//!
//! - [`book`] - The sorted two-sided store (`OrderBook`)
//! - [`handle`] - [`BookHandle`], the lock-guarded view readers poll
//!
//! # Example
//!
//! ```rust
//! use bitfinex_book::orderbook::OrderBook;
//! use bitfinex_book::types::RawLevel;
//! use rust_decimal::Decimal;
//!
//! let mut book = OrderBook::new();
//!
//! // Positive amounts are bids, negative amounts are asks
//! book.apply_delta(RawLevel::new(Decimal::from(100), 1, Decimal::from(5))).unwrap();
//! book.apply_delta(RawLevel::new(Decimal::from(101), 2, Decimal::from(-3))).unwrap();
//!
//! if let Some(bid) = book.best_bid() {
//!     println!("Best bid: {} @ {}", bid.size, bid.price);
//! }
//! ```

pub mod book;
pub mod handle;

pub use book::{BookSnapshot, OrderBook, PriceLevel};
pub use handle::{BookHandle, ConnectionState};
