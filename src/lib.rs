//! # bitfinex-book
//!
//! Keeps a local copy of a Bitfinex order book in sync over the public
//! WebSocket API.
//!
//! ## Features
//!
//! - **Book Channel Subscription** - Snapshot then incremental updates for one symbol
//! - **Sorted Local Book** - Bids descending, asks ascending, exact `Decimal` prices
//! - **Automatic Reconnect** - Linear backoff with a bounded number of attempts
//! - **Precision Control** - Switch aggregation level (`P0`..`P4`) at runtime
//! - **Lock-light Reads** - Snapshots clone under a read lock and never wait on I/O
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bitfinex_book::{BookFeed, Config};
//! use bitfinex_book::types::Precision;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bitfinex_book::Error> {
//!     let config = Config::new("tBTCUSD").with_precision(Precision::P1);
//!     let feed = BookFeed::spawn(config)?;
//!     feed.connect().await?;
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(2)).await;
//!
//!     let book = feed.order_book();
//!     println!("{} bids, {} asks", book.bids.len(), book.asks.len());
//!
//!     // Coarser buckets
//!     feed.decrease_precision().await?;
//!
//!     feed.shutdown().await
//! }
//! ```
//!
//! ## Wire Format
//!
//! Book levels arrive as `[price, count, amount]` triples:
//! - `count > 0` adds or replaces the level at `price`
//! - `count == 0` removes it (side chosen by the sign of `amount`)
//! - `amount > 0` is a bid, `amount < 0` is an ask
//!
//! ## Architecture
//!
//! This crate is organized into several modules:
//!
//! - [`client`] - Feed task, session state machine, and transports
//! - [`types`] - Subscription parameters and wire messages
//! - [`orderbook`] - The local book and its shared read handle
//! - [`config`] - Feed configuration
//! - [`error`] - Error types for the crate
//!
//! ## Logging
//!
//! All diagnostics go through `tracing`. The crate never installs a
//! subscriber; add one (for example `tracing-subscriber`) to see them.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod orderbook;
pub mod types;

// Re-export main types at crate root for convenience
pub use client::BookFeed;
pub use config::Config;
pub use error::Error;
pub use orderbook::{BookHandle, BookSnapshot, ConnectionState, PriceLevel};

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;
