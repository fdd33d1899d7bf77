//! Shared, read-mostly view of the live book.
//!
//! This module provides [`BookHandle`], a cloneable handle that the feed task
//! writes through and any number of readers poll.
//!
//! # Design
//!
//! The handle wraps a `parking_lot::RwLock`. Every mutation (a whole snapshot
//! or a single delta) runs under one write lock, and readers copy out under
//! the read lock, so a reader never observes a partially-applied update.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::messages::RawLevel;
use crate::types::Precision;
use crate::Result;

use super::book::{BookSnapshot, OrderBook, PriceLevel};

/// Lifecycle of the streaming session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection and no retry pending
    #[default]
    Disconnected,
    /// Transport is opening
    Connecting,
    /// Transport is open, waiting for the subscription acknowledgment
    Subscribing,
    /// Subscribed and applying book updates
    Live,
    /// Deliberate shutdown in progress
    Closing,
    /// Connection lost, a reconnect is scheduled
    Failed,
}

impl ConnectionState {
    /// Whether the transport is open
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Subscribing | ConnectionState::Live)
    }

    /// Whether a connection is open or being opened
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Subscribing | ConnectionState::Live
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Subscribing => "subscribing",
            ConnectionState::Live => "live",
            ConnectionState::Closing => "closing",
            ConnectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct Published {
    book: OrderBook,
    state: ConnectionState,
    precision: Precision,
    /// Bumped on every applied mutation
    version: u64,
}

/// Cloneable handle to the live book and its connection status.
///
/// Only the feed session writes; everything public here is a read.
///
/// # Thread Safety
///
/// The handle is safe to share across threads. Reads hold the lock only for
/// as long as it takes to copy out.
///
/// # Example
///
/// ```rust
/// use bitfinex_book::orderbook::BookHandle;
/// use bitfinex_book::types::Precision;
///
/// let handle = BookHandle::new(Precision::P0);
/// let snapshot = handle.snapshot();
/// assert!(snapshot.is_empty());
/// assert!(!handle.is_connected());
/// ```
#[derive(Debug, Clone, Default)]
pub struct BookHandle {
    inner: Arc<RwLock<Published>>,
}

impl BookHandle {
    /// Create an empty, disconnected view
    #[must_use]
    pub fn new(precision: Precision) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Published {
                precision,
                ..Published::default()
            })),
        }
    }

    /// Copy of both sides, best level first
    #[must_use]
    pub fn snapshot(&self) -> BookSnapshot {
        self.inner.read().book.snapshot()
    }

    /// Clone of the full book, for queries beyond the snapshot
    #[must_use]
    pub fn get_orderbook(&self) -> OrderBook {
        self.inner.read().book.clone()
    }

    /// Best bid, if any
    #[must_use]
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.inner.read().book.best_bid()
    }

    /// Best ask, if any
    #[must_use]
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.inner.read().book.best_ask()
    }

    /// Current session state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.read().state
    }

    /// Whether the transport is open
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Precision of the current (or next) subscription
    #[must_use]
    pub fn precision(&self) -> Precision {
        self.inner.read().precision
    }

    /// Number of mutations applied so far
    ///
    /// Readers can poll this to skip copying an unchanged book.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.read().version
    }

    pub(crate) fn apply_snapshot(&self, levels: &[RawLevel]) -> Result<()> {
        let mut inner = self.inner.write();
        inner.book.apply_snapshot(levels)?;
        inner.version += 1;
        Ok(())
    }

    pub(crate) fn apply_delta(&self, level: RawLevel) -> Result<()> {
        let mut inner = self.inner.write();
        inner.book.apply_delta(level)?;
        inner.version += 1;
        Ok(())
    }

    pub(crate) fn clear(&self) {
        let mut inner = self.inner.write();
        if !inner.book.is_empty() {
            inner.book.clear();
            inner.version += 1;
        }
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        self.inner.write().state = state;
    }

    pub(crate) fn set_precision(&self, precision: Precision) {
        self.inner.write().precision = precision;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_handle() {
        let handle = BookHandle::new(Precision::P2);
        assert_eq!(handle.precision(), Precision::P2);
        assert_eq!(handle.state(), ConnectionState::Disconnected);
        assert_eq!(handle.version(), 0);
        assert!(handle.snapshot().is_empty());
    }

    #[test]
    fn test_mutations_bump_version() {
        let handle = BookHandle::new(Precision::P0);
        handle
            .apply_snapshot(&[RawLevel::new(dec!(100), 1, dec!(2))])
            .unwrap();
        assert_eq!(handle.version(), 1);

        handle
            .apply_delta(RawLevel::new(dec!(101), 1, dec!(-1)))
            .unwrap();
        assert_eq!(handle.version(), 2);
        assert_eq!(handle.best_ask().map(|l| l.price), Some(dec!(101)));

        // Rejected updates leave the version alone
        assert!(handle
            .apply_delta(RawLevel::new(dec!(-1), 1, dec!(1)))
            .is_err());
        assert_eq!(handle.version(), 2);

        handle.clear();
        assert_eq!(handle.version(), 3);
        handle.clear();
        assert_eq!(handle.version(), 3);
    }

    #[test]
    fn test_clones_share_state() {
        let writer = BookHandle::new(Precision::P0);
        let reader = writer.clone();

        writer.set_state(ConnectionState::Live);
        writer
            .apply_delta(RawLevel::new(dec!(50), 2, dec!(3)))
            .unwrap();

        assert!(reader.is_connected());
        assert_eq!(reader.snapshot().bids.len(), 1);
    }

    #[test]
    fn test_get_orderbook_is_detached_copy() {
        let handle = BookHandle::new(Precision::P0);
        handle
            .apply_snapshot(&[
                RawLevel::new(dec!(100), 1, dec!(2)),
                RawLevel::new(dec!(102), 3, dec!(-4)),
            ])
            .unwrap();

        let book = handle.get_orderbook();
        assert_eq!(book.mid_price(), Some(dec!(101)));
        assert_eq!(book.spread(), Some(dec!(2)));

        // Later writes do not reach the copy
        handle.clear();
        assert!(handle.snapshot().is_empty());
        assert_eq!(book.snapshot().asks.len(), 1);
    }

    #[test]
    fn test_concurrent_readers_see_whole_snapshots() {
        let handle = BookHandle::new(Precision::P0);
        let reader = handle.clone();

        let reader_thread = std::thread::spawn(move || {
            for _ in 0..1_000 {
                let snap = reader.snapshot();
                // Every snapshot written below has exactly one bid and one ask
                assert!(snap.is_empty() || (snap.bids.len() == 1 && snap.asks.len() == 1));
            }
        });

        for i in 1..=1_000i64 {
            let price = rust_decimal::Decimal::from(i);
            handle
                .apply_snapshot(&[
                    RawLevel::new(price, 1, dec!(1)),
                    RawLevel::new(price + dec!(1), 1, dec!(-1)),
                ])
                .unwrap();
        }

        reader_thread.join().unwrap();
    }

    #[test]
    fn test_connection_state_predicates() {
        assert!(ConnectionState::Live.is_connected());
        assert!(ConnectionState::Subscribing.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(ConnectionState::Connecting.is_active());
        assert!(!ConnectionState::Failed.is_active());
        assert_eq!(ConnectionState::Live.to_string(), "live");
    }
}
