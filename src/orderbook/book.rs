//! Core orderbook data structure.
//!
//! This implementation uses `BTreeMap` for sorted price levels, providing:
//!
//! - O(log n) insertion, deletion, and lookup
//! - O(1) access to best bid/ask (via `first_key_value` / `last_key_value`)
//! - Ordered iteration for depth-of-book queries
//!
//! Because the map is keyed by price, each side is sorted and free of
//! duplicate prices after every mutation, not just after snapshots.

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::Error;
use crate::types::messages::RawLevel;
use crate::types::{OrderCount, Price, Side, Size};
use crate::Result;

/// Aggregate resting volume at one price on one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceLevel {
    /// Level price
    pub price: Price,
    /// Total size (absolute value of the wire amount)
    pub size: Size,
    /// Number of orders at the level, never zero
    pub count: OrderCount,
}

impl PriceLevel {
    /// Create a level from its parts
    #[must_use]
    pub const fn new(price: Price, size: Size, count: OrderCount) -> Self {
        Self { price, size, count }
    }

    /// Size as a fraction of `max`, clamped to `[0, 1]`
    ///
    /// Used for depth bars; pair with [`BookSnapshot::max_size`].
    #[must_use]
    pub fn depth_ratio(&self, max: Size) -> f64 {
        if max <= Decimal::ZERO {
            return 0.0;
        }
        let ratio = (self.size / max).clamp(Decimal::ZERO, Decimal::ONE);
        ratio.to_f64().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Level {
    size: Size,
    count: OrderCount,
}

/// Immutable copy of both sides, best level first
///
/// This is what readers hold while the live book keeps changing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookSnapshot {
    /// Bid levels, price descending
    pub bids: Vec<PriceLevel>,
    /// Ask levels, price ascending
    pub asks: Vec<PriceLevel>,
}

impl BookSnapshot {
    /// Levels of one side, best first
    #[must_use]
    pub fn side(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// Largest size on a side, never below one
    ///
    /// The floor keeps thin books from rendering every bar at full width.
    #[must_use]
    pub fn max_size(&self, side: Side) -> Size {
        self.side(side)
            .iter()
            .map(|level| level.size)
            .fold(Decimal::ONE, Decimal::max)
    }

    /// Whether both sides are empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// Local order book for a single symbol.
///
/// # Design Decisions
///
/// 1. **Decimal prices**: The feed sends floats; they are converted to
///    `Decimal` on decode so price keys compare exactly.
///
/// 2. **BTreeMap**: Both sides are stored ascending. Bids are read in reverse
///    so the best bid comes first.
///
/// 3. **Validate before mutate**: A rejected snapshot or delta leaves the book
///    exactly as it was.
///
/// # Thread Safety
///
/// This struct is `Send + Sync` but not internally synchronized. The feed
/// wraps it in a [`BookHandle`](super::BookHandle) for concurrent reads.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    /// Bid levels: price -> level, read in reverse (best bid = highest = last)
    bids: BTreeMap<Price, Level>,

    /// Ask levels: price -> level (best ask = lowest = first)
    asks: BTreeMap<Price, Level>,
}

impl OrderBook {
    /// Create a new empty orderbook
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<Price, Level> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Replace the whole book with a snapshot
    ///
    /// Each entry is classified by the sign of its amount. Entries with a
    /// zero count carry no resting volume and are skipped. An empty snapshot
    /// is valid and leaves an empty book.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedMessage`] if any entry is invalid. The book
    /// is not modified in that case.
    pub fn apply_snapshot(&mut self, levels: &[RawLevel]) -> Result<()> {
        for level in levels {
            validate(level)?;
        }

        self.bids.clear();
        self.asks.clear();

        for level in levels.iter().filter(|l| l.count > 0) {
            self.side_mut(Side::from_amount(level.amount)).insert(
                level.price,
                Level {
                    size: level.amount.abs(),
                    count: level.count,
                },
            );
        }

        Ok(())
    }

    /// Apply one incremental update
    ///
    /// The amount's sign picks the side. A zero count removes the price from
    /// that side (a no-op if it is absent). Otherwise the level is inserted or
    /// its size and count replaced in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedMessage`] if the price is not positive, or an
    /// upsert carries a zero amount. The book is not modified in that case.
    pub fn apply_delta(&mut self, level: RawLevel) -> Result<()> {
        validate(&level)?;

        let side = self.side_mut(Side::from_amount(level.amount));
        if level.count == 0 {
            side.remove(&level.price);
        } else {
            side.insert(
                level.price,
                Level {
                    size: level.amount.abs(),
                    count: level.count,
                },
            );
        }

        Ok(())
    }

    /// Copy both sides out, best level first
    #[must_use]
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            bids: self.bids().collect(),
            asks: self.asks().collect(),
        }
    }

    /// Get the best bid (highest bid)
    #[must_use]
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.last_key_value().map(to_level)
    }

    /// Get the best ask (lowest ask)
    #[must_use]
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.first_key_value().map(to_level)
    }

    /// Get the mid price
    ///
    /// Returns the average of best bid and best ask, or `None` if either is missing.
    #[must_use]
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / Decimal::TWO),
            _ => None,
        }
    }

    /// Get the spread (best ask minus best bid)
    #[must_use]
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Check if the book is crossed (best bid >= best ask)
    ///
    /// This shouldn't happen in a healthy market but is useful for validation.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        }
    }

    /// Get all bid levels, sorted by price descending (best first)
    pub fn bids(&self) -> impl Iterator<Item = PriceLevel> + '_ {
        self.bids.iter().rev().map(to_level)
    }

    /// Get all ask levels, sorted by price ascending (best first)
    pub fn asks(&self) -> impl Iterator<Item = PriceLevel> + '_ {
        self.asks.iter().map(to_level)
    }

    /// Get the top N bid levels
    #[must_use]
    pub fn top_bids(&self, n: usize) -> Vec<PriceLevel> {
        self.bids().take(n).collect()
    }

    /// Get the top N ask levels
    #[must_use]
    pub fn top_asks(&self, n: usize) -> Vec<PriceLevel> {
        self.asks().take(n).collect()
    }

    /// Get total bid size
    #[must_use]
    pub fn total_bid_size(&self) -> Size {
        self.bids.values().map(|l| l.size).sum()
    }

    /// Get total ask size
    #[must_use]
    pub fn total_ask_size(&self) -> Size {
        self.asks.values().map(|l| l.size).sum()
    }

    /// Clear the orderbook
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }

    /// Check if the orderbook is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Get the number of price levels as `(bids, asks)`
    #[must_use]
    pub fn num_levels(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }
}

fn to_level((price, level): (&Price, &Level)) -> PriceLevel {
    PriceLevel::new(*price, level.size, level.count)
}

fn validate(level: &RawLevel) -> Result<()> {
    if level.price <= Decimal::ZERO {
        return Err(Error::malformed(format!(
            "price must be positive, got {}",
            level.price
        )));
    }
    if level.count > 0 && level.amount.is_zero() {
        return Err(Error::malformed(format!(
            "level at {} has orders but zero amount",
            level.price
        )));
    }
    Ok(())
}
