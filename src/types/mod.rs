//! Wire and domain types for the Bitfinex `book` channel.
//!
//! - [`precision`] - Subscription parameters (precision, frequency, length)
//! - [`messages`] - Subscribe request and inbound frame decoding

pub mod messages;
pub mod precision;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use messages::{ControlEvent, FeedMessage, RawLevel, SubscribeRequest};
pub use precision::{BookLength, Frequency, Precision};

/// Price of a level
///
/// Bitfinex sends prices as JSON numbers; they are converted to `Decimal`
/// at the decode boundary so level lookups compare exactly.
pub type Price = Decimal;

/// Aggregate size resting at a level (always non-negative once stored)
pub type Size = Decimal;

/// Number of orders aggregated into a level
pub type OrderCount = u32;

/// Side of the book a level belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Resting buy interest, best (highest) price first
    Bid,
    /// Resting sell interest, best (lowest) price first
    Ask,
}

impl Side {
    /// Classify a signed wire amount
    ///
    /// Positive amounts are bids and negative amounts are asks. Zero falls on
    /// the bid side; it only appears on deletions where the size is ignored.
    #[must_use]
    pub fn from_amount(amount: Decimal) -> Self {
        if amount.is_sign_negative() && !amount.is_zero() {
            Side::Ask
        } else {
            Side::Bid
        }
    }
}
