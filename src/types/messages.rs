//! WebSocket message types.
//!
//! Bitfinex mixes two frame shapes on one socket: JSON objects carrying an
//! `event` field for control traffic, and `[chanId, payload]` arrays for
//! channel data. [`FeedMessage::decode`] resolves the shape once, at the
//! boundary, so the session can match exhaustively.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::precision::{BookLength, Frequency, Precision};
use super::{OrderCount, Price};
use crate::error::Error;
use crate::Result;

/// Command sent to the server
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum WsCommand {
    /// Subscribe to a channel
    Subscribe(SubscribeRequest),
}

/// Parameters of a `book` channel subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscribeRequest {
    /// Channel name, always `book`
    pub channel: String,
    /// Instrument identifier, e.g. `tBTCUSD`
    pub symbol: String,
    /// Update frequency
    pub freq: Frequency,
    /// Price aggregation level
    pub prec: Precision,
    /// Levels per side (server default when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub len: Option<BookLength>,
}

impl SubscribeRequest {
    /// Build a `book` subscription
    pub fn book(
        symbol: impl Into<String>,
        prec: Precision,
        freq: Frequency,
        len: Option<BookLength>,
    ) -> Self {
        Self {
            channel: "book".to_string(),
            symbol: symbol.into(),
            freq,
            prec,
            len,
        }
    }

    /// Encode as the JSON text frame sent on the socket
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&WsCommand::Subscribe(self.clone()))?)
    }
}

/// Control event received from the server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ControlEvent {
    /// Subscription acknowledged
    Subscribed {
        /// Channel name
        channel: String,
        /// Channel id that tags subsequent data frames
        #[serde(rename = "chanId")]
        chan_id: u64,
        /// Subscribed symbol
        #[serde(default)]
        symbol: Option<String>,
        /// Acknowledged precision code
        #[serde(default)]
        prec: Option<String>,
    },
    /// Subscription removed
    Unsubscribed {
        /// Channel id that was released
        #[serde(rename = "chanId")]
        chan_id: u64,
    },
    /// Informational notice (version banner, maintenance, restart)
    Info {
        /// API version, sent on connect
        #[serde(default)]
        version: Option<u32>,
        /// Notice code
        #[serde(default)]
        code: Option<u32>,
        /// Human-readable text
        #[serde(default)]
        msg: Option<String>,
    },
    /// Request rejected
    Error {
        /// Error code
        #[serde(default)]
        code: Option<u32>,
        /// Error text
        #[serde(default)]
        msg: Option<String>,
    },
    /// Any other event (`conf`, `pong`, ...)
    #[serde(other)]
    Other,
}

impl ControlEvent {
    /// Info code asking clients to reconnect because the server is restarting
    pub const INFO_RECONNECT: u32 = 20051;

    /// Whether the server asked for a reconnect
    #[must_use]
    pub fn requests_reconnect(&self) -> bool {
        matches!(self, ControlEvent::Info { code: Some(Self::INFO_RECONNECT), .. })
    }
}

/// One `[price, count, amount]` triple as sent on the wire
///
/// The sign of `amount` carries the side; `count == 0` marks a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLevel {
    /// Level price
    pub price: Price,
    /// Orders at the level, zero for a deletion
    pub count: OrderCount,
    /// Signed size: positive for bids, negative for asks
    pub amount: Decimal,
}

impl RawLevel {
    /// Create a level from its parts
    #[must_use]
    pub const fn new(price: Price, count: OrderCount, amount: Decimal) -> Self {
        Self {
            price,
            count,
            amount,
        }
    }

    fn from_values(values: &[Value]) -> Result<Self> {
        let [price, count, amount] = values else {
            return Err(Error::malformed(format!(
                "expected [price, count, amount], got {} elements",
                values.len()
            )));
        };

        let price = decimal_from_json(price)
            .ok_or_else(|| Error::malformed(format!("price is not a number: {price}")))?;
        let count = count
            .as_u64()
            .and_then(|c| OrderCount::try_from(c).ok())
            .ok_or_else(|| Error::malformed(format!("count is not a valid integer: {count}")))?;
        let amount = decimal_from_json(amount)
            .ok_or_else(|| Error::malformed(format!("amount is not a number: {amount}")))?;

        Ok(Self::new(price, count, amount))
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Array(values) => Self::from_values(values),
            other => Err(Error::malformed(format!("level is not an array: {other}"))),
        }
    }
}

/// Convert a JSON number to an exact decimal
///
/// Integers convert losslessly. Floats go through their shortest round-trip
/// text form, so `0.1` stays `0.1` rather than its binary expansion.
fn decimal_from_json(value: &Value) -> Option<Decimal> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    let f = n.as_f64().filter(|f| f.is_finite())?;
    Decimal::from_str(&f.to_string()).ok()
}

/// Inbound frame, decoded into the shape the session acts on
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// Object frame with an `event` field
    Control(ControlEvent),
    /// `[chanId, "hb"]`
    Heartbeat {
        /// Channel the heartbeat belongs to
        channel_id: u64,
    },
    /// `[chanId, [[price, count, amount], ...]]`
    Snapshot {
        /// Channel the snapshot belongs to
        channel_id: u64,
        /// Every level on both sides
        levels: Vec<RawLevel>,
    },
    /// `[chanId, [price, count, amount]]`
    Delta {
        /// Channel the delta belongs to
        channel_id: u64,
        /// The changed level
        level: RawLevel,
    },
    /// Well-formed channel frame the engine does not use (checksums, etc.)
    Unknown {
        /// Channel the frame belongs to
        channel_id: u64,
    },
}

impl FeedMessage {
    /// Decode one text frame
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedMessage`] for anything that is neither a
    /// control object nor a `[chanId, payload]` array with a recognised
    /// payload.
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::malformed(format!("invalid JSON: {e}")))?;

        match value {
            Value::Object(_) => ControlEvent::deserialize(value)
                .map(FeedMessage::Control)
                .map_err(|e| Error::malformed(format!("bad control event: {e}"))),
            Value::Array(items) => Self::decode_channel_frame(&items),
            other => Err(Error::malformed(format!("unexpected frame: {other}"))),
        }
    }

    fn decode_channel_frame(items: &[Value]) -> Result<Self> {
        let channel_id = items
            .first()
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::malformed("missing channel id"))?;
        let payload = items
            .get(1)
            .ok_or_else(|| Error::malformed("missing payload"))?;

        match payload {
            Value::String(tag) if tag == "hb" => Ok(FeedMessage::Heartbeat { channel_id }),
            Value::String(_) => Ok(FeedMessage::Unknown { channel_id }),
            Value::Array(entries) => {
                // An empty array is an empty snapshot, not a delta
                if entries.is_empty() || entries[0].is_array() {
                    let levels = entries
                        .iter()
                        .map(RawLevel::from_value)
                        .collect::<Result<Vec<_>>>()?;
                    Ok(FeedMessage::Snapshot { channel_id, levels })
                } else {
                    let level = RawLevel::from_values(entries)?;
                    Ok(FeedMessage::Delta { channel_id, level })
                }
            }
            other => Err(Error::malformed(format!("unexpected payload: {other}"))),
        }
    }

    /// Channel id of a data frame, `None` for control events
    #[must_use]
    pub fn channel_id(&self) -> Option<u64> {
        match self {
            FeedMessage::Control(_) => None,
            FeedMessage::Heartbeat { channel_id }
            | FeedMessage::Snapshot { channel_id, .. }
            | FeedMessage::Delta { channel_id, .. }
            | FeedMessage::Unknown { channel_id } => Some(*channel_id),
        }
    }
}
