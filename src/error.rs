//! Error types for the bitfinex-book crate.
//!
//! Errors split into two classes. Connection-level errors (transport failures,
//! subscription timeouts) tear the session down and trigger a reconnect.
//! Message-level errors ([`Error::MalformedMessage`]) are logged and the frame
//! is dropped; the session stays live.

use std::time::Duration;

use thiserror::Error;

/// The main error type for this crate
#[derive(Debug, Error)]
pub enum Error {
    /// WebSocket protocol or I/O error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpoint URL could not be parsed
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Connection-level failure reported by the transport
    #[error("transport error: {0}")]
    Transport(String),

    /// Frame could not be decoded or carries an invalid price level
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Server never acknowledged the subscription
    #[error("subscription not acknowledged within {0:?}")]
    SubscriptionTimeout(Duration),

    /// Reconnect ceiling reached; only an explicit connect restarts the session
    #[error("gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted {
        /// Number of reconnect attempts made
        attempts: u32,
    },

    /// Invalid configuration (missing fields, bad format)
    #[error("configuration error: {0}")]
    Config(String),

    /// No open connection to send on
    #[error("WebSocket connection closed")]
    ConnectionClosed,

    /// The feed task has exited and no longer accepts commands
    #[error("feed task stopped")]
    FeedStopped,
}

impl Error {
    /// Shorthand for a [`Error::MalformedMessage`]
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedMessage(msg.into())
    }

    /// Whether this error tears down the connection
    ///
    /// Message-level errors never do; everything touching the socket does.
    #[must_use]
    pub fn is_connection_level(&self) -> bool {
        matches!(
            self,
            Error::WebSocket(_)
                | Error::Transport(_)
                | Error::SubscriptionTimeout(_)
                | Error::ConnectionClosed
        )
    }
}
