//! Bidirectional message channel the feed runs over.
//!
//! The session never touches a socket. It asks a [`Transport`] to open, send,
//! and close, and the transport reports back asynchronously through a
//! [`TransportSink`]. [`WebSocketTransport`](super::websocket::WebSocketTransport)
//! is the production implementation; tests plug in their own.

use tokio::sync::mpsc;

use crate::Result;

/// Something that happened on a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection established
    Opened,
    /// Text frame received
    Message(String),
    /// Connection failed; no further events follow
    Error(String),
    /// Connection closed by the peer; no further events follow
    Closed(Option<String>),
}

/// Identifies one connection, so events from a torn-down socket can be dropped
pub type Generation = u64;

/// Delivery end for transport events
///
/// Each `open` gets a fresh sink stamped with its own generation.
#[derive(Debug, Clone)]
pub struct TransportSink {
    generation: Generation,
    tx: mpsc::UnboundedSender<(Generation, TransportEvent)>,
}

impl TransportSink {
    pub(crate) fn new(
        generation: Generation,
        tx: mpsc::UnboundedSender<(Generation, TransportEvent)>,
    ) -> Self {
        Self { generation, tx }
    }

    /// Generation this sink reports for
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Deliver an event to the feed
    ///
    /// Returns `false` once the feed has gone away.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx.send((self.generation, event)).is_ok()
    }
}

/// Message channel the feed session drives
///
/// Implementations must not block: `open` starts connecting and returns, and
/// the outcome arrives later as [`TransportEvent::Opened`] or a terminal
/// event on the sink.
pub trait Transport: Send + 'static {
    /// Start connecting to `url`, reporting through `events`
    ///
    /// Any previous connection must already be closed.
    fn open(&mut self, url: &str, events: TransportSink);

    /// Queue a text frame on the open connection
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) if
    /// nothing is open.
    fn send(&mut self, text: String) -> Result<()>;

    /// Close the connection, if any. Must be idempotent.
    fn close(&mut self);
}
