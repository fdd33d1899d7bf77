//! Connection side of the feed.
//!
//! This module contains:
//!
//! - [`feed`] - the [`BookFeed`] task users interact with
//! - [`session`] - the connection and subscription state machine
//! - [`reconnect`] - linear backoff policy
//! - [`transport`] - the message channel abstraction
//! - [`websocket`] - the tokio-tungstenite transport

pub mod feed;
pub mod reconnect;
pub mod session;
pub mod transport;
pub mod websocket;

pub use feed::BookFeed;
pub use reconnect::ReconnectConfig;
pub use session::{Effect, FeedSession, SessionEvent};
pub use transport::{Transport, TransportEvent, TransportSink};
pub use websocket::WebSocketTransport;
