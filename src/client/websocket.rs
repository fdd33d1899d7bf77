//! WebSocket transport built on tokio-tungstenite.
//!
//! Each [`Transport::open`] spawns one task that owns the socket. The task
//! forwards text frames to the feed, answers pings, and writes whatever the
//! feed queues. It reports exactly one terminal event (`Error` or `Closed`)
//! unless the feed closed it first.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, trace, warn};

use crate::error::Error;
use crate::Result;

use super::transport::{Transport, TransportEvent, TransportSink};

/// Commands from the feed to the socket task
#[derive(Debug)]
enum Outbound {
    Frame(Message),
    Close,
}

/// [`Transport`] over a real WebSocket
///
/// Must be used from within a Tokio runtime.
#[derive(Debug, Default)]
pub struct WebSocketTransport {
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    task: Option<JoinHandle<()>>,
}

impl WebSocketTransport {
    /// Create a transport with no open connection
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self, url: &str, events: TransportSink) {
        self.close();

        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound = Some(tx);
        self.task = Some(tokio::spawn(run_connection(url.to_string(), events, rx)));
    }

    fn send(&mut self, text: String) -> Result<()> {
        let outbound = self.outbound.as_ref().ok_or(Error::ConnectionClosed)?;
        outbound
            .send(Outbound::Frame(Message::Text(text)))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn close(&mut self) {
        if let Some(outbound) = self.outbound.take() {
            // The task sends a close frame and exits; if it is already gone
            // there is nothing left to close.
            let _ = outbound.send(Outbound::Close);
        }
        self.task = None;
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Terminal event for a socket-level failure
fn failed(e: tungstenite::Error) -> TransportEvent {
    TransportEvent::Error(Error::WebSocket(e).to_string())
}

async fn run_connection(
    url: String,
    events: TransportSink,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    debug!(%url, generation = events.generation(), "opening WebSocket");

    let ws_stream = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            events.emit(failed(e));
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();
    if !events.emit(TransportEvent::Opened) {
        return;
    }

    loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Frame(frame)) => {
                    if let Err(e) = write.send(frame).await {
                        events.emit(failed(e));
                        return;
                    }
                }
                // Closed by the feed; nobody is listening for the outcome
                Some(Outbound::Close) | None => {
                    if let Err(e) = write.close().await {
                        trace!(error = %e, "close handshake failed");
                    }
                    return;
                }
            },
            inbound = read.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if !events.emit(TransportEvent::Message(text)) {
                        return;
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    // Respond to pings automatically
                    if let Err(e) = write.send(Message::Pong(data)).await {
                        events.emit(failed(e));
                        return;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.to_string());
                    events.emit(TransportEvent::Closed(reason));
                    return;
                }
                Some(Ok(other)) => {
                    // Binary, Pong, and raw frames carry nothing for the book
                    trace!(?other, "ignoring non-text frame");
                }
                Some(Err(e)) => {
                    let error = Error::from(e);
                    warn!(%error, "read failed");
                    events.emit(TransportEvent::Error(error.to_string()));
                    return;
                }
                None => {
                    events.emit(TransportEvent::Closed(None));
                    return;
                }
            },
        }
    }
}
