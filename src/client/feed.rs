//! Background task that runs a [`FeedSession`] against a live transport.
//!
//! [`BookFeed`] is the public face of the crate. It spawns one task that owns
//! the session, the transport, and the three timers, and serializes user
//! commands, transport events, and timer expiries through a single
//! `tokio::select!`. Reads go straight to the shared [`BookHandle`] and never
//! wait on the task.
//!
//! # Example
//!
//! ```rust,no_run
//! use bitfinex_book::{BookFeed, Config};
//!
//! # async fn example() -> bitfinex_book::Result<()> {
//! let feed = BookFeed::spawn(Config::new("tBTCUSD"))?;
//! feed.connect().await?;
//!
//! if let Some(bid) = feed.order_book().bids.first() {
//!     println!("best bid {} x {}", bid.price, bid.size);
//! }
//!
//! feed.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info_span, trace, warn, Instrument};

use crate::client::session::{Effect, FeedSession, SessionEvent};
use crate::client::transport::{Generation, Transport, TransportEvent, TransportSink};
use crate::client::websocket::WebSocketTransport;
use crate::config::Config;
use crate::error::Error;
use crate::orderbook::{BookHandle, BookSnapshot, ConnectionState};
use crate::types::Precision;
use crate::Result;

const COMMAND_BUFFER: usize = 32;

type Ack = oneshot::Sender<()>;

#[derive(Debug)]
enum Command {
    Connect(Ack),
    Close(Ack),
    SetPrecision(Precision, Ack),
    Shutdown(Ack),
}

/// Handle to a running book feed
///
/// Dropping the feed stops its task and closes the connection. Use
/// [`shutdown`](Self::shutdown) to wait for that to finish.
#[derive(Debug)]
pub struct BookFeed {
    commands: mpsc::Sender<Command>,
    book: BookHandle,
    task: JoinHandle<()>,
}

impl BookFeed {
    /// Start a feed over a WebSocket connection
    ///
    /// The feed starts disconnected; call [`connect`](Self::connect).
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn spawn(config: Config) -> Result<Self> {
        Self::with_transport(config, WebSocketTransport::new())
    }

    /// Start a feed over a caller-supplied transport
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn with_transport<T: Transport>(config: Config, transport: T) -> Result<Self> {
        config.validate()?;

        let book = BookHandle::new(config.precision());
        let session = FeedSession::new(&config, book.clone());
        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);

        let span = info_span!("book_feed", symbol = %config.symbol());
        let task = tokio::spawn(Driver::new(session, transport, command_rx).run().instrument(span));

        Ok(Self {
            commands,
            book,
            task,
        })
    }

    /// Connect and subscribe
    ///
    /// Returns once the connection attempt has started, not once the book is
    /// live; watch [`state`](Self::state) for that. A no-op if already
    /// connecting or connected. Resets the reconnect counter otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeedStopped`] if the task has exited.
    pub async fn connect(&self) -> Result<()> {
        self.request(Command::Connect).await
    }

    /// Close the connection and cancel any pending reconnect
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeedStopped`] if the task has exited.
    pub async fn close(&self) -> Result<()> {
        self.request(Command::Close).await
    }

    /// Resubscribe at the given precision, clearing the book
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeedStopped`] if the task has exited.
    pub async fn set_precision(&self, precision: Precision) -> Result<()> {
        self.request(|ack| Command::SetPrecision(precision, ack)).await
    }

    /// Step one level finer and return the new precision
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeedStopped`] if the task has exited.
    pub async fn increase_precision(&self) -> Result<Precision> {
        let precision = self.precision().finer();
        self.set_precision(precision).await?;
        Ok(precision)
    }

    /// Step one level coarser and return the new precision
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeedStopped`] if the task has exited.
    pub async fn decrease_precision(&self) -> Result<Precision> {
        let precision = self.precision().coarser();
        self.set_precision(precision).await?;
        Ok(precision)
    }

    /// Copy of the current book
    pub fn order_book(&self) -> BookSnapshot {
        self.book.snapshot()
    }

    /// Whether a connection is open
    pub fn is_connected(&self) -> bool {
        self.book.is_connected()
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.book.state()
    }

    /// Precision of the current subscription
    pub fn precision(&self) -> Precision {
        self.book.precision()
    }

    /// Shared read handle, usable from other tasks and threads
    pub fn handle(&self) -> &BookHandle {
        &self.book
    }

    /// Close the session and wait for the task to exit
    ///
    /// # Errors
    ///
    /// Returns [`Error::FeedStopped`] if the task had already exited.
    pub async fn shutdown(self) -> Result<()> {
        let requested = self.request(Command::Shutdown).await;
        drop(self.commands);

        if let Err(e) = self.task.await {
            error!(error = %e, "feed task did not exit cleanly");
            return Err(Error::FeedStopped);
        }
        requested
    }

    async fn request(&self, command: impl FnOnce(Ack) -> Command) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(command(ack))
            .await
            .map_err(|_| Error::FeedStopped)?;
        done.await.map_err(|_| Error::FeedStopped)
    }
}

/// Owner of everything mutable; runs inside the spawned task
struct Driver<T> {
    session: FeedSession,
    transport: T,
    commands: mpsc::Receiver<Command>,
    events_tx: mpsc::UnboundedSender<(Generation, TransportEvent)>,
    events_rx: mpsc::UnboundedReceiver<(Generation, TransportEvent)>,
    /// Current connection; anything tagged otherwise is stale
    generation: Generation,
    reconnect_at: Option<Instant>,
    handshake_deadline: Option<Instant>,
    liveness_deadline: Option<Instant>,
}

impl<T: Transport> Driver<T> {
    fn new(session: FeedSession, transport: T, commands: mpsc::Receiver<Command>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            session,
            transport,
            commands,
            events_tx,
            events_rx,
            generation: 0,
            reconnect_at: None,
            handshake_deadline: None,
            liveness_deadline: None,
        }
    }

    async fn run(mut self) {
        debug!("feed task started");

        loop {
            let event = tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        // Every BookFeed handle is gone
                        let effects = self.session.close();
                        self.apply(effects);
                        break;
                    };
                    if self.on_command(command) {
                        break;
                    }
                    continue;
                }
                Some((generation, event)) = self.events_rx.recv() => {
                    if generation != self.generation {
                        trace!(generation, current = self.generation, "stale transport event dropped");
                        continue;
                    }
                    SessionEvent::Transport(event)
                }
                () = wait_for(self.reconnect_at) => {
                    self.reconnect_at = None;
                    SessionEvent::ReconnectTimerFired
                }
                () = wait_for(self.handshake_deadline) => {
                    self.handshake_deadline = None;
                    SessionEvent::HandshakeTimedOut
                }
                () = wait_for(self.liveness_deadline) => {
                    self.liveness_deadline = None;
                    SessionEvent::LivenessTimedOut
                }
            };

            let effects = self.session.handle(event);
            self.apply(effects);
        }

        self.transport.close();
        debug!("feed task stopped");
    }

    /// Returns `true` when the task should stop
    fn on_command(&mut self, command: Command) -> bool {
        let (effects, ack, stop) = match command {
            Command::Connect(ack) => (self.session.connect(), ack, false),
            Command::Close(ack) => (self.session.close(), ack, false),
            Command::SetPrecision(precision, ack) => {
                (self.session.set_precision(precision), ack, false)
            }
            Command::Shutdown(ack) => (self.session.close(), ack, true),
        };

        self.apply(effects);
        // The caller may have stopped waiting
        let _ = ack.send(());
        stop
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        let mut queue = VecDeque::from(effects);

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Open { url } => {
                    self.generation += 1;
                    let sink = TransportSink::new(self.generation, self.events_tx.clone());
                    self.transport.open(&url, sink);
                }
                Effect::Send(text) => match self.transport.send(text) {
                    Ok(()) => {}
                    Err(e) if e.is_connection_level() => {
                        error!(error = %e, "send failed");
                        let failure = SessionEvent::Transport(TransportEvent::Error(e.to_string()));
                        // Whatever followed the send assumed it went out
                        queue.clear();
                        queue.extend(self.session.handle(failure));
                    }
                    // The socket is still usable; the handshake deadline covers a lost subscribe
                    Err(e) => warn!(error = %e, "frame not sent"),
                },
                Effect::CloseTransport => {
                    self.transport.close();
                    self.generation += 1;
                }
                Effect::ScheduleReconnect(delay) => {
                    self.reconnect_at = deadline_after(delay);
                }
                Effect::CancelReconnect => self.reconnect_at = None,
                Effect::SetHandshakeDeadline(timeout) => {
                    self.handshake_deadline = timeout.and_then(deadline_after);
                }
                Effect::SetLivenessDeadline(timeout) => {
                    self.liveness_deadline = timeout.and_then(deadline_after);
                }
            }
        }
    }
}

/// Instant `after` from now, or `None` if that lies beyond the clock's range
fn deadline_after(after: Duration) -> Option<Instant> {
    let deadline = Instant::now().checked_add(after);
    if deadline.is_none() {
        warn!(?after, "timer out of range, not armed");
    }
    deadline
}

/// Resolves at `deadline`, or never when there is none
async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
