//! Connection lifecycle and book synchronization state machine.
//!
//! [`FeedSession`] holds no socket and no timers. Each input (a user command,
//! a transport event, or a timer expiry) is a method call that updates the
//! state and returns the [`Effect`]s the caller must carry out. The
//! [`BookFeed`](super::feed::BookFeed) task is the production caller; tests
//! drive the session directly.
//!
//! # States
//!
//! ```text
//! Disconnected -> Connecting -> Subscribing -> Live
//!                     ^              |          |
//!                     |              v          v
//!                     +--(timer)-- Failed <-----+
//! ```
//!
//! `close()` passes through `Closing` to `Disconnected` from anywhere. A
//! failure with no attempts left settles in `Disconnected`.

use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use crate::client::reconnect::ReconnectConfig;
use crate::client::transport::TransportEvent;
use crate::config::Config;
use crate::error::Error;
use crate::orderbook::{BookHandle, ConnectionState};
use crate::types::messages::{ControlEvent, FeedMessage, SubscribeRequest};
use crate::types::{BookLength, Frequency, Precision};

/// Input to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Something happened on the current connection
    Transport(TransportEvent),
    /// The scheduled reconnect delay elapsed
    ReconnectTimerFired,
    /// Connect plus subscribe took longer than the subscription timeout
    HandshakeTimedOut,
    /// No traffic on the live channel within the heartbeat timeout
    LivenessTimedOut,
}

/// Action the session asks its driver to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a new connection
    Open {
        /// Endpoint to connect to
        url: String,
    },
    /// Send a text frame on the open connection
    Send(String),
    /// Tear down the current connection, dropping any events it still emits
    CloseTransport,
    /// Fire [`SessionEvent::ReconnectTimerFired`] after the delay
    ScheduleReconnect(Duration),
    /// Drop any pending reconnect timer
    CancelReconnect,
    /// Arm (`Some`) or disarm (`None`) the handshake deadline
    SetHandshakeDeadline(Option<Duration>),
    /// Arm or re-arm (`Some`) or disarm (`None`) the liveness deadline
    SetLivenessDeadline(Option<Duration>),
}

/// What the session is subscribed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionState {
    /// Server channel id, `None` until the subscription is acknowledged
    pub channel_id: Option<u64>,
    /// Price aggregation level
    pub precision: Precision,
    /// Instrument identifier
    pub symbol: String,
}

/// Sole writer of the connection state, the subscription, and the book
#[derive(Debug)]
pub struct FeedSession {
    url: String,
    frequency: Frequency,
    length: Option<BookLength>,
    reconnect: ReconnectConfig,
    subscription_timeout: Duration,
    heartbeat_timeout: Duration,
    retain_book_on_failure: bool,

    subscription: SubscriptionState,
    state: ConnectionState,
    /// Reconnect attempts since the last successful open
    attempts: u32,
    book: BookHandle,
}

impl FeedSession {
    /// Create a disconnected session writing into `book`
    pub fn new(config: &Config, book: BookHandle) -> Self {
        book.set_precision(config.precision());
        book.set_state(ConnectionState::Disconnected);

        Self {
            url: config.url().to_string(),
            frequency: config.frequency(),
            length: config.length(),
            reconnect: config.reconnect().clone(),
            subscription_timeout: config.subscription_timeout(),
            heartbeat_timeout: config.heartbeat_timeout(),
            retain_book_on_failure: config.retain_book_on_failure(),
            subscription: SubscriptionState {
                channel_id: None,
                precision: config.precision(),
                symbol: config.symbol().to_string(),
            },
            state: ConnectionState::Disconnected,
            attempts: 0,
            book,
        }
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnect attempts since the last successful open
    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts
    }

    /// Current subscription
    pub fn subscription(&self) -> &SubscriptionState {
        &self.subscription
    }

    /// Handle to the book this session writes
    pub fn book(&self) -> &BookHandle {
        &self.book
    }

    /// Start a connection
    ///
    /// A no-op while connecting, subscribing, or live. Otherwise any pending
    /// reconnect is cancelled and the attempt counter restarts, so this also
    /// revives a session that gave up reconnecting.
    pub fn connect(&mut self) -> Vec<Effect> {
        if self.state.is_active() {
            debug!(state = %self.state, "connect ignored");
            return Vec::new();
        }

        self.attempts = 0;
        let mut effects = vec![Effect::CancelReconnect];
        self.begin_connect(&mut effects);
        effects
    }

    /// Shut the session down. Idempotent.
    pub fn close(&mut self) -> Vec<Effect> {
        let mut effects = vec![
            Effect::CancelReconnect,
            Effect::SetHandshakeDeadline(None),
            Effect::SetLivenessDeadline(None),
        ];
        if self.state == ConnectionState::Disconnected {
            return effects;
        }

        let transport_open = self.state.is_active();
        self.transition(ConnectionState::Closing);
        if transport_open {
            effects.push(Effect::CloseTransport);
        }
        self.subscription.channel_id = None;
        self.book.clear();
        self.transition(ConnectionState::Disconnected);
        info!(symbol = %self.subscription.symbol, "feed closed");

        effects
    }

    /// Resubscribe at a different precision
    ///
    /// Precision is fixed per subscription, so this closes and reconnects.
    /// The book is cleared so levels from two precisions never mix.
    pub fn set_precision(&mut self, precision: Precision) -> Vec<Effect> {
        if precision == self.subscription.precision {
            return Vec::new();
        }

        info!(
            from = %self.subscription.precision,
            to = %precision,
            "precision change, restarting subscription"
        );
        let mut effects = self.close();
        self.subscription.precision = precision;
        self.book.set_precision(precision);
        effects.extend(self.connect());
        effects
    }

    /// Process one input
    ///
    /// Never fails: errors are logged and turned into state transitions.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<Effect> {
        let mut effects = Vec::new();

        match event {
            SessionEvent::Transport(TransportEvent::Opened) => self.on_open(&mut effects),
            SessionEvent::Transport(TransportEvent::Message(text)) => {
                self.on_message(&text, &mut effects);
            }
            SessionEvent::Transport(TransportEvent::Error(reason)) => {
                self.fail(&Error::Transport(reason), &mut effects);
            }
            SessionEvent::Transport(TransportEvent::Closed(reason)) => {
                let reason = reason.unwrap_or_else(|| "no reason given".to_string());
                self.fail(
                    &Error::Transport(format!("closed by server: {reason}")),
                    &mut effects,
                );
            }
            SessionEvent::ReconnectTimerFired => self.on_reconnect_timer(&mut effects),
            SessionEvent::HandshakeTimedOut => {
                if matches!(
                    self.state,
                    ConnectionState::Connecting | ConnectionState::Subscribing
                ) {
                    self.fail(
                        &Error::SubscriptionTimeout(self.subscription_timeout),
                        &mut effects,
                    );
                }
            }
            SessionEvent::LivenessTimedOut => {
                if self.state == ConnectionState::Live {
                    self.fail(
                        &Error::Transport(format!(
                            "no traffic for {:?}",
                            self.heartbeat_timeout
                        )),
                        &mut effects,
                    );
                }
            }
        }

        effects
    }

    fn begin_connect(&mut self, effects: &mut Vec<Effect>) {
        self.subscription.channel_id = None;
        self.transition(ConnectionState::Connecting);
        info!(
            url = %self.url,
            symbol = %self.subscription.symbol,
            precision = %self.subscription.precision,
            attempt = self.attempts,
            "connecting"
        );
        effects.push(Effect::Open {
            url: self.url.clone(),
        });
        effects.push(Effect::SetHandshakeDeadline(Some(self.subscription_timeout)));
    }

    fn on_open(&mut self, effects: &mut Vec<Effect>) {
        if self.state != ConnectionState::Connecting {
            debug!(state = %self.state, "open ignored");
            return;
        }

        self.attempts = 0;
        self.transition(ConnectionState::Subscribing);

        let request = SubscribeRequest::book(
            self.subscription.symbol.clone(),
            self.subscription.precision,
            self.frequency,
            self.length,
        );
        match request.to_json() {
            Ok(text) => {
                effects.push(Effect::Send(text));
                effects.push(Effect::SetHandshakeDeadline(Some(self.subscription_timeout)));
            }
            Err(e) => self.fail(&e, effects),
        }
    }

    fn on_message(&mut self, text: &str, effects: &mut Vec<Effect>) {
        if !self.state.is_connected() {
            trace!(state = %self.state, "frame dropped");
            return;
        }

        let message = match FeedMessage::decode(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "discarding frame");
                return;
            }
        };

        match message {
            FeedMessage::Control(event) => self.on_control(event, effects),
            data => self.on_data(data, effects),
        }
    }

    fn on_control(&mut self, event: ControlEvent, effects: &mut Vec<Effect>) {
        if event.requests_reconnect() {
            self.fail(
                &Error::Transport("server requested reconnect".to_string()),
                effects,
            );
            return;
        }

        match event {
            ControlEvent::Subscribed {
                channel, chan_id, ..
            } if channel == "book" => {
                if self.state != ConnectionState::Subscribing {
                    debug!(chan_id, state = %self.state, "unexpected subscription ack");
                    return;
                }
                self.subscription.channel_id = Some(chan_id);
                self.transition(ConnectionState::Live);
                info!(
                    channel_id = chan_id,
                    symbol = %self.subscription.symbol,
                    precision = %self.subscription.precision,
                    "subscribed"
                );
                effects.push(Effect::SetHandshakeDeadline(None));
                effects.push(Effect::SetLivenessDeadline(Some(self.heartbeat_timeout)));
            }
            ControlEvent::Subscribed {
                channel, chan_id, ..
            } => {
                debug!(%channel, chan_id, "ack for another channel ignored");
            }
            ControlEvent::Unsubscribed { chan_id } => {
                if self.subscription.channel_id == Some(chan_id) {
                    self.fail(
                        &Error::Transport(format!("channel {chan_id} unsubscribed by server")),
                        effects,
                    );
                }
            }
            ControlEvent::Info { version, code, msg } => {
                info!(?version, ?code, msg = msg.as_deref().unwrap_or(""), "server info");
            }
            ControlEvent::Error { code, msg } => {
                // A rejected subscribe surfaces through the handshake deadline
                warn!(?code, msg = msg.as_deref().unwrap_or(""), "server error event");
            }
            ControlEvent::Other => trace!("control event ignored"),
        }
    }

    fn on_data(&mut self, message: FeedMessage, effects: &mut Vec<Effect>) {
        let Some(channel_id) = self.subscription.channel_id else {
            trace!("book frame before subscription ack dropped");
            return;
        };
        if message.channel_id() != Some(channel_id) {
            trace!(channel = ?message.channel_id(), "frame for another channel dropped");
            return;
        }

        effects.push(Effect::SetLivenessDeadline(Some(self.heartbeat_timeout)));

        let result = match message {
            FeedMessage::Snapshot { levels, .. } => {
                debug!(levels = levels.len(), "applying snapshot");
                self.book.apply_snapshot(&levels)
            }
            FeedMessage::Delta { level, .. } => self.book.apply_delta(level),
            FeedMessage::Heartbeat { .. } | FeedMessage::Unknown { .. } | FeedMessage::Control(_) => {
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!(error = %e, "discarding book update");
        }
    }

    fn fail(&mut self, error: &Error, effects: &mut Vec<Effect>) {
        if !self.state.is_active() {
            debug!(error = %error, state = %self.state, "failure ignored");
            return;
        }

        error!(error = %error, state = %self.state, "connection failed");
        effects.push(Effect::CloseTransport);
        effects.push(Effect::SetHandshakeDeadline(None));
        effects.push(Effect::SetLivenessDeadline(None));

        self.subscription.channel_id = None;
        if !self.retain_book_on_failure {
            self.book.clear();
        }
        self.transition(ConnectionState::Failed);

        let next = self.attempts + 1;
        match self.reconnect.delay_for_attempt(next) {
            Some(delay) => {
                info!(
                    attempt = next,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "scheduling reconnect"
                );
                effects.push(Effect::ScheduleReconnect(delay));
            }
            None => {
                let exhausted = Error::ReconnectExhausted {
                    attempts: self.attempts,
                };
                warn!(error = %exhausted, "reconnect stopped, call connect() to retry");
                self.transition(ConnectionState::Disconnected);
            }
        }
    }

    fn on_reconnect_timer(&mut self, effects: &mut Vec<Effect>) {
        if self.state != ConnectionState::Failed {
            trace!(state = %self.state, "stale reconnect timer");
            return;
        }
        self.attempts += 1;
        self.begin_connect(effects);
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "state transition");
            self.state = next;
            self.book.set_state(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::orderbook::PriceLevel;

    const BASE: Duration = Duration::from_millis(100);
    const ACK: &str = r#"{"event":"subscribed","channel":"book","chanId":42,"symbol":"tBTCUSD","prec":"P0"}"#;

    fn config() -> Config {
        Config::default().with_reconnect(ReconnectConfig::new().base_interval(BASE))
    }

    fn session() -> FeedSession {
        FeedSession::new(&config(), BookHandle::default())
    }

    fn message(text: &str) -> SessionEvent {
        SessionEvent::Transport(TransportEvent::Message(text.to_string()))
    }

    fn opened() -> SessionEvent {
        SessionEvent::Transport(TransportEvent::Opened)
    }

    fn dropped() -> SessionEvent {
        SessionEvent::Transport(TransportEvent::Error("connection reset".to_string()))
    }

    fn go_live(session: &mut FeedSession) {
        session.connect();
        session.handle(opened());
        session.handle(message(ACK));
        assert_eq!(session.state(), ConnectionState::Live);
    }

    fn scheduled_delay(effects: &[Effect]) -> Option<Duration> {
        effects.iter().find_map(|e| match e {
            Effect::ScheduleReconnect(delay) => Some(*delay),
            _ => None,
        })
    }

    fn sent_frames(effects: &[Effect]) -> Vec<serde_json::Value> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send(text) => Some(serde_json::from_str(text).unwrap()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_connect_opens_transport() {
        let mut session = session();
        let effects = session.connect();

        assert_eq!(session.state(), ConnectionState::Connecting);
        assert!(effects.contains(&Effect::Open {
            url: crate::config::DEFAULT_URL.to_string()
        }));
        assert!(effects.contains(&Effect::SetHandshakeDeadline(Some(Duration::from_secs(10)))));

        // Already connecting
        assert!(session.connect().is_empty());
    }

    #[test]
    fn test_open_sends_subscription() {
        let mut session = session();
        session.connect();
        let effects = session.handle(opened());

        assert_eq!(session.state(), ConnectionState::Subscribing);
        assert!(session.book().is_connected());

        let frames = sent_frames(&effects);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["event"], "subscribe");
        assert_eq!(frames[0]["channel"], "book");
        assert_eq!(frames[0]["symbol"], "tBTCUSD");
        assert_eq!(frames[0]["freq"], "F0");
        assert_eq!(frames[0]["prec"], "P0");
    }

    #[test]
    fn test_ack_goes_live() {
        let mut session = session();
        session.connect();
        session.handle(opened());
        let effects = session.handle(message(ACK));

        assert_eq!(session.state(), ConnectionState::Live);
        assert_eq!(session.subscription().channel_id, Some(42));
        assert!(effects.contains(&Effect::SetHandshakeDeadline(None)));
        assert!(effects.contains(&Effect::SetLivenessDeadline(Some(Duration::from_secs(30)))));
    }

    #[test]
    fn test_book_frames_before_ack_are_dropped() {
        let mut session = session();
        session.connect();
        session.handle(opened());

        session.handle(message("[42,[[100,1,5]]]"));
        assert!(session.book().snapshot().is_empty());
        assert_eq!(session.state(), ConnectionState::Subscribing);
    }

    #[test]
    fn test_frames_for_other_channels_are_dropped() {
        let mut session = session();
        go_live(&mut session);

        session.handle(message("[7,[[100,1,5]]]"));
        assert!(session.book().snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_and_deltas_flow_into_book() {
        let mut session = session();
        go_live(&mut session);

        session.handle(message("[42,[[100,1,5],[99,2,3],[101,1,-2]]]"));
        let snap = session.book().snapshot();
        assert_eq!(
            snap.bids,
            vec![
                PriceLevel::new(dec!(100), dec!(5), 1),
                PriceLevel::new(dec!(99), dec!(3), 2)
            ]
        );
        assert_eq!(snap.asks, vec![PriceLevel::new(dec!(101), dec!(2), 1)]);

        session.handle(message("[42,[100,0,5]]"));
        assert_eq!(
            session.book().snapshot().bids,
            vec![PriceLevel::new(dec!(99), dec!(3), 2)]
        );

        session.handle(message("[42,[101,1,-4]]"));
        assert_eq!(
            session.book().snapshot().asks,
            vec![PriceLevel::new(dec!(101), dec!(4), 1)]
        );
    }

    #[test]
    fn test_malformed_frames_do_not_end_session() {
        let mut session = session();
        go_live(&mut session);
        session.handle(message("[42,[[100,1,5]]]"));

        for bad in ["garbage", "[42,{}]", "[42,[-1,1,5]]", "[42,[100,1]]"] {
            let effects = session.handle(message(bad));
            assert!(!effects.contains(&Effect::CloseTransport), "{bad}");
        }

        assert_eq!(session.state(), ConnectionState::Live);
        assert_eq!(session.book().snapshot().bids.len(), 1);
    }

    #[test]
    fn test_heartbeat_rearms_liveness() {
        let mut session = session();
        go_live(&mut session);

        let effects = session.handle(message(r#"[42,"hb"]"#));
        assert_eq!(
            effects,
            vec![Effect::SetLivenessDeadline(Some(Duration::from_secs(30)))]
        );
    }

    #[test]
    fn test_backoff_is_linear_and_bounded() {
        let mut session = session();
        session.connect();

        let mut delays = Vec::new();
        loop {
            let effects = session.handle(dropped());
            match scheduled_delay(&effects) {
                Some(delay) => {
                    delays.push(delay);
                    assert_eq!(session.state(), ConnectionState::Failed);
                    assert!(!session.book().is_connected());
                    let effects = session.handle(SessionEvent::ReconnectTimerFired);
                    assert!(matches!(effects.first(), Some(Effect::Open { .. })));
                }
                None => break,
            }
        }

        let expected: Vec<Duration> = (1..=10).map(|k| BASE * k).collect();
        assert_eq!(delays, expected);
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert_eq!(session.reconnect_attempts(), 10);

        // Nothing left to fire
        assert!(session.handle(SessionEvent::ReconnectTimerFired).is_empty());
    }

    #[test]
    fn test_successful_open_resets_attempts() {
        let mut session = session();
        session.connect();

        for _ in 0..3 {
            session.handle(dropped());
            session.handle(SessionEvent::ReconnectTimerFired);
        }
        assert_eq!(session.reconnect_attempts(), 3);

        session.handle(opened());
        assert_eq!(session.reconnect_attempts(), 0);

        let effects = session.handle(dropped());
        assert_eq!(scheduled_delay(&effects), Some(BASE));
    }

    #[test]
    fn test_error_then_close_fails_once() {
        let mut session = session();
        go_live(&mut session);

        let first = session.handle(dropped());
        assert!(first.contains(&Effect::CloseTransport));
        assert_eq!(scheduled_delay(&first), Some(BASE));

        let second = session.handle(SessionEvent::Transport(TransportEvent::Closed(None)));
        assert!(second.is_empty());
    }

    #[test]
    fn test_failure_clears_book_by_default() {
        let mut session = session();
        go_live(&mut session);
        session.handle(message("[42,[[100,1,5]]]"));

        session.handle(dropped());
        assert!(session.book().snapshot().is_empty());
        assert_eq!(session.subscription().channel_id, None);
    }

    #[test]
    fn test_failure_can_retain_book() {
        let config = config().with_retain_book_on_failure(true);
        let mut session = FeedSession::new(&config, BookHandle::default());
        go_live(&mut session);
        session.handle(message("[42,[[100,1,5]]]"));

        session.handle(dropped());
        assert_eq!(session.book().snapshot().bids.len(), 1);
    }

    #[test]
    fn test_close_cancels_and_is_idempotent() {
        let mut session = session();
        go_live(&mut session);
        session.handle(message("[42,[[100,1,5]]]"));

        let effects = session.close();
        assert!(effects.contains(&Effect::CancelReconnect));
        assert!(effects.contains(&Effect::CloseTransport));
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert!(session.book().snapshot().is_empty());

        let again = session.close();
        assert!(!again.contains(&Effect::CloseTransport));

        // Late events from the closed socket change nothing
        assert!(session.handle(dropped()).is_empty());
        assert!(session.handle(SessionEvent::ReconnectTimerFired).is_empty());
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_close_while_waiting_to_reconnect() {
        let mut session = session();
        go_live(&mut session);
        session.handle(dropped());
        assert_eq!(session.state(), ConnectionState::Failed);

        let effects = session.close();
        assert!(effects.contains(&Effect::CancelReconnect));
        // Transport was already torn down by the failure
        assert!(!effects.contains(&Effect::CloseTransport));
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_handshake_timeout_triggers_backoff() {
        let mut session = session();
        session.connect();
        session.handle(opened());

        let effects = session.handle(SessionEvent::HandshakeTimedOut);
        assert_eq!(session.state(), ConnectionState::Failed);
        assert_eq!(scheduled_delay(&effects), Some(BASE));

        // Irrelevant once live
        let mut live = self::session();
        go_live(&mut live);
        assert!(live.handle(SessionEvent::HandshakeTimedOut).is_empty());
    }

    #[test]
    fn test_liveness_timeout_triggers_backoff() {
        let mut session = session();
        go_live(&mut session);

        let effects = session.handle(SessionEvent::LivenessTimedOut);
        assert_eq!(session.state(), ConnectionState::Failed);
        assert!(effects.contains(&Effect::CloseTransport));
    }

    #[test]
    fn test_server_restart_notice_reconnects() {
        let mut session = session();
        go_live(&mut session);

        let effects = session.handle(message(r#"{"event":"info","code":20051,"msg":"restart"}"#));
        assert_eq!(session.state(), ConnectionState::Failed);
        assert_eq!(scheduled_delay(&effects), Some(BASE));
    }

    #[test]
    fn test_server_unsubscribe_fails_session() {
        let mut session = session();
        go_live(&mut session);

        session.handle(message(r#"{"event":"unsubscribed","status":"OK","chanId":42}"#));
        assert_eq!(session.state(), ConnectionState::Failed);
    }

    #[test]
    fn test_precision_change_restarts() {
        let mut session = session();
        go_live(&mut session);
        session.handle(message("[42,[[100,1,5]]]"));

        let effects = session.set_precision(Precision::P2);
        assert!(effects.contains(&Effect::CloseTransport));
        assert!(matches!(effects.last(), Some(Effect::SetHandshakeDeadline(Some(_)))));
        assert!(effects.iter().any(|e| matches!(e, Effect::Open { .. })));
        assert_eq!(session.state(), ConnectionState::Connecting);
        assert!(session.book().snapshot().is_empty());
        assert_eq!(session.book().precision(), Precision::P2);

        let effects = session.handle(opened());
        assert_eq!(sent_frames(&effects)[0]["prec"], "P2");

        // Same precision is a no-op
        assert!(session.set_precision(Precision::P2).is_empty());
    }

    #[test]
    fn test_connect_after_exhaustion_starts_fresh() {
        let config = config().with_reconnect(ReconnectConfig::new().max_attempts(1).base_interval(BASE));
        let mut session = FeedSession::new(&config, BookHandle::default());
        session.connect();
        session.handle(dropped());
        session.handle(SessionEvent::ReconnectTimerFired);
        session.handle(dropped());
        assert_eq!(session.state(), ConnectionState::Disconnected);

        let effects = session.connect();
        assert_eq!(session.state(), ConnectionState::Connecting);
        assert_eq!(session.reconnect_attempts(), 0);
        assert!(effects.contains(&Effect::CancelReconnect));

        let effects = session.handle(dropped());
        assert_eq!(scheduled_delay(&effects), Some(BASE));
    }

    #[test]
    fn test_stale_open_is_ignored() {
        let mut session = session();
        assert!(session.handle(opened()).is_empty());
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }
}
