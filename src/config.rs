//! Configuration for the book feed.
//!
//! This module provides the [`Config`] struct for the subscription, the
//! endpoint, and the timing of the connection lifecycle.

use std::time::Duration;

use url::Url;

use crate::client::reconnect::ReconnectConfig;
use crate::error::Error;
use crate::types::{BookLength, Frequency, Precision};
use crate::Result;

/// Public Bitfinex WebSocket endpoint
pub const DEFAULT_URL: &str = "wss://api-pub.bitfinex.com/ws/2";

/// Instrument subscribed to by default
pub const DEFAULT_SYMBOL: &str = "tBTCUSD";

/// Configuration for a single-symbol book feed
///
/// # Example
///
/// ```rust
/// use bitfinex_book::Config;
/// use bitfinex_book::types::Precision;
///
/// let config = Config::new("tETHUSD").with_precision(Precision::P2);
///
/// // Custom handshake timeout
/// let config = Config::default()
///     .with_subscription_timeout(std::time::Duration::from_secs(5));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// WebSocket endpoint
    url: String,

    /// Instrument identifier, e.g. `tBTCUSD`
    symbol: String,

    /// Initial price aggregation level
    precision: Precision,

    /// Update frequency
    frequency: Frequency,

    /// Levels per side (server default when `None`)
    length: Option<BookLength>,

    /// Reconnect backoff and ceiling
    reconnect: ReconnectConfig,

    /// Time allowed from connect to subscription acknowledgment
    subscription_timeout: Duration,

    /// Silence tolerated on a live channel before it is considered dead
    heartbeat_timeout: Duration,

    /// Keep the last book visible while reconnecting
    retain_book_on_failure: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_SYMBOL)
    }
}

impl Config {
    /// Create a configuration for the given symbol with default settings
    ///
    /// # Example
    ///
    /// ```rust
    /// use bitfinex_book::Config;
    ///
    /// let config = Config::new("tBTCUSD");
    /// assert_eq!(config.symbol(), "tBTCUSD");
    /// ```
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            symbol: symbol.into(),
            precision: Precision::default(),
            frequency: Frequency::default(),
            length: None,
            reconnect: ReconnectConfig::default(),
            subscription_timeout: Duration::from_secs(10),
            // Server sends a heartbeat every 15 seconds on idle channels
            heartbeat_timeout: Duration::from_secs(30),
            retain_book_on_failure: false,
        }
    }

    /// Set the WebSocket endpoint
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the initial precision
    #[must_use]
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// Set the update frequency
    #[must_use]
    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    /// Set the number of levels per side
    #[must_use]
    pub fn with_length(mut self, length: Option<BookLength>) -> Self {
        self.length = length;
        self
    }

    /// Set the reconnect policy
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Set the subscription acknowledgment timeout
    #[must_use]
    pub fn with_subscription_timeout(mut self, timeout: Duration) -> Self {
        self.subscription_timeout = timeout;
        self
    }

    /// Set the liveness timeout for a subscribed channel
    #[must_use]
    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    /// Keep serving the last book while reconnecting instead of clearing it
    #[must_use]
    pub fn with_retain_book_on_failure(mut self, retain: bool) -> Self {
        self.retain_book_on_failure = retain;
        self
    }

    /// Get the WebSocket endpoint
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the symbol
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Get the initial precision
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Get the update frequency
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Get the book length
    pub fn length(&self) -> Option<BookLength> {
        self.length
    }

    /// Get the reconnect policy
    pub fn reconnect(&self) -> &ReconnectConfig {
        &self.reconnect
    }

    /// Get the subscription timeout
    pub fn subscription_timeout(&self) -> Duration {
        self.subscription_timeout
    }

    /// Get the heartbeat timeout
    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_timeout
    }

    /// Whether the book survives a connection failure
    pub fn retain_book_on_failure(&self) -> bool {
        self.retain_book_on_failure
    }

    /// Check the configuration before starting a feed
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if the endpoint does not parse, or
    /// [`Error::Config`] for a non-WebSocket scheme, an empty symbol, or a
    /// zero interval.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.url)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::Config(format!(
                "endpoint must use ws or wss, got {}",
                url.scheme()
            )));
        }
        if self.symbol.trim().is_empty() {
            return Err(Error::Config("symbol must not be empty".to_string()));
        }
        if self.reconnect.base_interval.is_zero() {
            return Err(Error::Config("reconnect interval must be non-zero".to_string()));
        }
        if self.subscription_timeout.is_zero() || self.heartbeat_timeout.is_zero() {
            return Err(Error::Config("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.url(), DEFAULT_URL);
        assert_eq!(config.symbol(), "tBTCUSD");
        assert_eq!(config.precision(), Precision::P0);
        assert_eq!(config.frequency(), Frequency::Realtime);
        assert_eq!(config.length(), None);
        assert_eq!(config.reconnect().max_attempts, 10);
        assert_eq!(config.reconnect().base_interval, Duration::from_secs(3));
        assert_eq!(config.subscription_timeout(), Duration::from_secs(10));
        assert!(!config.retain_book_on_failure());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = Config::new("tETHUSD")
            .with_url("ws://localhost:9000")
            .with_precision(Precision::P3)
            .with_frequency(Frequency::Batched)
            .with_length(Some(BookLength::L100))
            .with_heartbeat_timeout(Duration::from_secs(5))
            .with_retain_book_on_failure(true);

        assert_eq!(config.symbol(), "tETHUSD");
        assert_eq!(config.url(), "ws://localhost:9000");
        assert_eq!(config.precision(), Precision::P3);
        assert_eq!(config.frequency(), Frequency::Batched);
        assert_eq!(config.length(), Some(BookLength::L100));
        assert_eq!(config.heartbeat_timeout(), Duration::from_secs(5));
        assert!(config.retain_book_on_failure());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(matches!(
            Config::default().with_url("not a url").validate(),
            Err(Error::Url(_))
        ));
        assert!(matches!(
            Config::default().with_url("https://api-pub.bitfinex.com").validate(),
            Err(Error::Config(_))
        ));
        assert!(matches!(Config::new("  ").validate(), Err(Error::Config(_))));
        assert!(matches!(
            Config::default()
                .with_reconnect(ReconnectConfig::new().base_interval(Duration::ZERO))
                .validate(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::default()
                .with_subscription_timeout(Duration::ZERO)
                .validate(),
            Err(Error::Config(_))
        ));
    }
}
