//! Gateway connection configuration.
//!
//! A plain struct applications construct directly or populate from their own
//! config loader; this crate does not parse files or environment variables.

use std::net::Ipv4Addr;
use std::time::Duration;

/// Default KNXnet/IP port
pub const DEFAULT_PORT: u16 = 3671;

/// Default heartbeat interval between `CONNECTIONSTATE_REQUEST`s
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Default timeout waiting for a gateway response
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of heartbeat retries before the connection is considered
/// dead
pub const DEFAULT_HEARTBEAT_RETRIES: u8 = 3;

/// Gateway connection settings
///
/// Use [`GatewayConfig::discover`] to leave the gateway address unset and
/// resolve it via [`crate::discovery::discover_gateway`] at connect time, or
/// [`GatewayConfig::new`] to target a known gateway directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Gateway address, `None` to discover one at connect time
    pub gateway: Option<Ipv4Addr>,
    /// Gateway port
    pub port: u16,
    /// Interval between heartbeat `CONNECTIONSTATE_REQUEST`s
    pub heartbeat_interval: Duration,
    /// How long to wait for a gateway response before retrying or failing
    pub response_timeout: Duration,
    /// Number of heartbeat retries before giving up on the connection
    pub heartbeat_retries: u8,
}

impl GatewayConfig {
    /// Configure a connection to a known gateway address on the default port
    #[must_use]
    pub fn new(gateway: Ipv4Addr) -> Self {
        Self {
            gateway: Some(gateway),
            port: DEFAULT_PORT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            heartbeat_retries: DEFAULT_HEARTBEAT_RETRIES,
        }
    }

    /// Configure a connection that discovers its gateway via multicast
    /// search at connect time
    #[must_use]
    pub fn discover() -> Self {
        Self {
            gateway: None,
            port: DEFAULT_PORT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            heartbeat_retries: DEFAULT_HEARTBEAT_RETRIES,
        }
    }

    /// Override the gateway port
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the heartbeat interval
    #[must_use]
    pub const fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Override the response timeout
    #[must_use]
    pub const fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Override the number of heartbeat retries
    #[must_use]
    pub const fn with_heartbeat_retries(mut self, retries: u8) -> Self {
        self.heartbeat_retries = retries;
        self
    }
}
