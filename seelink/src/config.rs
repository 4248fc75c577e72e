//! Worker configuration
//!
//! Defaults match the vendor app. Every setting has a `with_*` setter.

use std::time::Duration;

use seelink_core::constants::{
    CONTROL_HEARTBEAT_INTERVAL, JOIN_TIMEOUT, MAX_LINE_LENGTH, RECONNECT_DELAY,
    STREAM_HEARTBEAT_INTERVAL,
};
pub use seelink_transport::{Endpoint, SocketOptions};

/// Control channel listener settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    pub endpoint: Endpoint,
    pub heartbeat_interval: Duration,
    pub reconnect_delay: Duration,
    pub max_line_length: usize,
    pub socket: SocketOptions,
}

impl ListenerConfig {
    /// Listener for the control port of `host`
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_endpoint(Endpoint::control(host))
    }

    pub fn with_endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            heartbeat_interval: CONTROL_HEARTBEAT_INTERVAL,
            reconnect_delay: RECONNECT_DELAY,
            max_line_length: MAX_LINE_LENGTH,
            socket: SocketOptions::default(),
        }
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the fixed delay between a lost connection and the next attempt
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    pub fn with_socket_options(mut self, socket: SocketOptions) -> Self {
        self.socket = socket;
        self
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::with_endpoint(Endpoint::default())
    }
}

/// Image channel session settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    pub endpoint: Endpoint,
    pub heartbeat_interval: Duration,
    pub join_timeout: Duration,
    pub socket: SocketOptions,
}

impl StreamConfig {
    /// Session on the telephoto image port of `host`
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_endpoint(Endpoint::image(host))
    }

    pub fn with_endpoint(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            heartbeat_interval: STREAM_HEARTBEAT_INTERVAL,
            join_timeout: JOIN_TIMEOUT,
            socket: SocketOptions::default(),
        }
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the upper bound `stop` waits for the session tasks
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    pub fn with_socket_options(mut self, socket: SocketOptions) -> Self {
        self.socket = socket;
        self
    }
}
