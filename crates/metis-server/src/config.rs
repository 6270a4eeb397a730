//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use crate::http::Limits;

/// Transport settings for [`Server`](crate::Server).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: SocketAddr,
    /// Open connections beyond this are refused.
    pub max_connections: usize,
    /// Connections with no traffic for this long are closed.
    pub idle_timeout: Duration,
    /// Request size limits.
    pub limits: Limits,
    /// Initial capacity of per-connection buffers.
    pub buffer_size: usize,
}

impl ServerConfig {
    pub fn new(bind_addr: impl Into<SocketAddr>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            max_connections: 1024,
            idle_timeout: Duration::from_secs(30),
            limits: Limits::default(),
            buffer_size: 4096,
        }
    }

    #[must_use]
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}
