//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::DEFAULT_QUERY_DEADLINE;
use crate::domain::ports::TimeSeriesRepository;
use crate::middleware::{ClientRateLimit, ClientRateLimitConfig};

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) time_series: Arc<dyn TimeSeriesRepository>,
    pub(crate) query_deadline: Duration,
    pub(crate) client_limit: ClientRateLimit,
}

impl ServerConfig {
    /// Construct a server configuration reading from `time_series`, with the
    /// default per-client request limit.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, time_series: Arc<dyn TimeSeriesRepository>) -> Self {
        Self {
            bind_addr,
            time_series,
            query_deadline: DEFAULT_QUERY_DEADLINE,
            client_limit: ClientRateLimit::new(ClientRateLimitConfig::default()),
        }
    }

    /// Override the deadline applied to every read query.
    #[must_use]
    pub const fn with_query_deadline(mut self, deadline: Duration) -> Self {
        self.query_deadline = deadline;
        self
    }

    /// Replace the per-client request limit shared by every worker.
    #[must_use]
    pub fn with_client_rate_limit(mut self, client_limit: ClientRateLimit) -> Self {
        self.client_limit = client_limit;
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
