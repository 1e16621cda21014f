//! Server settings loaded via OrthoConfig.
//!
//! Values are layered from defaults, an optional config file, `PULSE_*`
//! environment variables, and the command line. Unset optional fields fall
//! back to the defaults exposed by the accessors below.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{RateLimiterConfig, ReconciliationConfig};
use crate::middleware::{ClientRateLimit, ClientRateLimitConfig};
use crate::outbound::persistence::{PoolConfig, RetryPolicy};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MINUTE_LIMIT: u32 = 5;
const DEFAULT_DAILY_LIMIT: u32 = 500;
const DEFAULT_DB_CONNECT_ATTEMPTS: u32 = 5;

/// Settings that cannot be used to start the server.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("database_url is required")]
    MissingDatabaseUrl,
    #[error("bind_addr {value:?} is not a socket address")]
    InvalidBindAddr { value: String },
    #[error("alpha_vantage_base_url {value:?} is not a URL")]
    InvalidBaseUrl { value: String },
    #[error("alpha_vantage_api_key is required when data_sync is enabled")]
    MissingApiKey,
    #[error("{field} must be greater than zero")]
    ZeroLimit { field: &'static str },
    #[error("limiter_rps must be a positive number, got {value}")]
    InvalidRequestRate { value: f64 },
}

/// Configuration values for the HTTP server and the sync pipeline.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PULSE")]
pub struct ServerSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections.
    pub db_max_connections: Option<u32>,
    /// Attempts made to reach the database at start-up.
    pub db_connect_attempts: Option<u32>,
    /// Alpha Vantage origin.
    pub alpha_vantage_base_url: Option<String>,
    /// Alpha Vantage API key.
    pub alpha_vantage_api_key: Option<String>,
    /// Run the background schedulers that pull provider data.
    #[ortho_config(default = false)]
    pub data_sync: bool,
    /// Per-request timeout for provider calls, in seconds.
    pub provider_timeout_secs: Option<u64>,
    /// Deadline for read queries, in seconds.
    pub query_timeout_secs: Option<u64>,
    /// Provider calls allowed per minute.
    pub minute_limit: Option<u32>,
    /// Provider calls allowed per day.
    pub daily_limit: Option<u32>,
    /// Limit how fast each client IP may call the API.
    #[ortho_config(default = true)]
    pub limiter_enabled: bool,
    /// Requests per second earned back by each client.
    pub limiter_rps: Option<f64>,
    /// Requests each client may make back to back.
    pub limiter_burst: Option<u32>,
}

impl ServerSettings {
    /// Parsed bind address, falling back to `0.0.0.0:8080`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidBindAddr`] when the value does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|_| SettingsError::InvalidBindAddr {
            value: raw.to_owned(),
        })
    }

    /// Configured database URL.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingDatabaseUrl`] when unset or blank.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(SettingsError::MissingDatabaseUrl)
    }

    /// Parsed provider origin, defaulting to the public Alpha Vantage host.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidBaseUrl`] when the value does not parse.
    pub fn alpha_vantage_base_url(&self) -> Result<Url, SettingsError> {
        let raw = self
            .alpha_vantage_base_url
            .as_deref()
            .unwrap_or(DEFAULT_ALPHA_VANTAGE_BASE_URL);
        Url::parse(raw).map_err(|_| SettingsError::InvalidBaseUrl {
            value: raw.to_owned(),
        })
    }

    /// API key for the provider; required only when syncing.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingApiKey`] when unset or blank.
    pub fn alpha_vantage_api_key(&self) -> Result<&str, SettingsError> {
        self.alpha_vantage_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(SettingsError::MissingApiKey)
    }

    /// Per-request provider timeout, defaulting to ten seconds.
    #[must_use]
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(
            self.provider_timeout_secs
                .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS),
        )
    }

    /// Read query deadline, defaulting to ten seconds.
    #[must_use]
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs.unwrap_or(DEFAULT_QUERY_TIMEOUT_SECS))
    }

    /// Pool settings built from the URL and connection cap.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingDatabaseUrl`] when no URL is set.
    pub fn pool_config(&self) -> Result<PoolConfig, SettingsError> {
        Ok(PoolConfig::new(self.database_url()?).with_max_size(
            self.db_max_connections
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
        ))
    }

    /// Start-up retry schedule for reaching the database.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self
                .db_connect_attempts
                .unwrap_or(DEFAULT_DB_CONNECT_ATTEMPTS),
            ..RetryPolicy::default()
        }
    }

    /// Limiter capacities; refill cadences keep their defaults.
    #[must_use]
    pub fn rate_limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            minute_capacity: self.minute_limit.unwrap_or(DEFAULT_MINUTE_LIMIT),
            daily_capacity: self.daily_limit.unwrap_or(DEFAULT_DAILY_LIMIT),
            ..RateLimiterConfig::default()
        }
    }

    /// Inbound per-client limiter, or a pass-through when disabled.
    #[must_use]
    pub fn client_rate_limit(&self) -> ClientRateLimit {
        if !self.limiter_enabled {
            return ClientRateLimit::disabled();
        }
        let defaults = ClientRateLimitConfig::default();
        ClientRateLimit::new(ClientRateLimitConfig {
            requests_per_second: self.limiter_rps.unwrap_or(defaults.requests_per_second),
            burst: self.limiter_burst.unwrap_or(defaults.burst),
        })
    }

    /// Engine tuning; provider calls share the provider timeout.
    #[must_use]
    pub fn reconciliation_config(&self) -> ReconciliationConfig {
        ReconciliationConfig {
            operation_timeout: self.provider_timeout(),
            ..ReconciliationConfig::default()
        }
    }

    /// Check every value the server needs before anything is started.
    ///
    /// # Errors
    ///
    /// Returns the first [`SettingsError`] found.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.bind_addr()?;
        self.database_url()?;
        if self.minute_limit == Some(0) {
            return Err(SettingsError::ZeroLimit {
                field: "minute_limit",
            });
        }
        if self.daily_limit == Some(0) {
            return Err(SettingsError::ZeroLimit {
                field: "daily_limit",
            });
        }
        if self.limiter_enabled {
            if let Some(value) = self.limiter_rps.filter(|rps| !(rps.is_finite() && *rps > 0.0)) {
                return Err(SettingsError::InvalidRequestRate { value });
            }
            if self.limiter_burst == Some(0) {
                return Err(SettingsError::ZeroLimit {
                    field: "limiter_burst",
                });
            }
        }
        if self.data_sync {
            self.alpha_vantage_base_url()?;
            self.alpha_vantage_api_key()?;
        }
        Ok(())
    }
}
