//! Per-client admission control for inbound requests.
//!
//! Every peer IP gets its own token bucket refilled continuously at
//! `requests_per_second` and capped at `burst`. A request arriving to an
//! empty bucket is answered with `429 Too Many Requests` in the standard
//! error envelope and never reaches a handler. Buckets idle for longer than
//! [`IDLE_EVICTION`] are dropped during a periodic sweep.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, ResponseError};
use chrono::{DateTime, TimeDelta, Utc};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use mockable::{Clock, DefaultClock};
use tracing::warn;

use crate::domain::Error as ApiError;

/// Buckets untouched for this long are forgotten.
pub const IDLE_EVICTION: Duration = Duration::from_secs(3 * 60);

/// Refill rate and burst size shared by every client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientRateLimitConfig {
    /// Tokens earned back per second.
    pub requests_per_second: f64,
    /// Largest number of requests admitted back to back.
    pub burst: u32,
}

impl Default for ClientRateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2.0,
            burst: 4,
        }
    }
}

#[derive(Debug, Clone)]
struct ClientBucket {
    tokens: f64,
    last_seen: DateTime<Utc>,
}

impl ClientBucket {
    fn full(burst: u32, now: DateTime<Utc>) -> Self {
        Self {
            tokens: f64::from(burst),
            last_seen: now,
        }
    }

    fn try_take(&mut self, config: ClientRateLimitConfig, now: DateTime<Utc>) -> bool {
        let elapsed = now
            .signed_duration_since(self.last_seen)
            .to_std()
            .unwrap_or_default();
        let earned = elapsed.as_secs_f64() * config.requests_per_second;
        self.tokens = (self.tokens + earned).min(f64::from(config.burst));
        self.last_seen = now;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

struct Buckets {
    clients: HashMap<IpAddr, ClientBucket>,
    last_sweep: DateTime<Utc>,
}

struct LimiterState {
    config: ClientRateLimitConfig,
    clock: Arc<dyn Clock>,
    buckets: Mutex<Buckets>,
}

impl LimiterState {
    fn admit(&self, client: IpAddr) -> bool {
        let now = self.clock.utc();
        let idle = TimeDelta::from_std(IDLE_EVICTION).unwrap_or(TimeDelta::MAX);
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        if now.signed_duration_since(buckets.last_sweep) >= idle {
            buckets
                .clients
                .retain(|_, bucket| now.signed_duration_since(bucket.last_seen) < idle);
            buckets.last_sweep = now;
        }
        buckets
            .clients
            .entry(client)
            .or_insert_with(|| ClientBucket::full(self.config.burst, now))
            .try_take(self.config, now)
    }

    fn tracked_clients(&self) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clients
            .len()
    }
}

/// Middleware limiting how fast each peer IP may call the API.
///
/// The handle is cheap to clone; clones share the same buckets, so one
/// instance built before the server starts covers every worker.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use pulse_backend::middleware::{ClientRateLimit, ClientRateLimitConfig};
///
/// let app = App::new().wrap(ClientRateLimit::new(ClientRateLimitConfig::default()));
/// ```
#[derive(Clone)]
pub struct ClientRateLimit {
    state: Option<Arc<LimiterState>>,
}

impl ClientRateLimit {
    /// Limit every client per `config` using the system clock.
    #[must_use]
    pub fn new(config: ClientRateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(DefaultClock))
    }

    /// Limit every client per `config`, reading time from `clock`.
    #[must_use]
    pub fn with_clock(config: ClientRateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.utc();
        Self {
            state: Some(Arc::new(LimiterState {
                config,
                clock,
                buckets: Mutex::new(Buckets {
                    clients: HashMap::new(),
                    last_sweep: now,
                }),
            })),
        }
    }

    /// Pass every request through untouched.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { state: None }
    }

    /// Whether requests are being limited at all.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.state.is_some()
    }

    /// Number of clients currently holding a bucket.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.state
            .as_ref()
            .map_or(0, |state| state.tracked_clients())
    }
}

impl<S, B> Transform<S, ServiceRequest> for ClientRateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = ClientRateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ClientRateLimitMiddleware {
            service,
            state: self.state.clone(),
        }))
    }
}

/// Service wrapper produced by [`ClientRateLimit`].
pub struct ClientRateLimitMiddleware<S> {
    service: S,
    state: Option<Arc<LimiterState>>,
}

impl<S, B> Service<ServiceRequest> for ClientRateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let client = req.peer_addr().map(|addr| addr.ip());
        let admitted = match (&self.state, client) {
            (Some(state), Some(client)) => state.admit(client),
            _ => true,
        };
        if !admitted {
            warn!(client = ?client, path = req.path(), "client exceeded request rate");
            return Box::pin(async move {
                let response =
                    ApiError::too_many_requests("Too many requests were made").error_response();
                Ok(req.into_response(response))
            });
        }
        let fut = self.service.call(req);
        Box::pin(async move { Ok(fut.await?.map_into_boxed_body()) })
    }
}
