//! Request middleware.
//!
//! Purpose: Define middleware components for request lifecycle concerns such
//! as trace correlation and per-client admission control.

pub mod rate_limit;
pub mod trace;

pub use rate_limit::{ClientRateLimit, ClientRateLimitConfig};
pub use trace::Trace;
